/// Token the exports use for a set flag.
pub const SET_TOKEN: &str = "J";

/// Token the exports use for an unset flag.
pub const UNSET_TOKEN: &str = "N";

/// A two-valued indicator column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Set,
    Unset,
}

impl Flag {
    /// Reads a flag token, ignoring surrounding whitespace. Anything but `J`
    /// or `N` is not a flag.
    pub fn parse(token: &str) -> Option<Flag> {
        match token.trim() {
            SET_TOKEN => Some(Flag::Set),
            UNSET_TOKEN => Some(Flag::Unset),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Set => SET_TOKEN,
            Flag::Unset => UNSET_TOKEN,
        }
    }

    pub fn is_set(token: &str) -> bool {
        Flag::parse(token) == Some(Flag::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::Flag;

    #[test]
    fn parse_tokens() {
        assert_eq!(Flag::parse("J"), Some(Flag::Set));
        assert_eq!(Flag::parse(" N "), Some(Flag::Unset));
        assert_eq!(Flag::parse("j"), None);
        assert_eq!(Flag::parse(""), None);
    }

    #[test]
    fn round_trip_token() {
        assert_eq!(Flag::Set.as_str(), "J");
        assert!(Flag::is_set("J "));
        assert!(!Flag::is_set("N"));
    }
}
