use std::path::Path;

use crate::{
    error::Result, layout::Layout, lookup::Lookup, Flush, Headers, Inspect, MergeFlags, Remap,
    RowResult, SortByKey,
};

/// This trait describes de behaviour of every component in the transformation
/// chain. Functions provided by this trait help construct the chain and can be
/// _chained_.
pub trait RowStream: IntoIterator<Item = RowResult> {
    /// Must return headers as they are in this point of the chain.
    fn headers(&self) -> &Headers;

    /// Moves each record's category into its flag column using the lookup
    /// table.
    fn remap(self, lookup: Lookup, layout: Layout) -> Result<Remap<Self>>
    where
        Self: Sized,
    {
        Remap::new(self, lookup, layout)
    }

    /// Gathers the whole stream and sorts it by key.
    fn sort_by_key(self, layout: Layout) -> SortByKey<Self>
    where
        Self: Sized,
    {
        SortByKey::new(self, layout)
    }

    /// Collapses adjacent records with the same key, OR-ing their flags.
    fn merge_flags(self, layout: Layout) -> Result<MergeFlags<Self>>
    where
        Self: Sized,
    {
        MergeFlags::new(self, layout)
    }

    /// When consumed, writes every row to `path`. Other than that this behaves
    /// like an `id(x)` function so more links can follow in the chain.
    fn flush<P: AsRef<Path>>(self, path: P, delimiter: u8) -> Result<Flush<Self>>
    where
        Self: Sized,
    {
        Flush::new(self, path, delimiter)
    }

    /// Calls a closure on each element, returning each item untouched.
    fn inspect<F>(self, f: F) -> Inspect<Self, F>
    where
        Self: Sized,
        F: FnMut(&Headers, &RowResult),
    {
        Inspect::new(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::RowStream;
    use crate::{
        layout::{Column, Layout},
        lookup::Lookup,
        mock::{export_stream, flagged_row},
        Row,
    };

    /// An export record naming `category` in its source column, with the
    /// flag at `position` left empty.
    fn raw(key: &str, category: &str, position: usize) -> Row {
        flagged_row(key, &[])
            .iter()
            .enumerate()
            .map(|(i, f)| match i {
                2 => category,
                i if i + 1 == position => "",
                _ => f,
            })
            .collect()
    }

    #[test]
    fn chain_remap_sort_merge() {
        let lookup: Lookup = vec![
            ("LOAN", Column::from_position(12).unwrap()),
            ("CARD", Column::from_position(14).unwrap()),
        ]
        .into_iter()
        .collect();

        let stream = export_stream(vec![
            Ok(raw("B", "LOAN", 12)),
            Ok(raw("A", "CARD", 14)),
            Ok(raw("A", "LOAN", 12)),
        ]);

        let rows: Vec<Row> = stream
            .remap(lookup, Layout::default())
            .unwrap()
            .sort_by_key(Layout::default())
            .merge_flags(Layout::default())
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), Some("A"));
        assert_eq!(rows[0].get(11), Some("J"));
        assert_eq!(rows[0].get(13), Some("J"));
        assert_eq!(rows[1].get(1), Some("B"));
        assert_eq!(rows[1].get(11), Some("J"));
        assert_eq!(rows[1].get(13), Some("N"));
    }
}
