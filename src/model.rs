//! Per-file line coverage as extracted from a Cobertura `<class>` element.

use std::collections::BTreeMap;

/// Largest line number accepted from a report. [`CoverageFile::dense`]
/// allocates one slot per line up to the highest one seen.
pub const MAX_LINE: u32 = 10_000_000;

/// Line coverage for one source file.
///
/// Hits are stored sparsely, keyed by 1-based line number. Lines that never
/// appeared in the report have no entry, which is different from an entry
/// with zero hits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageFile {
    name: String,
    line_rate: String,
    highest_line: u32,
    hits: BTreeMap<u32, u64>,
}

impl CoverageFile {
    /// `line_rate` is kept exactly as the report wrote it.
    pub fn new(name: impl Into<String>, line_rate: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line_rate: line_rate.into(),
            ..Default::default()
        }
    }

    /// Record `hits` for `line`, replacing any earlier count for that line.
    pub fn add_hit(&mut self, line: u32, hits: u64) {
        self.hits.insert(line, hits);
        self.highest_line = self.highest_line.max(line);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_rate(&self) -> &str {
        &self.line_rate
    }

    /// Highest line number recorded so far, or 0 for a file without lines.
    pub fn highest_line(&self) -> u32 {
        self.highest_line
    }

    pub fn hits(&self, line: u32) -> Option<u64> {
        self.hits.get(&line).copied()
    }

    /// Positional coverage for lines `1..=highest_line`: `Some(hits)` for
    /// instrumented lines and `None` for lines without data.
    #[must_use]
    pub fn dense(&self) -> Vec<Option<u64>> {
        (1..=self.highest_line).map(|line| self.hits(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn test_dense_keeps_gaps() {
        let mut file = CoverageFile::new("src/test_foo.cc", "0.5");
        file.add_hit(1, 5);
        file.add_hit(3, 0);

        assert_eq!(file.highest_line(), 3);
        assert_eq!(file.dense(), vec![Some(5), None, Some(0)]);
    }

    #[test]
    fn test_dense_empty_file() {
        let file = CoverageFile::new("empty.cc", "1");
        assert_eq!(file.highest_line(), 0);
        assert!(file.dense().is_empty());
    }

    #[test]
    fn test_highest_line_never_decreases() {
        let mut file = CoverageFile::new("a.cc", "0");
        file.add_hit(10, 1);
        file.add_hit(2, 1);

        assert_eq!(file.highest_line(), 10);
        assert_eq!(file.dense().len(), 10);
    }

    #[test]
    fn test_later_hit_replaces_earlier() {
        let mut file = CoverageFile::new("a.cc", "0");
        file.add_hit(4, 1);
        file.add_hit(4, 7);

        assert_eq!(file.hits(4), Some(7));
        assert_eq!(file.dense(), vec![None, None, None, Some(7)]);
    }

    proptest! {
        #[test]
        fn prop_dense_reflects_last_insertion(
            inserts in vec((1u32..200, 0u64..1000), 0..50),
        ) {
            let mut file = CoverageFile::new("f", "0");
            for &(line, hits) in &inserts {
                file.add_hit(line, hits);
            }

            let dense = file.dense();
            let max = inserts.iter().map(|&(line, _)| line).max().unwrap_or(0);
            prop_assert_eq!(dense.len(), max as usize);

            for (idx, value) in dense.iter().enumerate() {
                let line = idx as u32 + 1;
                let expected = inserts
                    .iter()
                    .rev()
                    .find(|&&(l, _)| l == line)
                    .map(|&(_, hits)| hits);
                prop_assert_eq!(*value, expected);
            }
        }
    }
}
