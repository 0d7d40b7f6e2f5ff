//! Grouping of manifest records by checksum.

use std::collections::HashMap;

use crate::manifest::ManifestRecord;

/// Filenames grouped by checksum value.
///
/// Within a bucket, filenames keep manifest order. Iteration across buckets
/// follows no particular order; use [`ChecksumBuckets::sorted`] for a
/// stable one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumBuckets {
    buckets: HashMap<String, Vec<String>>,
}

impl ChecksumBuckets {
    /// Filenames recorded under `checksum`.
    #[must_use]
    pub fn get(&self, checksum: &str) -> Option<&[String]> {
        self.buckets.get(checksum).map(Vec::as_slice)
    }

    /// Number of distinct checksums.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// All buckets, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(checksum, files)| (checksum.as_str(), files.as_slice()))
    }

    /// Buckets shared by more than one manifest entry.
    pub fn collisions(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.iter().filter(|(_, files)| files.len() > 1)
    }

    /// All buckets sorted by checksum.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &[String])> {
        let mut all: Vec<_> = self.iter().collect();
        all.sort_unstable_by_key(|(checksum, _)| *checksum);
        all
    }
}

/// Group manifest records by checksum.
///
/// Duplicate filenames are kept as separate entries.
#[must_use]
pub fn bucket_by_checksum<'a>(
    records: impl IntoIterator<Item = &'a ManifestRecord>,
) -> ChecksumBuckets {
    let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
    for record in records {
        buckets
            .entry(record.checksum.clone())
            .or_default()
            .push(record.filename.clone());
    }
    ChecksumBuckets { buckets }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(checksum: &str, filename: &str) -> ManifestRecord {
        ManifestRecord::new(checksum, filename)
    }

    #[test]
    fn test_bucket_empty_input() {
        let buckets = bucket_by_checksum(&[]);
        assert!(buckets.is_empty());
        assert_eq!(buckets.collisions().count(), 0);
    }

    #[test]
    fn test_bucket_preserves_manifest_order() {
        let records = vec![
            record("aa", "z.txt"),
            record("bb", "m.txt"),
            record("aa", "a.txt"),
            record("aa", "k.txt"),
        ];

        let buckets = bucket_by_checksum(&records);

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets.get("aa").unwrap(),
            &["z.txt".to_string(), "a.txt".to_string(), "k.txt".to_string()]
        );
        assert_eq!(buckets.get("bb").unwrap(), &["m.txt".to_string()]);
    }

    #[test]
    fn test_bucket_keeps_duplicate_filenames() {
        let records = vec![record("aa", "x"), record("aa", "x")];
        let buckets = bucket_by_checksum(&records);

        assert_eq!(buckets.get("aa").unwrap().len(), 2);
    }

    #[test]
    fn test_bucket_collisions() {
        let records = vec![
            record("cc", "1"),
            record("aa", "2"),
            record("cc", "3"),
            record("bb", "4"),
        ];
        let buckets = bucket_by_checksum(&records);

        let collisions: Vec<_> = buckets.collisions().map(|(c, _)| c).collect();
        assert_eq!(collisions, vec!["cc"]);
        assert_eq!(buckets.get("cc").unwrap(), ["1", "3"]);
        assert_eq!(buckets.len(), 3);

        let order: Vec<_> = buckets.sorted().into_iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!["aa", "bb", "cc"]);
    }
}
