//! Collision scenarios on real files.
//!
//! Each test writes a small directory with tempfile, runs the finder through
//! [`LocalFs`] and checks the resulting groups, clusters and read counts.

use rustsums::collisions::{
    cluster_by_content, group_by_size, ClusterConfig, CollisionFinder, CollisionKind,
    FinderConfig, LocalFs,
};
use rustsums::manifest::ManifestRecord;
use std::fs;
use tempfile::{tempdir, TempDir};

fn setup(files: &[(&str, Vec<u8>)]) -> TempDir {
    let dir = tempdir().unwrap();
    for (name, data) in files {
        fs::write(dir.path().join(name), data).unwrap();
    }
    dir
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_plain_collision_reads_nothing() {
    let dir = setup(&[
        ("a.txt", vec![b'a'; 10]),
        ("b.bin", vec![b'b'; 20]),
        ("c.dat", vec![b'c'; 30]),
    ]);
    let fs = LocalFs::rooted(dir.path());

    let groups = group_by_size(&fs, &names(&["a.txt", "b.bin", "c.dat"]));
    assert_eq!(groups.len(), 3);
    assert!(groups.is_plain_collision());
    assert!(groups.groups.iter().all(|g| g.len() == 1));

    let records: Vec<ManifestRecord> = ["a.txt", "b.bin", "c.dat"]
        .iter()
        .map(|n| ManifestRecord::new("5eed", *n))
        .collect();
    let report = CollisionFinder::new(FinderConfig::default(), fs)
        .analyze(&records)
        .unwrap();

    let bucket = &report.buckets[0];
    assert_eq!(bucket.kind, CollisionKind::Plain);
    assert_eq!(report.summary.plain_collisions, 1);
    assert_eq!(report.summary.duplicate_clusters, 0);
    assert_eq!(report.summary.bytes_read, 0);
}

#[test]
fn test_content_clustering_with_late_mismatch() {
    let base: Vec<u8> = (0..100u8).collect();
    let mut late = base.clone();
    late[99] ^= 0xff;
    let dir = setup(&[("a", base.clone()), ("b", base), ("c", late)]);
    let fs = LocalFs::rooted(dir.path());
    let config = ClusterConfig::default().with_chunk_size(10);

    let outcome = cluster_by_content(&fs, 100, &names(&["a", "b", "c"]), &config);

    assert_eq!(outcome.clusters.len(), 2);
    assert_eq!(outcome.clusters[0].files(), names(&["a", "b"]));
    assert_eq!(outcome.clusters[1].files(), names(&["c"]));
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.stats.comparisons, 2);
    // a and b once each; c against the cached representative a.
    assert_eq!(outcome.stats.bytes_read, 300);
}

#[test]
fn test_early_mismatch_stops_after_one_chunk() {
    let base = vec![0u8; 100];
    let mut early = base.clone();
    early[0] = 1;
    let dir = setup(&[("a", base.clone()), ("b", base), ("c", early)]);
    let fs = LocalFs::rooted(dir.path());
    let config = ClusterConfig::default().with_chunk_size(10);

    let outcome = cluster_by_content(&fs, 100, &names(&["a", "b", "c"]), &config);

    assert_eq!(outcome.clusters.len(), 2);
    assert_eq!(outcome.stats.bytes_read, 210);
}

#[test]
fn test_missing_file_is_isolated() {
    let dir = setup(&[("e.txt", b"present".to_vec())]);
    let records = vec![
        ManifestRecord::new("c0ffee", "d.txt"),
        ManifestRecord::new("c0ffee", "e.txt"),
    ];

    let report = CollisionFinder::new(FinderConfig::default(), LocalFs::rooted(dir.path()))
        .analyze(&records)
        .unwrap();

    let bucket = &report.buckets[0];
    assert_eq!(bucket.size_groups.unreadable.len(), 1);
    assert_eq!(bucket.size_groups.unreadable[0].filename, "d.txt");
    assert_eq!(bucket.size_groups.groups.len(), 1);
    assert_eq!(bucket.size_groups.groups[0].files, names(&["e.txt"]));
    assert_eq!(report.summary.unreadable_files, 1);
    assert!(!report.summary.interrupted);
}

#[test]
fn test_budget_skips_remaining_files() {
    let data = vec![7u8; 64];
    let dir = setup(&[("a", data.clone()), ("b", data.clone()), ("c", data)]);
    let fs = LocalFs::rooted(dir.path());
    let config = ClusterConfig::default().with_max_bytes_read(Some(1));

    let outcome = cluster_by_content(&fs, 64, &names(&["a", "b", "c"]), &config);

    assert!(outcome.stats.budget_exhausted);
    assert_eq!(outcome.clusters[0].files(), names(&["a", "b"]));
    assert_eq!(outcome.skipped, names(&["c"]));
}

#[cfg(unix)]
#[test]
fn test_unreadable_candidate_does_not_abort() {
    use std::os::unix::fs::PermissionsExt;

    let data = vec![1u8; 32];
    let dir = setup(&[("a", data.clone()), ("b", data.clone()), ("locked", data)]);
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can still open the file; only check the isolation when it cannot.
    let readable = fs::File::open(&locked).is_ok();
    let fs_impl = LocalFs::rooted(dir.path());
    let outcome = cluster_by_content(
        &fs_impl,
        32,
        &names(&["a", "b", "locked"]),
        &ClusterConfig::default(),
    );
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(outcome.clusters[0].files()[..2], names(&["a", "b"])[..]);
    if !readable {
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].filename, "locked");
    }
}
