//! End-to-end ingestion against a real storage root.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hermes_core::ArchiveFormat;
use hermes_core::ArchiveRequest;
use hermes_core::ErrorKind;
use hermes_core::IngestConfig;
use hermes_core::Ingestor;
use hermes_core::Limits;
use hermes_core::TargetPath;
use hermes_core::test_utils::SevenZipTestBuilder;
use hermes_core::test_utils::TarGzTestBuilder;
use hermes_core::test_utils::ZipTestBuilder;
use tempfile::TempDir;
use walkdir::WalkDir;

fn setup() -> (TempDir, Ingestor) {
    let temp = TempDir::new().expect("failed to create temp dir");
    let ingestor = Ingestor::new(IngestConfig::new(temp.path()).unwrap());
    (temp, ingestor)
}

fn request(target: &str, filename: &str, bytes: Vec<u8>) -> ArchiveRequest<std::io::Cursor<Vec<u8>>> {
    ArchiveRequest::from_bytes(TargetPath::parse(target).unwrap(), filename, bytes)
}

/// Every path under `root` with its file contents (`None` for directories).
fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let contents = entry
                .file_type()
                .is_file()
                .then(|| fs::read(entry.path()).unwrap());
            (relative, contents)
        })
        .collect()
}

fn site_tar_gz() -> Vec<u8> {
    TarGzTestBuilder::new()
        .add_file("README.md", b"# site")
        .add_directory("src/")
        .add_file("src/app.py", b"print('hi')")
        .build()
}

fn seed_old_content(root: &Path) {
    fs::create_dir_all(root.join("site/assets")).unwrap();
    fs::write(root.join("site/index.html"), "old").unwrap();
    fs::write(root.join("site/assets/app.css"), "body{}").unwrap();
    fs::write(root.join("unrelated.txt"), "keep me").unwrap();
}

#[test]
fn test_readme_and_src_scenario() {
    let (temp, ingestor) = setup();

    let result = ingestor
        .ingest(request("/deployments/v1", "site.tar.gz", site_tar_gz()))
        .unwrap();

    assert_eq!(result.extracted_items, ["README.md", "src"]);
    assert_eq!(result.total_extracted_paths, 3);
    assert_eq!(result.archive_type, ArchiveFormat::TarGz);
    assert_eq!(result.filename, "site.tar.gz");

    let target = temp.path().join("deployments/v1");
    assert_eq!(fs::read_to_string(target.join("README.md")).unwrap(), "# site");
    assert_eq!(
        fs::read_to_string(target.join("src/app.py")).unwrap(),
        "print('hi')"
    );
}

#[test]
fn test_zip_traversal_rejected_without_side_effects() {
    let (temp, ingestor) = setup();
    fs::create_dir_all(temp.path().join("a/b")).unwrap();
    let before = snapshot(temp.path());

    let data = ZipTestBuilder::new()
        .add_file("index.html", b"<h1>")
        .add_file("../../etc/passwd", b"root:x:0:0")
        .build();
    let err = ingestor.ingest(request("/a/b", "evil.zip", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsafePath);
    assert_eq!(snapshot(temp.path()), before);
    assert!(!temp.path().join("etc/passwd").exists());
    assert!(!temp.path().join("a/etc/passwd").exists());
}

#[test]
fn test_tar_traversal_rolls_back_after_partial_write() {
    let (temp, ingestor) = setup();
    seed_old_content(temp.path());
    let before = snapshot(temp.path());

    // Tar has no manifest, so the first entry lands in staging before the
    // hostile one is seen.
    let data = TarGzTestBuilder::new()
        .add_file("index.html", b"new")
        .add_file("../../../outside.txt", b"pwned")
        .build();
    let err = ingestor.ingest(request("/site", "site.tgz", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsafePath);
    assert!(err.previous_content_preserved());
    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_ingest_is_idempotent() {
    let (temp, ingestor) = setup();

    let first = ingestor
        .ingest(request("/site", "site.tar.gz", site_tar_gz()))
        .unwrap();
    let after_first = snapshot(temp.path());
    let second = ingestor
        .ingest(request("/site", "site.tar.gz", site_tar_gz()))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(snapshot(temp.path()), after_first);
}

#[test]
fn test_replacement_removes_stale_entries() {
    let (temp, ingestor) = setup();
    seed_old_content(temp.path());

    let data = ZipTestBuilder::new().add_file("index.html", b"new").build();
    ingestor.ingest(request("/site", "site.zip", data)).unwrap();

    let site = snapshot(&temp.path().join("site"));
    assert_eq!(site.len(), 1);
    assert_eq!(site["index.html"].as_deref(), Some(&b"new"[..]));
    assert_eq!(
        fs::read_to_string(temp.path().join("unrelated.txt")).unwrap(),
        "keep me"
    );
}

#[test]
fn test_zip_content_named_tar_gz_is_mismatch() {
    let (temp, ingestor) = setup();
    let data = ZipTestBuilder::new().add_file("a.txt", b"a").build();

    let err = ingestor.ingest(request("/x", "a.tar.gz", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FormatMismatch);
    assert!(snapshot(temp.path()).is_empty());
}

#[test]
fn test_tar_file_before_its_directory() {
    let (temp, ingestor) = setup();
    let data = TarGzTestBuilder::new()
        .add_file("docs/guide/intro.md", b"intro")
        .add_directory("docs/guide/")
        .add_directory("docs/")
        .build();

    let result = ingestor.ingest(request("/kb", "kb.tar.gz", data)).unwrap();

    assert_eq!(result.extracted_items, ["docs"]);
    assert_eq!(result.total_extracted_paths, 3);
    assert_eq!(
        fs::read_to_string(temp.path().join("kb/docs/guide/intro.md")).unwrap(),
        "intro"
    );
}

#[test]
fn test_truncated_tar_rolls_back() {
    let (temp, ingestor) = setup();
    seed_old_content(temp.path());
    let before = snapshot(temp.path());

    let data = TarGzTestBuilder::new()
        .add_file("ok.txt", b"fine")
        .add_truncated_file("big.bin", b"only a little", 4096)
        .build_unterminated();
    let err = ingestor.ingest(request("/site", "site.tar.gz", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TruncatedArchive);
    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_truncated_zip_is_rejected() {
    let (temp, ingestor) = setup();
    let mut data = ZipTestBuilder::new()
        .add_file("a.txt", &[b'a'; 1000])
        .build();
    data.truncate(data.len() / 2);

    let err = ingestor.ingest(request("/site", "site.zip", data)).unwrap_err();

    assert!(matches!(
        err.kind(),
        ErrorKind::CorruptArchive | ErrorKind::TruncatedArchive
    ));
    assert!(snapshot(temp.path()).is_empty());
}

#[test]
fn test_existing_file_target_is_filesystem_error() {
    let (temp, ingestor) = setup();
    fs::write(temp.path().join("site"), "i am a file").unwrap();
    let before = snapshot(temp.path());

    let data = ZipTestBuilder::new().add_file("a.txt", b"a").build();
    let err = ingestor.ingest(request("/site", "site.zip", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Filesystem);
    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_storage_root_target() {
    let (temp, ingestor) = setup();
    fs::write(temp.path().join("old.txt"), "old").unwrap();
    fs::create_dir(temp.path().join("old-dir")).unwrap();

    let data = ZipTestBuilder::new()
        .add_directory("public/")
        .add_file("public/index.html", b"<p>")
        .build();
    let result = ingestor.ingest(request("/", "root.zip", data)).unwrap();

    assert_eq!(result.created_path, temp.path().canonicalize().unwrap());
    assert_eq!(result.extracted_items, ["public"]);
    let names: Vec<_> = snapshot(temp.path()).into_keys().collect();
    assert_eq!(names, ["public", "public/index.html"]);
}

#[test]
fn test_symlink_entry_rejected() {
    let (temp, ingestor) = setup();
    let data = ZipTestBuilder::new()
        .add_file("a.txt", b"a")
        .add_symlink("escape", "/etc")
        .build();

    let err = ingestor.ingest(request("/site", "site.zip", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedEntryKind);
    assert!(err.is_security_violation());
    assert!(snapshot(temp.path()).is_empty());
}

#[test]
fn test_hardlink_and_fifo_rejected() {
    let (_temp, ingestor) = setup();

    let hardlink = TarGzTestBuilder::new()
        .add_file("a.txt", b"a")
        .add_hardlink("b.txt", "a.txt")
        .build();
    let err = ingestor.ingest(request("/x", "x.tgz", hardlink)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEntryKind);

    let fifo = TarGzTestBuilder::new().add_fifo("pipe").build();
    let err = ingestor.ingest(request("/x", "x.tgz", fifo)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEntryKind);
}

#[test]
fn test_file_count_limit() {
    let temp = TempDir::new().unwrap();
    let limits = Limits {
        max_file_count: 2,
        ..Limits::default()
    };
    let ingestor = Ingestor::new(IngestConfig::new(temp.path()).unwrap().with_limits(limits));

    let data = TarGzTestBuilder::new()
        .add_file("a", b"1")
        .add_file("b", b"2")
        .add_file("c", b"3")
        .build();
    let err = ingestor.ingest(request("/x", "x.tar.gz", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::QuotaExceeded);
    assert!(snapshot(temp.path()).is_empty());
}

#[test]
fn test_sevenz_success() {
    let (temp, ingestor) = setup();
    let data = SevenZipTestBuilder::new()
        .add_directory("src")
        .add_file("src/main.rs", b"fn main() {}")
        .add_file("Cargo.toml", b"[package]")
        .build();

    let result = ingestor.ingest(request("/crate", "crate.7z", data)).unwrap();

    assert_eq!(result.archive_type, ArchiveFormat::SevenZip);
    assert_eq!(result.extracted_items, ["src", "Cargo.toml"]);
    assert_eq!(result.total_extracted_paths, 3);
    assert_eq!(
        fs::read_to_string(temp.path().join("crate/src/main.rs")).unwrap(),
        "fn main() {}"
    );
}

#[test]
fn test_sevenz_traversal_rejected() {
    let (temp, ingestor) = setup();
    let data = SevenZipTestBuilder::new()
        .add_file("ok.txt", b"ok")
        .add_file("../escape.txt", b"pwned")
        .build();

    let err = ingestor.ingest(request("/x", "x.7z", data)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsafePath);
    assert!(snapshot(temp.path()).is_empty());
}

#[test]
fn test_empty_zip_creates_empty_target() {
    let (temp, ingestor) = setup();
    seed_old_content(temp.path());

    let result = ingestor
        .ingest(request("/site", "empty.zip", ZipTestBuilder::new().build()))
        .unwrap();

    assert!(result.extracted_items.is_empty());
    assert_eq!(result.total_extracted_paths, 0);
    assert!(snapshot(&temp.path().join("site")).is_empty());
}

#[test]
fn test_success_payload_json() {
    let (_temp, ingestor) = setup();
    let result = ingestor
        .ingest(request("/deployments/v1", "site.tar.gz", site_tar_gz()))
        .unwrap();

    let json = serde_json::to_value(result.response()).unwrap();
    assert_eq!(json["status"], "extracted");
    assert_eq!(json["archive_type"], "tar.gz");
    assert_eq!(json["extracted_items"], serde_json::json!(["README.md", "src"]));
    assert_eq!(json["total_extracted_paths"], 3);
}

#[test]
fn test_independent_targets_in_parallel() {
    let (temp, ingestor) = setup();

    std::thread::scope(|scope| {
        for i in 0..4 {
            let ingestor = ingestor.clone();
            scope.spawn(move || {
                let data = ZipTestBuilder::new()
                    .add_file("id.txt", i.to_string().as_bytes())
                    .build();
                ingestor
                    .ingest(request(&format!("/t{i}"), "t.zip", data))
                    .unwrap();
            });
        }
    });

    for i in 0..4 {
        assert_eq!(
            fs::read_to_string(temp.path().join(format!("t{i}/id.txt"))).unwrap(),
            i.to_string()
        );
    }
}
