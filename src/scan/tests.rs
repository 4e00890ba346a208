use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::ExtensionSet,
    error::Error,
    job::Status,
    store::{JobStore, LocalJobStore},
};

use super::{Scanner, Selector};

fn selector(list: &str) -> Selector {
    Selector::new(ExtensionSet::parse(list))
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, name.as_bytes()).unwrap();
    path
}

#[test]
fn thumbnails_are_excluded() {
    let selector = selector("jpg,png");
    assert!(!selector.selects(Path::new("/data/photo_.jpg")));
    assert!(selector.selects(Path::new("/data/photo.jpg")));
    assert!(selector.selects(Path::new("/data/PHOTO.JPG")));
    assert!(!selector.selects(Path::new("/data/note.txt")));
}

#[test]
fn thumbnail_check_only_looks_at_file_name() {
    let selector = selector("jpg");
    assert!(selector.selects(Path::new("/data/raw_.dir/photo.jpg")));
}

#[test]
fn exclusion_can_be_replaced_or_dropped() {
    let keep_all = selector("jpg").without_exclude();
    assert!(keep_all.selects(Path::new("/data/photo_.jpg")));

    let no_drafts = selector("jpg").with_exclude(|path, _| {
        path.to_string_lossy().contains("/drafts/")
    });
    assert!(no_drafts.selects(Path::new("/data/photo_.jpg")));
    assert!(!no_drafts.selects(Path::new("/data/drafts/photo.jpg")));
}

#[tokio::test]
async fn scan_counts_selected_and_visited_files() {
    let root = tempfile::tempdir().unwrap();
    for name in [
        "a.jpg",
        "b.jpg",
        "c.jpg",
        "d.png",
        "e.png",
        "note.txt",
        "thumb_.jpg",
    ] {
        touch(root.path(), name);
    }

    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());
    let main = Scanner::new(selector("jpg,png"))
        .run(&store, root.path())
        .await
        .unwrap();

    assert_eq!(main.jobs_total, 5);
    assert_eq!(main.files_total, 7);
    assert_eq!(main.status, Status::Uploading);
    assert_eq!(store.load_main().await.unwrap(), main);

    let group = store.load_group(1).await.unwrap();
    assert_eq!(group.len(), 5);
    assert!(group.iter().all(|item| !item.uploaded));
    assert!(!store.group_path(2).exists());
}

#[tokio::test]
async fn scan_chunks_jobs_into_groups() {
    let root = tempfile::tempdir().unwrap();
    for i in 0..2500 {
        touch(root.path(), &format!("dir{}/img{i}.jpg", i % 7));
    }

    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());
    let main = Scanner::new(selector("jpg"))
        .run(&store, root.path())
        .await
        .unwrap();
    assert_eq!(main.jobs_total, 2500);
    assert_eq!(main.group_count(1000), 3);

    let mut indices = vec![];
    for (group_index, expected_len) in [(1, 1000), (2, 1000), (3, 500)] {
        let group = store.load_group(group_index).await.unwrap();
        assert_eq!(group.len(), expected_len);
        indices.extend(group.iter().map(|item| item.index));
    }
    assert!(!store.group_path(4).exists());

    let expected: Vec<u64> = (0..2500).collect();
    assert_eq!(indices, expected);
}

#[tokio::test]
async fn exact_multiple_of_capacity_leaves_no_empty_group() {
    let root = tempfile::tempdir().unwrap();
    for i in 0..6 {
        touch(root.path(), &format!("img{i}.png"));
    }

    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());
    let main = Scanner::new(selector("png"))
        .with_capacity(3)
        .run(&store, root.path())
        .await
        .unwrap();

    assert_eq!(main.group_count(3), 2);
    assert_eq!(store.load_group(2).await.unwrap().len(), 3);
    assert!(!store.group_path(3).exists());
}

#[tokio::test]
async fn empty_folder_yields_empty_job() {
    let root = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());
    let main = Scanner::new(selector("jpg"))
        .run(&store, root.path())
        .await
        .unwrap();

    assert_eq!(main.jobs_total, 0);
    assert_eq!(main.group_count(1000), 0);
    assert_eq!(main.status, Status::Uploading);
}

#[tokio::test]
async fn missing_root_aborts_scan() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("gone");
    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());

    let result = Scanner::new(selector("jpg")).run(&store, &missing).await;
    assert!(matches!(result, Err(Error::Scan { .. })));
    assert_eq!(store.load_main().await.unwrap().status, Status::NotStarted);
}

#[tokio::test]
async fn file_root_aborts_scan() {
    let root = tempfile::tempdir().unwrap();
    let file = touch(root.path(), "a.jpg");
    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());

    let result = Scanner::new(selector("jpg")).run(&store, &file).await;
    assert!(matches!(result, Err(Error::Scan { path, .. }) if path == file));
    assert_eq!(store.load_main().await.unwrap().status, Status::NotStarted);
}

#[cfg(unix)]
#[tokio::test]
async fn linked_files_are_followed_but_linked_folders_are_not() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    touch(root.path(), "a.jpg");
    let target = touch(outside.path(), "b.jpg");
    touch(outside.path(), "nested/c.jpg");
    std::os::unix::fs::symlink(&target, root.path().join("link.jpg")).unwrap();
    std::os::unix::fs::symlink(outside.path().join("nested"), root.path().join("nested")).unwrap();

    let data = tempfile::tempdir().unwrap();
    let store = LocalJobStore::new(data.path());
    let main = Scanner::new(selector("jpg"))
        .run(&store, root.path())
        .await
        .unwrap();

    assert_eq!(main.jobs_total, 2);
    assert_eq!(main.files_total, 2);
}
