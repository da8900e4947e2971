use bytes::Bytes;
use std::sync::Arc;
use template_library::sidecar::{
    DownloadCounter, JsonFileCounter, MetadataRecord, SidecarError, SidecarStore,
};

fn test_sidecars() -> (tempfile::TempDir, SidecarStore) {
    let dir = tempfile::tempdir().unwrap();
    let files_dir = dir.path().join("files");
    let counter: Arc<dyn DownloadCounter> = Arc::new(JsonFileCounter::new(&files_dir));
    let store = SidecarStore::new(&files_dir, files_dir.join("previews"), counter).unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_text_sidecars_round_trip() {
    let (dir, store) = test_sidecars();

    store.write_title("Mall 1", "Mall 1").await.unwrap();
    store.write_description("Mall 1", "test").await.unwrap();

    assert_eq!(store.read_title("Mall 1").await.unwrap().as_deref(), Some("Mall 1"));
    assert_eq!(
        store.read_description("Mall 1").await.unwrap().as_deref(),
        Some("test")
    );
    assert!(dir.path().join("files/Mall 1_title.txt").exists());
    assert!(dir.path().join("files/Mall 1_description.txt").exists());
}

#[tokio::test]
async fn test_missing_sidecars_read_as_none() {
    let (_dir, store) = test_sidecars();

    let record = store.read_record("nothing").await.unwrap();
    assert_eq!(record, MetadataRecord::default());
}

#[tokio::test]
async fn test_first_preview_extension_wins() {
    let (_dir, store) = test_sidecars();

    store
        .write_preview("pic", Bytes::from("gif"), "gif")
        .await
        .unwrap();
    store
        .write_preview("pic", Bytes::from("png"), "png")
        .await
        .unwrap();

    let record = store.read_record("pic").await.unwrap();
    assert_eq!(record.preview.as_deref(), Some("pic.png"));

    store.remove_preview("pic").await.unwrap();
    assert!(store.read_preview_path("pic").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unsupported_preview_rejected() {
    let (_dir, store) = test_sidecars();

    let result = store.write_preview("pic", Bytes::from("x"), "svg").await;
    assert!(matches!(result, Err(SidecarError::UnsupportedImage(_))));
}

#[tokio::test]
async fn test_preview_file_lookup() {
    let (_dir, store) = test_sidecars();
    store
        .write_preview("pic", Bytes::from("jpg"), "jpg")
        .await
        .unwrap();

    assert!(store.preview_file("pic.jpg").await.unwrap().is_some());
    assert!(store.preview_file("pic.png").await.unwrap().is_none());
    assert!(store.preview_file("pic_title.txt").await.unwrap().is_none());
    assert!(store.preview_file("../pic.jpg").await.is_err());
}

#[tokio::test]
async fn test_rename_all_moves_every_sidecar() {
    let (_dir, store) = test_sidecars();

    store.write_title("old", "Old title").await.unwrap();
    store.write_description("old", "Old description").await.unwrap();
    store
        .write_preview("old", Bytes::from("img"), "webp")
        .await
        .unwrap();
    let before = store.read_record("old").await.unwrap();

    store.rename_all("old", "new").await.unwrap();

    assert_eq!(store.read_record("old").await.unwrap(), MetadataRecord::default());
    let after = store.read_record("new").await.unwrap();
    assert_eq!(after.title, before.title);
    assert_eq!(after.description, before.description);
    assert_eq!(after.preview.as_deref(), Some("new.webp"));
}

#[tokio::test]
async fn test_rename_all_skips_missing_sidecars() {
    let (_dir, store) = test_sidecars();

    store.write_title("partial", "Only a title").await.unwrap();
    store.rename_all("partial", "moved").await.unwrap();

    let record = store.read_record("moved").await.unwrap();
    assert_eq!(record.title.as_deref(), Some("Only a title"));
    assert!(record.description.is_none());
    assert!(record.preview.is_none());
}

#[tokio::test]
async fn test_remove_all_is_idempotent() {
    let (_dir, store) = test_sidecars();

    store.write_title("doomed", "Doomed").await.unwrap();
    store
        .write_preview("doomed", Bytes::from("img"), "png")
        .await
        .unwrap();

    store.remove_all("doomed").await.unwrap();
    assert_eq!(store.read_record("doomed").await.unwrap(), MetadataRecord::default());

    store.remove_all("doomed").await.unwrap();
}

#[tokio::test]
async fn test_download_counts_through_store() {
    let (_dir, store) = test_sidecars();

    store.increment_download_count("a.excalidrawlib").await.unwrap();
    store.increment_download_count("a.excalidrawlib").await.unwrap();
    assert_eq!(store.read_download_count("a.excalidrawlib").await.unwrap(), 2);

    store
        .rename_download_count("a.excalidrawlib", "b.excalidrawlib")
        .await
        .unwrap();
    assert_eq!(store.read_download_count("b.excalidrawlib").await.unwrap(), 2);

    store.forget_download_count("b.excalidrawlib").await.unwrap();
    assert!(store.download_counts().await.unwrap().is_empty());
}
