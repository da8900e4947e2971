use template_library::config::{Config, StorageConfig};
use template_library::error::LibraryError;
use template_library::library::{EditRequest, UploadRequest};
use template_library::staging::StagedUpload;
use template_library::AppState;

const LIBRARY: &str = r#"{"type":"excalidrawlib","version":2,"libraryItems":[]}"#;

fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = StorageConfig::under(dir.path().join("files"));
    storage.data_dir = dir.path().join("data");
    let config = Config {
        admin: Default::default(),
        catalog: Default::default(),
        links: Default::default(),
        server: Default::default(),
        storage,
        test_mode: true,
    };
    let state = AppState::open(config).unwrap();
    (dir, state)
}

async fn stage(state: &AppState, name: &str, content: &str) -> StagedUpload {
    state
        .staging
        .stage_bytes(name, content.as_bytes())
        .await
        .unwrap()
}

async fn upload(state: &AppState, title: &str, description: &str) -> Result<String, LibraryError> {
    let request = UploadRequest {
        file: Some(stage(state, "drawing.excalidrawlib", LIBRARY).await),
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        ..Default::default()
    };
    state.library.upload(request).await
}

fn staged_count(state: &AppState) -> usize {
    std::fs::read_dir(state.staging.dir()).unwrap().count()
}

fn files_dir(state: &AppState) -> &std::path::Path {
    &state.config.storage.files_dir
}

#[tokio::test]
async fn test_upload_stores_artifact_and_sidecars() {
    let (_dir, state) = test_state();

    let base_name = upload(&state, "Mall 1", "test").await.unwrap();
    assert_eq!(base_name, "Mall 1");

    let files = files_dir(&state);
    assert_eq!(
        std::fs::read_to_string(files.join("Mall 1.excalidrawlib")).unwrap(),
        LIBRARY
    );
    assert_eq!(
        std::fs::read_to_string(files.join("Mall 1_title.txt")).unwrap(),
        "Mall 1"
    );
    assert_eq!(
        std::fs::read_to_string(files.join("Mall 1_description.txt")).unwrap(),
        "test"
    );
    assert_eq!(staged_count(&state), 0);

    let entries = state.catalog.admin_listing().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].download_count, 0);
}

#[tokio::test]
async fn test_upload_without_title_uses_default() {
    let (_dir, state) = test_state();

    let request = UploadRequest {
        file: Some(stage(&state, "drawing.excalidrawlib", LIBRARY).await),
        ..Default::default()
    };
    let base_name = state.library.upload(request).await.unwrap();
    assert_eq!(base_name, "Untitled");
    assert!(!files_dir(&state).join("Untitled_description.txt").exists());
}

#[tokio::test]
async fn test_duplicate_upload_collides() {
    let (_dir, state) = test_state();

    upload(&state, "Mall 1", "first").await.unwrap();
    let result = upload(&state, "Mall 1", "second").await;
    assert!(matches!(result, Err(LibraryError::NameCollision(_))));

    assert_eq!(
        std::fs::read_to_string(files_dir(&state).join("Mall 1_description.txt")).unwrap(),
        "first"
    );
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_upload_rejects_invalid_json() {
    let (_dir, state) = test_state();

    let request = UploadRequest {
        file: Some(stage(&state, "broken.excalidrawlib", "{not json").await),
        title: Some("Broken".to_string()),
        ..Default::default()
    };
    let result = state.library.upload(request).await;
    assert!(matches!(result, Err(LibraryError::ContentValidation(_))));

    assert!(!files_dir(&state).join("Broken.excalidrawlib").exists());
    assert!(!files_dir(&state).join("Broken_title.txt").exists());
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_upload_rejects_wrong_extension_and_bad_title() {
    let (_dir, state) = test_state();

    let request = UploadRequest {
        file: Some(stage(&state, "notes.json", LIBRARY).await),
        title: Some("Notes".to_string()),
        ..Default::default()
    };
    let result = state.library.upload(request).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));

    let result = upload(&state, "../escape", "").await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));

    let too_long = "x".repeat(200);
    let result = upload(&state, "Fine", &too_long).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
    assert!(!files_dir(&state).join("Fine.excalidrawlib").exists());

    let result = state.library.upload(UploadRequest::default()).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_upload_with_preview() {
    let (_dir, state) = test_state();

    let request = UploadRequest {
        file: Some(stage(&state, "drawing.excalidrawlib", LIBRARY).await),
        image: Some(stage(&state, "shot.PNG", "png-bytes").await),
        title: Some("Pictured".to_string()),
        ..Default::default()
    };
    state.library.upload(request).await.unwrap();

    let preview = state.library.preview_file("Pictured.png").await.unwrap();
    assert_eq!(std::fs::read(preview).unwrap(), b"png-bytes");

    let request = UploadRequest {
        file: Some(stage(&state, "drawing.excalidrawlib", LIBRARY).await),
        image: Some(stage(&state, "vector.svg", "<svg/>").await),
        title: Some("Vector".to_string()),
        ..Default::default()
    };
    let result = state.library.upload(request).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
    assert!(!files_dir(&state).join("Vector.excalidrawlib").exists());
}

#[tokio::test]
async fn test_edit_metadata() {
    let (_dir, state) = test_state();
    upload(&state, "Mall 1", "test").await.unwrap();

    let request = EditRequest {
        title: "New title".to_string(),
        description: "<script>x</script>Fresh & new".to_string(),
        image: Some(stage(&state, "shot.jpg", "jpg-bytes").await),
    };
    state
        .library
        .edit_metadata("Mall 1", request)
        .await
        .unwrap();

    let entries = state.catalog.admin_listing().await.unwrap();
    assert_eq!(entries[0].base_name, "Mall 1");
    assert_eq!(entries[0].title, "New title");
    assert_eq!(entries[0].description, "Fresh &amp; new");
    assert_eq!(entries[0].preview_url, "/uploads/previews/Mall%201.jpg");
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_edit_requires_fields_and_artifact() {
    let (_dir, state) = test_state();

    let request = EditRequest {
        title: "Title".to_string(),
        description: "Description".to_string(),
        image: None,
    };
    let result = state.library.edit_metadata("ghost", request).await;
    assert!(matches!(result, Err(LibraryError::NotFound(_))));

    upload(&state, "Present", "test").await.unwrap();
    let request = EditRequest {
        title: "Title".to_string(),
        description: "   ".to_string(),
        image: None,
    };
    let result = state.library.edit_metadata("Present", request).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
}

#[tokio::test]
async fn test_replace_keeps_name_when_unchanged() {
    let (_dir, state) = test_state();
    upload(&state, "Same", "test").await.unwrap();

    let updated = r#"{"libraryItems":[{"id":"1"}]}"#;
    let file = stage(&state, "Same.excalidrawlib", updated).await;
    let base_name = state.library.replace_artifact("Same", file).await.unwrap();

    assert_eq!(base_name, "Same");
    assert_eq!(
        std::fs::read_to_string(files_dir(&state).join("Same.excalidrawlib")).unwrap(),
        updated
    );
}

#[tokio::test]
async fn test_replace_disambiguates_and_moves_sidecars() {
    let (_dir, state) = test_state();
    upload(&state, "Old", "old description").await.unwrap();
    upload(&state, "Taken", "other").await.unwrap();
    state.library.download("Old.excalidrawlib").await.unwrap();
    state.library.download("Old.excalidrawlib").await.unwrap();

    let file = stage(&state, "Taken.excalidrawlib", LIBRARY).await;
    let base_name = state.library.replace_artifact("Old", file).await.unwrap();
    assert_eq!(base_name, "Taken(1)");

    let files = files_dir(&state);
    assert!(!files.join("Old.excalidrawlib").exists());
    assert!(!files.join("Old_title.txt").exists());
    assert_eq!(
        std::fs::read_to_string(files.join("Taken(1)_title.txt")).unwrap(),
        "Old"
    );
    assert_eq!(
        std::fs::read_to_string(files.join("Taken_description.txt")).unwrap(),
        "other"
    );

    let entries = state.catalog.admin_listing().await.unwrap();
    let moved = entries.iter().find(|e| e.base_name == "Taken(1)").unwrap();
    assert_eq!(moved.download_count, 2);
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_replace_validates_content() {
    let (_dir, state) = test_state();
    upload(&state, "Target", "test").await.unwrap();

    let file = stage(&state, "Target.excalidrawlib", r#"{"items":[]}"#).await;
    let result = state.library.replace_artifact("Target", file).await;
    assert!(matches!(result, Err(LibraryError::ContentValidation(_))));

    let file = stage(&state, "Target.excalidrawlib", LIBRARY).await;
    let result = state.library.replace_artifact("Missing", file).await;
    assert!(matches!(result, Err(LibraryError::NotFound(_))));
    assert_eq!(staged_count(&state), 0);
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let (_dir, state) = test_state();

    let request = UploadRequest {
        file: Some(stage(&state, "drawing.excalidrawlib", LIBRARY).await),
        image: Some(stage(&state, "shot.gif", "gif").await),
        title: Some("Doomed".to_string()),
        description: Some("bye".to_string()),
    };
    state.library.upload(request).await.unwrap();
    state.library.download("Doomed.excalidrawlib").await.unwrap();

    state.library.delete("Doomed").await.unwrap();

    let files = files_dir(&state);
    assert!(!files.join("Doomed.excalidrawlib").exists());
    assert!(!files.join("Doomed_title.txt").exists());
    assert!(!files.join("Doomed_description.txt").exists());
    assert!(!state.config.storage.preview_dir.join("Doomed.gif").exists());
    assert!(state.catalog.admin_listing().await.unwrap().is_empty());

    // A re-upload under the same name starts from zero
    upload(&state, "Doomed", "again").await.unwrap();
    let entries = state.catalog.admin_listing().await.unwrap();
    assert_eq!(entries[0].download_count, 0);
}

#[tokio::test]
async fn test_names_with_extension_address_their_own_artifact() {
    let (_dir, state) = test_state();
    upload(&state, "a", "plain").await.unwrap();
    upload(&state, "a.excalidrawlib", "suffixed").await.unwrap();

    let files = files_dir(&state);
    assert!(files.join("a.excalidrawlib").exists());
    assert!(files.join("a.excalidrawlib.excalidrawlib").exists());

    let request = EditRequest {
        title: "Edited".to_string(),
        description: "changed".to_string(),
        image: None,
    };
    state
        .library
        .edit_metadata("a.excalidrawlib", request)
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(files.join("a_description.txt")).unwrap(),
        "plain"
    );
    assert_eq!(
        std::fs::read_to_string(files.join("a.excalidrawlib_description.txt")).unwrap(),
        "changed"
    );

    let download = state
        .library
        .download("a.excalidrawlib.excalidrawlib")
        .await
        .unwrap();
    assert_eq!(download.data, LIBRARY.as_bytes());

    state.library.delete("a.excalidrawlib").await.unwrap();
    assert!(files.join("a.excalidrawlib").exists());
    assert!(!files.join("a.excalidrawlib.excalidrawlib").exists());

    let entries = state.catalog.admin_listing().await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.base_name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
    assert_eq!(entries[0].download_count, 0);
}

#[tokio::test]
async fn test_delete_unknown_is_noop() {
    let (_dir, state) = test_state();
    state.library.delete("ghost").await.unwrap();
}

#[tokio::test]
async fn test_download_counts_and_rejects_other_files() {
    let (_dir, state) = test_state();
    upload(&state, "Counted", "test").await.unwrap();

    let download = state.library.download("Counted.excalidrawlib").await.unwrap();
    assert_eq!(download.data, LIBRARY.as_bytes());

    let result = state.library.download("Counted_title.txt").await;
    assert!(matches!(result, Err(LibraryError::NotFound(_))));
    let result = state.library.download("missing.excalidrawlib").await;
    assert!(matches!(result, Err(LibraryError::NotFound(_))));

    let entries = state.catalog.admin_listing().await.unwrap();
    assert_eq!(entries[0].download_count, 1);
}

#[tokio::test]
async fn test_purge_removes_all_artifacts() {
    let (_dir, state) = test_state();
    upload(&state, "One", "").await.unwrap();
    upload(&state, "Two", "").await.unwrap();

    assert_eq!(state.library.purge().await.unwrap(), 2);
    assert!(state.catalog.admin_listing().await.unwrap().is_empty());
}
