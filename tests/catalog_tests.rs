use template_library::catalog::{library_link, PageQuery, SortKey};
use template_library::config::{Config, CounterBackend, StorageConfig};
use template_library::error::LibraryError;
use template_library::library::UploadRequest;
use template_library::AppState;

const LIBRARY: &str = r#"{"type":"excalidrawlib","version":2,"libraryItems":[]}"#;

fn test_state(backend: CounterBackend) -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = StorageConfig::under(dir.path().join("files"));
    storage.data_dir = dir.path().join("data");
    storage.counter_backend = backend;
    let config = Config {
        admin: Default::default(),
        catalog: Default::default(),
        links: Default::default(),
        server: Default::default(),
        storage,
        test_mode: true,
    };
    (dir, AppState::open(config).unwrap())
}

async fn upload(state: &AppState, title: &str, description: &str) {
    let file = state
        .staging
        .stage_bytes("drawing.excalidrawlib", LIBRARY.as_bytes())
        .await
        .unwrap();
    let request = UploadRequest {
        file: Some(file),
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        ..Default::default()
    };
    state.library.upload(request).await.unwrap();
}

async fn download(state: &AppState, base_name: &str, times: usize) {
    for _ in 0..times {
        state
            .library
            .download(&format!("{base_name}.excalidrawlib"))
            .await
            .unwrap();
    }
}

fn query(sort: SortKey) -> PageQuery {
    PageQuery {
        search: String::new(),
        sort,
        page: 0,
        page_size: 10,
        token: String::new(),
    }
}

fn names(entries: &[template_library::catalog::CatalogEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.base_name.as_str()).collect()
}

#[tokio::test]
async fn test_untitled_artifacts_are_hidden() {
    let (_dir, state) = test_state(CounterBackend::Json);
    upload(&state, "visible", "").await;

    let files = &state.config.storage.files_dir;
    std::fs::write(files.join("bare.excalidrawlib"), LIBRARY).unwrap();
    std::fs::write(files.join("blank.excalidrawlib"), LIBRARY).unwrap();
    std::fs::write(files.join("blank_title.txt"), "   ").unwrap();

    let page = state.catalog.build_page(&query(SortKey::Name)).await.unwrap();
    assert_eq!(names(&page.entries), vec!["visible"]);
    assert_eq!(page.total_entries, 1);

    let admin = state.catalog.admin_listing().await.unwrap();
    let admin_names: Vec<&str> = admin.iter().map(|e| e.base_name.as_str()).collect();
    assert_eq!(admin_names, vec!["bare", "blank", "visible"]);
    assert!(admin.iter().all(|e| e.modified_at.is_some()));
}

#[tokio::test]
async fn test_sort_orders() {
    let (_dir, state) = test_state(CounterBackend::Json);
    for title in ["b", "a", "c"] {
        upload(&state, title, "").await;
    }
    download(&state, "a", 5).await;
    download(&state, "b", 2).await;

    let page = state.catalog.build_page(&query(SortKey::Name)).await.unwrap();
    assert_eq!(names(&page.entries), vec!["a", "b", "c"]);

    let page = state.catalog.build_page(&query(SortKey::Reverse)).await.unwrap();
    assert_eq!(names(&page.entries), vec!["c", "b", "a"]);

    let page = state.catalog.build_page(&query(SortKey::Popular)).await.unwrap();
    assert_eq!(names(&page.entries), vec!["a", "b", "c"]);
    let counts: Vec<u64> = page.entries.iter().map(|e| e.download_count).collect();
    assert_eq!(counts, vec![5, 2, 0]);
}

#[tokio::test]
async fn test_popular_ties_break_by_name() {
    let (_dir, state) = test_state(CounterBackend::Redb);
    for title in ["zeta", "alpha", "mid"] {
        upload(&state, title, "").await;
    }
    download(&state, "zeta", 1).await;
    download(&state, "alpha", 1).await;

    let page = state.catalog.build_page(&query(SortKey::Popular)).await.unwrap();
    assert_eq!(names(&page.entries), vec!["alpha", "zeta", "mid"]);
}

#[tokio::test]
async fn test_pagination() {
    let (_dir, state) = test_state(CounterBackend::Json);
    for i in 0..5 {
        upload(&state, &format!("item{i}"), "").await;
    }

    let mut q = query(SortKey::Name);
    q.page_size = 2;

    q.page = 0;
    let page = state.catalog.build_page(&q).await.unwrap();
    assert_eq!(names(&page.entries), vec!["item0", "item1"]);
    assert_eq!(page.total_entries, 5);
    assert_eq!(page.total_pages, 3);

    q.page = 2;
    let page = state.catalog.build_page(&q).await.unwrap();
    assert_eq!(names(&page.entries), vec!["item4"]);

    q.page = 7;
    let page = state.catalog.build_page(&q).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.total_pages, 3);

    q.page_size = 0;
    let result = state.catalog.build_page(&q).await;
    assert!(matches!(result, Err(LibraryError::InvalidInput(_))));
}

#[tokio::test]
async fn test_empty_library_has_no_pages() {
    let (_dir, state) = test_state(CounterBackend::Json);

    let page = state.catalog.build_page(&query(SortKey::Name)).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.total_entries, 0);
    assert_eq!(page.total_pages, 0);
}

#[tokio::test]
async fn test_search_matches_name_or_description() {
    let (_dir, state) = test_state(CounterBackend::Json);
    upload(&state, "Flowchart", "Boxes and arrows").await;
    upload(&state, "Network", "Cloud icons").await;
    upload(&state, "Plain", "").await;

    let mut q = query(SortKey::Name);

    q.search = "flow".to_string();
    let page = state.catalog.build_page(&q).await.unwrap();
    assert_eq!(names(&page.entries), vec!["Flowchart"]);

    q.search = "  CLOUD ".to_string();
    let page = state.catalog.build_page(&q).await.unwrap();
    assert_eq!(names(&page.entries), vec!["Network"]);
    assert_eq!(page.search, "CLOUD");

    q.search = "nothing".to_string();
    let page = state.catalog.build_page(&q).await.unwrap();
    assert!(page.entries.is_empty());
}

#[tokio::test]
async fn test_entries_carry_links_and_token() {
    let (_dir, state) = test_state(CounterBackend::Json);
    upload(&state, "Mall 1", "test").await;

    let mut q = query(SortKey::Name);
    q.token = "abc".to_string();
    let page = state.catalog.build_page(&q).await.unwrap();

    let entry = &page.entries[0];
    assert_eq!(entry.file_name, "Mall 1.excalidrawlib");
    assert_eq!(entry.public_path, "/files/Mall%201.excalidrawlib");
    assert_eq!(entry.title, "Mall 1");
    assert_eq!(entry.description, "test");
    assert_eq!(entry.preview_url, "");
    assert_eq!(entry.token, "abc");

    let link = library_link("draw.example.com", "https://lib.example.com/", &entry.file_name, &entry.token);
    assert_eq!(
        link,
        "https://draw.example.com#addLibrary=https%3A%2F%2Flib.example.com%2Ffiles%2FMall%201.excalidrawlib&token=abc"
    );
}
