//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! crawl and persist cycles against an in-memory store.

use link_spider::config::{
    Config, CrawlerConfig, SeedConfig, StoreBackend, StoreConfig, UserAgentConfig,
};
use link_spider::crawler::{crawl, HaltHandle, HttpFetcher, PageFetcher};
use link_spider::handoff::{PageRepository, RESUME_SIGNAL};
use link_spider::storage::{MemoryStore, PageStore};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `seeds`
fn create_test_config(seeds: Vec<String>, max_pages: usize, max_concurrency: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages,
            max_concurrency,
            fetch_timeout_ms: 2000,
            cycles: 1,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        },
        seeds: SeedConfig { urls: seeds },
    }
}

fn fetcher_for(config: &Config) -> Arc<dyn PageFetcher> {
    Arc::new(
        HttpFetcher::from_config(
            &config.user_agent,
            Duration::from_millis(config.crawler.fetch_timeout_ms),
        )
        .expect("Failed to build fetcher"),
    )
}

/// Normalized key of a mock server path ("127.0.0.1:PORT/path")
fn key(server: &MockServer, path: &str) -> String {
    let host = server.uri().trim_start_matches("http://").to_string();
    if path == "/" {
        host
    } else {
        format!("{}{}", host, path)
    }
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Mounts an index page linking to `/page1` .. `/pageN`, each a leaf
async fn mount_fan_out(server: &MockServer, pages: usize) {
    let base_url = server.uri();
    let links: String = (1..=pages)
        .map(|i| format!(r#"<a href="{}/page{}">Page {}</a>"#, base_url, i, i))
        .collect();
    mount_html(
        server,
        "/",
        format!("<html><head><title>Home</title></head><body>{}</body></html>", links),
    )
    .await;

    for i in 1..=pages {
        mount_html(
            server,
            &format!("/page{}", i),
            format!("<html><head><title>Page {}</title></head><body>Leaf</body></html>", i),
        )
        .await;
    }
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        format!(
            r#"<html><head><title>Home</title>
            <meta name="description" content="The front page"></head><body>
            <a href="{}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#,
            base_url
        ),
    )
    .await;

    mount_html(
        &mock_server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
            <a href="/">Home</a><a href="/page2">Page 2</a>
            </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        &mock_server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body>
            <img src="/cat.png" alt="A cat"><img src="/dog.png">
            </body></html>"#
            .to_string(),
    )
    .await;

    let config = create_test_config(vec![format!("{}/", base_url)], 50, 4);
    let store = Arc::new(MemoryStore::new());
    let repository = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &config.store);

    let summary = crawl(&config, fetcher_for(&config), &repository, &HaltHandle::default())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.pages_saved, 3);
    assert!(summary.remaining.is_empty());

    let home = key(&mock_server, "/");
    let page1 = key(&mock_server, "/page1");
    let page2 = key(&mock_server, "/page2");

    let stored = store.hash(&format!("page:{}", home)).expect("Home not stored");
    assert_eq!(stored["title"], "Home");
    assert_eq!(stored["description"], "The front page");

    let mut queued = store.queue("pages_queue");
    queued.sort();
    let mut expected = vec![
        format!("page:{}", home),
        format!("page:{}", page1),
        format!("page:{}", page2),
    ];
    expected.sort();
    assert_eq!(queued, expected);

    assert_eq!(
        store.set_members(&format!("outlinks:{}", home)),
        vec![page1.clone(), page2.clone()]
    );
    assert_eq!(
        store.set_members(&format!("backlinks:{}", page2)),
        vec![home.clone(), page1.clone()]
    );
    assert_eq!(
        store.set_members(&format!("backlinks:{}", home)),
        vec![page1.clone()]
    );

    assert_eq!(
        store.queue("images_queue"),
        vec![format!("page_images:{}", page2)]
    );
    assert_eq!(store.set_members(&format!("page_images:{}", page2)).len(), 2);
    let cat_src = store
        .set_members(&format!("page_images:{}", page2))
        .into_iter()
        .find(|src| src.ends_with("/cat.png"))
        .expect("Cat missing from image set");
    let cat = store
        .hash(&format!("image:{}", cat_src))
        .expect("Image not stored");
    assert_eq!(cat["alt"], "A cat");
    assert!(cat["src"].ends_with("/cat.png"));
}

#[tokio::test]
async fn test_failed_and_non_html_pages_are_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/",
        format!(
            r#"<html><body>
            <a href="{0}/missing">Missing</a>
            <a href="{0}/data.json">Data</a>
            <a href="{0}/ok">Ok</a>
            </body></html>"#,
            base_url
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;

    mount_html(&mock_server, "/ok", "<html><body>fine</body></html>".to_string()).await;

    let config = create_test_config(vec![format!("{}/", base_url)], 50, 2);
    let store = Arc::new(MemoryStore::new());
    let repository = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &config.store);

    let summary = crawl(&config, fetcher_for(&config), &repository, &HaltHandle::default())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.pages_saved, 2);
    assert!(store
        .hash(&format!("page:{}", key(&mock_server, "/missing")))
        .is_none());
    assert!(store
        .hash(&format!("page:{}", key(&mock_server, "/data.json")))
        .is_none());
    // Edges to pages that failed are still part of the graph
    assert_eq!(
        store.set_members(&format!("backlinks:{}", key(&mock_server, "/missing"))),
        vec![key(&mock_server, "/")]
    );
}

#[tokio::test]
async fn test_page_bound_carries_frontier_into_next_cycle() {
    let mock_server = MockServer::start().await;
    mount_fan_out(&mock_server, 5).await;

    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())], 2, 1);
    config.crawler.cycles = 2;

    let store = Arc::new(MemoryStore::new());
    let repository = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &config.store);

    let summary = crawl(&config, fetcher_for(&config), &repository, &HaltHandle::default())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.pages_saved, 4);
    assert_eq!(store.submitted_batches(), 2);
    assert_eq!(summary.remaining.len(), 2);

    let pages = repository.fetch_all().await.expect("Fetch failed");
    assert_eq!(pages.len(), 4);
    assert_eq!(pages[&key(&mock_server, "/")].title, "Home");
    assert_eq!(pages[&key(&mock_server, "/page1")].title, "Page 1");
    assert!(pages.contains_key(&key(&mock_server, "/page3")));
    assert!(!pages.contains_key(&key(&mock_server, "/page4")));
}

#[tokio::test]
async fn test_resume_signal_gates_next_cycle() {
    let mock_server = MockServer::start().await;
    mount_fan_out(&mock_server, 5).await;

    let mut config = create_test_config(vec![format!("{}/", mock_server.uri())], 2, 1);
    config.crawler.cycles = 3;
    config.store.wait_for_signal = true;
    config.store.signal_timeout_secs = 1;

    let store = Arc::new(MemoryStore::new());
    store
        .push(&config.store.signal_queue, RESUME_SIGNAL)
        .await
        .expect("Push failed");
    let repository = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &config.store);

    let summary = crawl(&config, fetcher_for(&config), &repository, &HaltHandle::default())
        .await
        .expect("Crawl failed");

    // One signal allows exactly one extra cycle; the third times out
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.pages_saved, 4);
    assert!(store.queue(&config.store.signal_queue).is_empty());
}

#[tokio::test]
async fn test_halted_run_persists_nothing_new() {
    let mock_server = MockServer::start().await;
    mount_fan_out(&mock_server, 2).await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(vec![seed.clone()], 10, 2);
    let store = Arc::new(MemoryStore::new());
    let repository = PageRepository::new(Arc::clone(&store) as Arc<dyn PageStore>, &config.store);

    let halt = HaltHandle::default();
    halt.halt();

    let summary = crawl(&config, fetcher_for(&config), &repository, &halt)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.pages_saved, 0);
    assert_eq!(summary.remaining, vec![seed]);
    assert!(store.queue("pages_queue").is_empty());
}
