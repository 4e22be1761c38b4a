use healer_browser::{BrowserError, BrowserSession};
use healer_core::{BrowserConfig, PageFetcher};

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_session_launch() {
    let session = BrowserSession::launch(&BrowserConfig::default()).await;
    assert!(session.is_ok(), "Failed to launch browser session");
    session.expect("session").shutdown().await.expect("shutdown");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_fetch_renders_page() {
    let session = BrowserSession::launch(&BrowserConfig::default())
        .await
        .expect("launch");

    let html = session.fetch("https://example.com").await.expect("fetch");
    assert!(html.contains("<html"));

    session.close().await.expect("close");
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_fetch_after_close_fails() {
    let session = BrowserSession::launch(&BrowserConfig::default())
        .await
        .expect("launch");
    session.shutdown().await.expect("shutdown");
    session.shutdown().await.expect("second shutdown is a no-op");

    assert!(session.is_closed().await);
    assert!(matches!(
        session.page_html("https://example.com").await,
        Err(BrowserError::Closed)
    ));
}
