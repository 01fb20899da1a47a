use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use client::{
    ApiClient, Cache, ClientError, MemoryClipboard, RetryPolicy, SearchParams, Searcher, Session,
    SessionState, ToastKind, error::GENERATION_FAILED,
};
use image::{ImageFormat, Rgba, RgbaImage};
use lgtm::{HostPolicy, LgtmOptions, Renderer, font::find_system_font};
use serde_json::{Value, json};
use shared::{ErrorCode, ImageSource};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": { "code": code, "message": message },
            "meta": { "timestamp": 1 }
        })),
    )
        .into_response()
}

fn search_result(query: &str, page: u32) -> Value {
    json!({
        "success": true,
        "data": {
            "query": query,
            "source": "unsplash",
            "images": [{
                "id": "unsplash_a1",
                "url": "https://images.unsplash.com/a1",
                "thumbnailUrl": "https://images.unsplash.com/a1-small",
                "width": 4000,
                "height": 3000,
                "photographer": "Jane",
                "source": "unsplash",
                "sourceUrl": "https://unsplash.com/photos/a1"
            }],
            "totalResults": 1,
            "page": page,
            "perPage": 20,
            "totalPages": 1,
            "timestamp": 1
        },
        "meta": { "timestamp": 1 }
    })
}

/// `query` picks the behavior: `flaky` fails twice, `down` always fails,
/// `short` is rejected as a client error.
async fn search(State(hits): State<Hits>, Query(params): Query<Vec<(String, String)>>) -> Response {
    let attempt = hits.bump();
    let param = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };
    let query = param("query").unwrap_or_default();
    let page = param("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    match query.as_str() {
        "flaky" if attempt < 3 => {
            error(StatusCode::BAD_GATEWAY, "EXTERNAL_API_ERROR", "Unsplash API error: Bad Gateway")
        }
        "down" => error(StatusCode::BAD_GATEWAY, "NETWORK_ERROR", "ネットワークエラーが発生しました"),
        "short" => error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "検索キーワードは2文字以上で入力してください",
        ),
        "limited" => error(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMIT_EXCEEDED",
            "検索回数の上限に達しました。しばらく経ってから再度お試しください。",
        ),
        _ => Json(search_result(&query, page)).into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": { "status": "ok", "timestamp": 1, "version": "1.0.0", "uptime": 4200 },
        "meta": { "timestamp": 1 }
    }))
}

async fn api() -> (String, Hits) {
    let hits = Hits::default();
    let router = Router::new()
        .route("/api/search/{source}", get(search))
        .route("/api/health", get(health))
        .with_state(hits.clone());

    (format!("{}/api", spawn(router).await), hits)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (base, hits) = api().await;
    let client = ApiClient::new(base).with_retry(fast_retry());

    let result = client
        .search_images(ImageSource::Unsplash, &SearchParams::new("flaky"))
        .await
        .unwrap();

    assert_eq!(result.images.len(), 1);
    assert_eq!(hits.count(), 3);
}

#[tokio::test]
async fn gives_up_after_three_attempts() {
    let (base, hits) = api().await;
    let client = ApiClient::new(base).with_retry(fast_retry());

    let err = client
        .search_images(ImageSource::Unsplash, &SearchParams::new("down"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { code: ErrorCode::NetworkError, status: 502, .. }));
    assert_eq!(hits.count(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (base, hits) = api().await;
    let client = ApiClient::new(base).with_retry(fast_retry());

    let err = client
        .search_images(ImageSource::Unsplash, &SearchParams::new("short"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "検索キーワードは2文字以上で入力してください");
    assert_eq!(hits.count(), 1);

    let err = client
        .search_images(ImageSource::Unsplash, &SearchParams::new("limited"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { code: ErrorCode::RateLimitExceeded, .. }));
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn unreachable_server_is_retried_then_reported() {
    let client = ApiClient::new("http://127.0.0.1:1/api").with_retry(fast_retry());

    let err = client.check_health().await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
}

#[tokio::test]
async fn health_is_unwrapped() {
    let (base, _) = api().await;

    let health = ApiClient::new(base).check_health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.uptime, 4200);
}

#[tokio::test]
async fn identical_searches_are_deduplicated() {
    let (base, hits) = api().await;
    let dir = tempfile::tempdir().unwrap();
    let searcher = Searcher::new(ApiClient::new(base), Some(Cache::new(dir.path())));

    let params = SearchParams::new("cat");
    let first = searcher.search(ImageSource::Unsplash, &params).await.unwrap().unwrap();
    let second = searcher.search(ImageSource::Unsplash, &params).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(hits.count(), 1);

    let next_page = SearchParams {
        page: Some(2),
        ..params
    };
    let third = searcher.search(ImageSource::Unsplash, &next_page).await.unwrap().unwrap();
    assert_eq!(third.page, 2);
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn failed_searches_are_not_cached() {
    let (base, hits) = api().await;
    let dir = tempfile::tempdir().unwrap();
    let searcher = Searcher::new(
        ApiClient::new(base).with_retry(fast_retry()),
        Some(Cache::new(dir.path())),
    );

    let params = SearchParams::new("short");
    assert!(searcher.search(ImageSource::Pexels, &params).await.is_err());
    assert!(searcher.search(ImageSource::Pexels, &params).await.is_err());
    assert_eq!(hits.count(), 2);
}

fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([20, 40, 60, 255]));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn session_renders_then_exports() {
    let Some(font) = find_system_font() else {
        eprintln!("no system font available, skipping rendering test");
        return;
    };
    let renderer = Renderer::load(Some(&font)).unwrap();

    let images = spawn(Router::new().route(
        "/photo.png",
        get(|| async { ([(header::CONTENT_TYPE, "image/png")], solid_png(1000, 500)) }),
    ))
    .await;
    let url = format!("{images}/photo.png");

    let http = reqwest::Client::new();
    let mut session = Session::new(MemoryClipboard::default());

    let state = session
        .generate(&renderer, &http, &url, LgtmOptions::default(), HostPolicy::AllowPrivate)
        .await;
    assert_eq!(state, &SessionState::Ready);

    let processed = session.processed().unwrap().clone();
    assert_eq!((processed.width, processed.height), (800, 400));

    session.copy_markdown().unwrap();
    assert_eq!(
        session.clipboard().text.as_deref(),
        Some(format!("![LGTM]({})", processed.data_url).as_str())
    );

    let dir = tempfile::tempdir().unwrap();
    let path = session.download(dir.path(), None).unwrap();
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (800, 400));

    session.close();
    assert_eq!(session.state(), &SessionState::Idle);
}

#[tokio::test]
async fn session_reports_load_failures() {
    let Some(font) = find_system_font() else { return };
    let renderer = Renderer::load(Some(&font)).unwrap();
    let images = spawn(Router::new()).await;

    let http = reqwest::Client::new();
    let mut session = Session::new(MemoryClipboard::default());
    let url = format!("{images}/missing.png");

    let state = session
        .generate(&renderer, &http, &url, LgtmOptions::default(), HostPolicy::AllowPrivate)
        .await
        .clone();

    assert_eq!(
        state,
        SessionState::Error(format!("Failed to load image from URL: {url}"))
    );
    assert!(session.processed().is_none());

    let toasts = session.toasts.drain();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, GENERATION_FAILED);
    assert_eq!(toasts[0].kind, ToastKind::Error);
}
