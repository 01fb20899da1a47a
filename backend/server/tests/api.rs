use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use server::{
    app,
    config::{AppEnv, Config},
    state::State,
};
use tokio::net::TcpListener;

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

/// Shared behavior for every mocked provider, keyed off the search term.
fn scenario(term: &str) -> Option<Response> {
    match term {
        "ratelimited" => Some(StatusCode::TOO_MANY_REQUESTS.into_response()),
        "broken" => Some(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        "garbled" => Some("not json".into_response()),
        _ => None,
    }
}

fn unsplash_photo(id: &str) -> Value {
    json!({
        "id": id,
        "urls": {
            "regular": format!("https://images.unsplash.com/{id}?w=1080"),
            "small": format!("https://images.unsplash.com/{id}?w=400")
        },
        "width": 4000,
        "height": 3000,
        "user": { "name": "Jane", "links": { "html": "https://unsplash.com/@jane" } },
        "links": { "html": format!("https://unsplash.com/photos/{id}") },
        "alt_description": "a cat on a sofa"
    })
}

async fn unsplash(Query(params): Query<HashMap<String, String>>) -> Response {
    let term = params.get("query").map(String::as_str).unwrap_or_default();
    if let Some(response) = scenario(term) {
        return response;
    }

    let results: Vec<Value> = match term {
        "nothing" => vec![],
        _ => vec![unsplash_photo("a1"), unsplash_photo("b2")],
    };

    let total_pages = if results.is_empty() { 0 } else { 60 };

    Json(json!({
        "total": results.len() * 600,
        "total_pages": total_pages,
        "results": results
    }))
    .into_response()
}

async fn pexels(Query(params): Query<HashMap<String, String>>) -> Response {
    let term = params.get("query").map(String::as_str).unwrap_or_default();
    if let Some(response) = scenario(term) {
        return response;
    }

    Json(json!({
        "total_results": 45,
        "photos": [{
            "id": 1,
            "src": { "large": "https://images.pexels.com/1-large", "medium": "https://images.pexels.com/1-medium" },
            "width": 1200,
            "height": 800,
            "photographer": "Kim",
            "photographer_url": "https://www.pexels.com/@kim",
            "url": "https://www.pexels.com/photo/1",
            "alt": ""
        }]
    }))
    .into_response()
}

async fn pixabay(Query(params): Query<HashMap<String, String>>) -> Response {
    let term = params.get("q").map(String::as_str).unwrap_or_default();
    if let Some(response) = scenario(term) {
        return response;
    }

    // Echo the forwarded filter back through the tags.
    let image_type = params.get("image_type").cloned().unwrap_or_else(|| "none".into());

    Json(json!({
        "total": 3,
        "totalHits": 3,
        "hits": [{
            "id": 9,
            "pageURL": "https://pixabay.com/photos/9",
            "largeImageURL": "https://pixabay.com/get/9-large.jpg",
            "webformatURL": "https://pixabay.com/get/9-web.jpg",
            "imageWidth": 640,
            "imageHeight": 480,
            "user": "lee",
            "user_id": 5,
            "tags": format!("cat, {image_type}")
        }]
    }))
    .into_response()
}

async fn providers() -> String {
    spawn(
        Router::new()
            .route("/unsplash/search/photos", get(unsplash))
            .route("/pexels/search", get(pexels))
            .route("/pixabay/", get(pixabay)),
    )
    .await
}

async fn server_with(configure: impl FnOnce(&mut Config)) -> String {
    let upstream = providers().await;

    let mut config = Config::default();
    config.unsplash.api_key = Some("unsplash-key".into());
    config.unsplash.base_url = format!("{upstream}/unsplash");
    config.pexels.api_key = Some("pexels-key".into());
    config.pexels.base_url = format!("{upstream}/pexels");
    config.pixabay.api_key = Some("pixabay-key".into());
    config.pixabay.base_url = format!("{upstream}/pixabay");
    configure(&mut config);

    let state = State::new(config).unwrap();
    spawn(app(state)).await
}

async fn server() -> String {
    server_with(|_| {}).await
}

async fn get_json(url: &str) -> (StatusCode, reqwest::header::HeaderMap, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    let headers = response.headers().clone();
    let body = response.json().await.unwrap();
    (status, headers, body)
}

async fn get_html(url: &str) -> String {
    reqwest::get(url).await.unwrap().text().await.unwrap()
}

#[tokio::test]
async fn unsplash_search_is_normalized() {
    let base = server().await;

    let (status, headers, body) =
        get_json(&format!("{base}/api/search/unsplash?query=cat&page=1&perPage=20")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["query"], "cat");
    assert_eq!(body["data"]["source"], "unsplash");
    assert_eq!(body["data"]["totalPages"], 60);
    assert_eq!(body["data"]["perPage"], 20);

    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["id"], "unsplash_a1");
    assert_eq!(images[0]["thumbnailUrl"], "https://images.unsplash.com/a1?w=400");
    assert_eq!(images[0]["alt"], "a cat on a sofa");

    assert_eq!(headers["x-ratelimit-limit"], "50");
    assert_eq!(headers["x-ratelimit-remaining"], "49");
    assert!(headers.contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn pexels_pages_are_derived_from_total() {
    let base = server().await;

    let (status, _, body) = get_json(&format!("{base}/api/search/pexels?query=dog&perPage=10")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalResults"], 45);
    assert_eq!(body["data"]["totalPages"], 5);
    assert!(body["data"]["images"][0].get("alt").is_none());
}

#[tokio::test]
async fn pixabay_forwards_image_type() {
    let base = server().await;

    let (_, _, body) = get_json(&format!("{base}/api/search/pixabay?query=cat&imageType=vector")).await;
    assert_eq!(body["data"]["images"][0]["tags"], json!(["cat", "vector"]));

    let (_, _, body) = get_json(&format!("{base}/api/search/pixabay?query=cat")).await;
    assert_eq!(body["data"]["images"][0]["tags"], json!(["cat", "none"]));

    let (status, _, body) =
        get_json(&format!("{base}/api/search/pixabay?query=cat&imageType=gif")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn query_length_is_validated_before_quota() {
    let base = server().await;

    let (status, _, body) = get_json(&format!("{base}/api/search/unsplash?query=a")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "検索キーワードは2文字以上で入力してください");

    let long = "a".repeat(101);
    let (status, _, body) = get_json(&format!("{base}/api/search/unsplash?query={long}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _, _) = get_json(&format!("{base}/api/search/unsplash?query=cat&page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, headers, _) = get_json(&format!("{base}/api/search/unsplash?query=cat")).await;
    assert_eq!(headers["x-ratelimit-remaining"], "49");
}

#[tokio::test]
async fn unknown_source_is_rejected() {
    let base = server().await;

    let (status, _, body) = get_json(&format!("{base}/api/search/flickr?query=cat")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SOURCE");
}

#[tokio::test]
async fn quota_exhaustion_returns_429_with_retry_after() {
    let base = server_with(|config| config.pexels.rate_limit = 2).await;
    let url = format!("{base}/api/search/pexels?query=cat");

    let (_, headers, _) = get_json(&url).await;
    assert_eq!(headers["x-ratelimit-remaining"], "1");
    let (_, headers, _) = get_json(&url).await;
    assert_eq!(headers["x-ratelimit-remaining"], "0");

    let (status, headers, body) = get_json(&url).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(
        body["error"]["message"],
        "検索回数の上限に達しました。しばらく経ってから再度お試しください。"
    );
    assert_eq!(headers["x-ratelimit-remaining"], "0");

    let retry_after: i64 = headers["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((3590..=3600).contains(&retry_after));

    // Other sources keep their own counters.
    let (status, _, _) = get_json(&format!("{base}/api/search/unsplash?query=cat")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn provider_failures_map_to_error_codes() {
    let base = server().await;

    let (status, _, body) = get_json(&format!("{base}/api/search/unsplash?query=ratelimited")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");

    let (status, _, body) = get_json(&format!("{base}/api/search/pexels?query=broken")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_API_ERROR");
    assert_eq!(body["error"]["message"], "Pexels API error: Internal Server Error");
    assert_eq!(body["error"]["details"]["upstreamStatus"], 500);

    let (status, _, body) = get_json(&format!("{base}/api/search/pixabay?query=garbled")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_API_ERROR");
}

#[tokio::test]
async fn missing_api_key_is_a_server_error() {
    let base = server_with(|config| config.unsplash.api_key = None).await;

    let (status, _, body) = get_json(&format!("{base}/api/search/unsplash?query=cat")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
    assert_eq!(body["error"]["message"], "Unsplash API key is not configured");
}

#[tokio::test]
async fn unreachable_provider_is_a_network_error() {
    let base = server_with(|config| config.pexels.base_url = "http://127.0.0.1:1".into()).await;

    let (status, _, body) = get_json(&format!("{base}/api/search/pexels?query=cat")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "NETWORK_ERROR");
}

#[tokio::test]
async fn health_reports_version_and_disables_caching() {
    let base = server().await;

    let (status, headers, body) = get_json(&format!("{base}/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["data"]["uptime"].as_u64().is_some());
    assert!(body["data"]["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
}

#[tokio::test]
async fn lgtm_requires_an_image_url() {
    let base = server().await;

    let (status, _, body) = get_json(&format!("{base}/api/lgtm")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_QUERY");
}

#[tokio::test]
async fn production_hides_error_details() {
    let base = server_with(|config| config.app_env = AppEnv::Production).await;

    let (status, _, body) = get_json(&format!("{base}/api/search/pexels?query=broken")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_API_ERROR");
    assert_eq!(body["error"]["message"], "Pexels API error: Internal Server Error");
    assert!(body["error"].get("details").is_none());
}

#[tokio::test]
async fn lgtm_rejects_oversized_font() {
    let base = server().await;

    let (status, _, body) = get_json(&format!(
        "{base}/api/lgtm?url=https%3A%2F%2Fimages.example.com%2Fa.png&fontSize=200000"
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn lgtm_refuses_mapped_loopback() {
    let base = server().await;

    let (status, _, body) = get_json(&format!(
        "{base}/api/lgtm?url=http%3A%2F%2F%5B%3A%3Affff%3A127.0.0.1%5D%3A1%2Fa.png"
    ))
    .await;

    if status == StatusCode::SERVICE_UNAVAILABLE {
        eprintln!("no system font available, skipping");
        return;
    }
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn page_prompts_for_short_queries() {
    let base = server().await;

    let html = get_html(&format!("{base}/search?query=a")).await;

    assert!(html.contains("検索キーワードを入力してください"));
    assert!(html.contains("2文字以上で検索できます"));
    assert!(!html.contains("role=\"list\""));
}

#[tokio::test]
async fn page_renders_one_list_item_per_image() {
    let base = server().await;

    let html = get_html(&format!("{base}/search?query=cat&source=unsplash&page=1")).await;

    assert!(html.contains("role=\"list\""));
    assert_eq!(html.matches("role=\"listitem\"").count(), 2);
    assert!(html.contains("1,200 件の検索結果 - ページ 1 / 60"));
    assert!(html.contains("/api/lgtm?url=https%3A%2F%2Fimages.unsplash.com%2Fa1%3Fw%3D1080"));
    assert!(html.contains("aria-current=\"page\">1<"));
}

#[tokio::test]
async fn page_shows_empty_state() {
    let base = server().await;

    let html = get_html(&format!("{base}/search?query=nothing")).await;

    assert!(html.contains("画像が見つかりませんでした"));
    assert!(html.contains("別のキーワードで検索してみてください"));
    assert_eq!(html.matches("role=\"listitem\"").count(), 0);
}

#[tokio::test]
async fn page_shows_rate_limit_message() {
    for source in ["unsplash", "pexels", "pixabay"] {
        let base = server().await;

        let html = get_html(&format!("{base}/search?query=ratelimited&source={source}")).await;

        assert!(html.contains("エラーが発生しました"), "{source}");
        assert!(
            html.contains("検索回数の上限に達しました。しばらく経ってから再度お試しください。"),
            "{source}"
        );
    }
}
