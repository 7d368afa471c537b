//! Clients exercised against throwaway local axum servers.

use std::time::Duration;

use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};

use shopmate_core::config::{BackendConfig, FetchConfig, SearchConfig};
use shopmate_providers::{
    CompletionRequest, ContentFetcher, GenerationBackend, HttpContentFetcher,
    OpenAiCompatibleClient, ProviderError, SerperClient, ShoppingSearch, WebSearch,
};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn backend_config(base_url: &str) -> BackendConfig {
    BackendConfig {
        label: "Local".to_string(),
        base_url: base_url.to_string(),
        model: "local-model".to_string(),
        api_key_env: "UNUSED".to_string(),
    }
}

// ---- Generation ----

#[tokio::test]
async fn test_completion_returns_first_choice_content() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let reply = format!(
                "model={} auth={} temp={} first={}",
                body["model"].as_str().unwrap_or(""),
                auth,
                body["temperature"],
                body["messages"][0]["role"].as_str().unwrap_or("")
            );
            Json(json!({ "choices": [{ "message": { "role": "assistant", "content": reply } }] }))
        }),
    );
    let base = serve(router).await;

    let client = OpenAiCompatibleClient::new(&backend_config(&format!("{}/v1", base)), "sk-test").unwrap();
    let reply = client
        .complete(&CompletionRequest::new("system", "hello").with_temperature(0.5))
        .await
        .unwrap();

    assert_eq!(reply, "model=local-model auth=Bearer sk-test temp=0.5 first=system");
}

#[tokio::test]
async fn test_completion_non_success_status_is_error() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid key") }),
    );
    let base = serve(router).await;

    let client = OpenAiCompatibleClient::new(&backend_config(&base), "bad").unwrap();
    let err = client
        .complete(&CompletionRequest::new("s", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status(401, ref body) if body == "invalid key"));
}

#[tokio::test]
async fn test_completion_without_choices_is_parse_error() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({ "choices": [] })) }),
    );
    let base = serve(router).await;

    let client = OpenAiCompatibleClient::new(&backend_config(&base), "k").unwrap();
    let err = client
        .complete(&CompletionRequest::new("s", "u"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Parse(_)));
}

// ---- Search ----

#[tokio::test]
async fn test_serper_shopping_and_organic() {
    let router = Router::new()
        .route(
            "/shopping",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                Json(json!({
                    "shopping": [
                        { "title": format!("{} via {}", body["q"].as_str().unwrap_or(""), key),
                          "link": "https://shop.example/1", "price": "$90.00",
                          "imageUrl": "https://img.example/1.png" }
                    ]
                }))
            }),
        )
        .route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                let num = body["num"].as_u64().unwrap_or(0);
                let organic: Vec<Value> = (0..num)
                    .map(|i| json!({ "title": format!("r{}", i), "link": format!("https://r.example/{}", i) }))
                    .collect();
                Json(json!({ "organic": organic }))
            }),
        );
    let base = serve(router).await;

    let config = SearchConfig {
        base_url: base,
        ..SearchConfig::default()
    };
    let client = SerperClient::new(&config, "serper-key").unwrap();

    let shopping = client.shopping("trail shoes").await.unwrap();
    assert_eq!(shopping.len(), 1);
    assert_eq!(shopping[0].title, "trail shoes via serper-key");
    assert_eq!(shopping[0].image_url, "https://img.example/1.png");

    let organic = client.organic("trail shoes expert review").await.unwrap();
    assert_eq!(organic.len(), 3);
    assert_eq!(organic[2].link, "https://r.example/2");
    assert_eq!(organic[0].snippet, "");
}

// ---- Content fetch ----

fn fetch_config() -> FetchConfig {
    FetchConfig {
        request_timeout_secs: 1,
        overall_timeout_secs: 2,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_returns_visible_text_and_sends_user_agent() {
    let router = Router::new().route(
        "/review",
        get(|headers: HeaderMap| async move {
            let ua = headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let browser = if ua.starts_with("Mozilla/5.0") { "browser" } else { "bot" };
            Html(format!(
                "<html><head><script>x()</script></head><body><p>Solid shoe.</p><p>{}</p></body></html>",
                browser
            ))
        }),
    );
    let base = serve(router).await;

    let fetcher = HttpContentFetcher::new(&fetch_config()).unwrap();
    let text = fetcher.fetch_text(&format!("{}/review", base)).await;
    assert_eq!(text, "Solid shoe. browser");
}

#[tokio::test]
async fn test_fetch_failure_returns_empty_twice() {
    let router = Router::new().route(
        "/gone",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response() }),
    );
    let base = serve(router).await;

    let fetcher = HttpContentFetcher::new(&fetch_config()).unwrap();
    let url = format!("{}/gone", base);
    assert_eq!(fetcher.fetch_text(&url).await, "");
    assert_eq!(fetcher.fetch_text(&url).await, "");
}

#[tokio::test]
async fn test_fetch_unreachable_host_returns_empty() {
    let fetcher = HttpContentFetcher::new(&fetch_config()).unwrap();
    assert_eq!(fetcher.fetch_text("http://127.0.0.1:1/nothing").await, "");
    assert_eq!(fetcher.fetch_text("not a url").await, "");
}

#[tokio::test]
async fn test_fetch_slow_page_times_out_to_empty() {
    let router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Html("<p>too late</p>")
        }),
    );
    let base = serve(router).await;

    let fetcher = HttpContentFetcher::new(&fetch_config()).unwrap();
    assert_eq!(fetcher.fetch_text(&format!("{}/slow", base)).await, "");
}
