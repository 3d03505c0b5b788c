#![cfg(feature = "web")]

use inequality_dashboard::animation::AnimationLoader;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn successful_fetch_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/home.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "v": "5.7.4", "layers": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let loader = AnimationLoader::new();
    let url = format!("{}/home.json", server.uri());
    let first = loader.load(&url).await.unwrap();
    let second = loader.load(&url).await.unwrap();
    assert_eq!(first["v"], "5.7.4");
    assert_eq!(first, second);
}

#[tokio::test]
async fn failures_render_no_animation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbage.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let loader = AnimationLoader::new();
    assert!(loader.load(&format!("{}/missing.json", server.uri())).await.is_none());
    assert!(loader.load(&format!("{}/garbage.json", server.uri())).await.is_none());
    assert!(AnimationLoader::disabled().load(&server.uri()).await.is_none());
}
