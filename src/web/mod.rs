//! Web front end: generate words, list and view what was generated.

use std::num::NonZeroU16;
use std::path::PathBuf;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::{error, info};

use crate::outputs::OutputLayout;

mod prelude;
mod views;

use views::{
    generate_handler, outputs_handler, root_handler, view_handler, view_image_handler,
};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    layout: OutputLayout,
    character_dir: PathBuf,
    openai_base_url: String,
    http: reqwest::Client,
}

impl AppState {
    fn new(output_dir: PathBuf, character_dir: PathBuf, openai_base_url: &str) -> Self {
        Self {
            layout: OutputLayout::new(output_dir),
            character_dir,
            openai_base_url: openai_base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(root_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .route("/outputs", axum::routing::get(outputs_handler))
        .route("/view/{filename}", axum::routing::get(view_handler))
        .route(
            "/view/images/{filename}",
            axum::routing::get(view_image_handler),
        )
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Serves the web front end until Ctrl-C.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    output_dir: PathBuf,
    character_dir: PathBuf,
    openai_base_url: &str,
) -> Result<(), anyhow::Error> {
    let state = AppState::new(output_dir, character_dir, openai_base_url);
    state.layout.ensure_dirs().await?;
    let app = create_router().with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup_state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(
            dir.path().join("output"),
            dir.path().join("image"),
            "http://127.0.0.1:9/v1/",
        );
        (dir, state)
    }

    async fn read_body(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post_form(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request")
    }

    fn post_multipart(fields: &[(&str, &str)]) -> Request<Body> {
        const BOUNDARY: &str = "word-image-maker-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method("POST")
            .uri("/generate")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_str(&read_body(response).await).expect("json")
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let (_dir, state) = setup_state();
        assert_eq!(state.openai_base_url, "http://127.0.0.1:9/v1");
    }

    #[tokio::test]
    async fn homepage_lists_nothing_yet() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);

        let response = app.oneshot(get("/")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("Word Image Maker"));
        assert!(body.contains("Nothing generated yet."));
    }

    #[tokio::test]
    async fn outputs_lists_viewers_and_homepage_links_them() {
        let (_dir, state) = setup_state();
        let output_dir = state.layout.output_dir().to_path_buf();
        std::fs::create_dir_all(&output_dir).expect("mkdir");
        std::fs::write(output_dir.join("beg_viewer.html"), "<html>beg</html>").expect("write");
        std::fs::write(output_dir.join("notes.txt"), "ignored").expect("write");
        let app = create_router().with_state(state);

        let response = app.clone().oneshot(get("/outputs")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&read_body(response).await).expect("json");
        let files = body["output_files"].as_array().expect("array");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["word"], "beg");
        assert_eq!(files[0]["url"], "/view/beg_viewer.html");

        let body = read_body(app.oneshot(get("/")).await.expect("response")).await;
        assert!(body.contains(r#"href="/view/beg_viewer.html""#));
    }

    #[tokio::test]
    async fn view_serves_generated_files() {
        let (_dir, state) = setup_state();
        let image_dir = state.layout.image_dir();
        std::fs::create_dir_all(&image_dir).expect("mkdir");
        std::fs::write(
            state.layout.output_dir().join("beg_viewer.html"),
            "<html>beg</html>",
        )
        .expect("write");
        std::fs::write(image_dir.join("beg_1.png"), b"png bytes").expect("write");
        let app = create_router().with_state(state);

        let response = app
            .clone()
            .oneshot(get("/view/beg_viewer.html"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, "<html>beg</html>");

        let response = app
            .oneshot(get("/view/images/beg_1.png"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content type"),
            "image/png"
        );
    }

    #[tokio::test]
    async fn missing_files_are_plain_404s() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);

        let response = app
            .clone()
            .oneshot(get("/view/nope_viewer.html"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_body(response).await, "File not found");

        let response = app
            .clone()
            .oneshot(get("/view/images/nope.png"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_body(response).await, "Image not found");

        let response = app
            .oneshot(get("/view/..%2F..%2Fetc%2Fpasswd"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_requires_api_key_and_words() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);

        let response = app
            .clone()
            .oneshot(post_form("words=beg"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&read_body(response).await).expect("json");
        assert_eq!(body["error"], "API Key is required");

        let response = app
            .clone()
            .oneshot(post_form("api_key=sk-test&words=%20%0A"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&read_body(response).await).expect("json");
        assert_eq!(body["error"], "Words are required");

        let response = app
            .oneshot(post_form("api_key=sk-test&words=beg&quality=ultra"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn styles_are_served_as_css() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);
        let response = app
            .oneshot(get("/static/styles.css"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).expect("content type"),
            "text/css"
        );
    }

    #[tokio::test]
    async fn generate_accepts_multipart_forms() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);

        let response = app
            .clone()
            .oneshot(post_multipart(&[("api_key", ""), ("words", "beg")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "API Key is required");

        let response = app
            .clone()
            .oneshot(post_multipart(&[("api_key", "sk-test"), ("words", "  ")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Words are required");

        let response = app
            .oneshot(post_multipart(&[
                ("api_key", "sk-test"),
                ("words", "beg"),
                ("quality", "ultra"),
            ]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unreadable_bodies_are_json_bad_requests() {
        let (_dir, state) = setup_state();
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("api_key=sk-test&words=beg"))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn failed_words_still_return_results_when_listing_fails() {
        let (_dir, state) = setup_state();
        // a plain file where the output directory should be
        std::fs::write(state.layout.output_dir(), "not a dir").expect("write");
        let app = create_router().with_state(state);

        let response = app
            .oneshot(post_multipart(&[
                ("api_key", "sk-test"),
                ("words", "beg#to ask urgently\nhello"),
                ("quality", "low"),
            ]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["total_cost"], 0.0);
        assert_eq!(body["output_files"], serde_json::json!([]));
        let results = body["results"].as_array().expect("results");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["word"], "beg");
        assert_eq!(results[0]["context"], "to ask urgently");
        assert_eq!(results[0]["status"], "error");
        assert_eq!(results[0]["error_kind"], "file_io");
        assert_eq!(results[1]["status"], "error");
    }
}
