pub mod health;
pub mod index;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as job_handlers;
use crate::portfolio::handlers as portfolio_handlers;
use crate::resume::handlers as resume_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        .route("/api/model", get(health::model_handler))
        // Upload → generate → retrieve
        .route(
            "/upload",
            post(resume_handlers::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/generate", post(portfolio_handlers::handle_generate))
        .route("/preview/:job_id", get(portfolio_handlers::handle_preview))
        .route("/view/:job_id", get(portfolio_handlers::handle_view))
        .route("/download/:job_id", get(portfolio_handlers::handle_download))
        // Jobs
        .route("/job/:job_id/status", get(job_handlers::handle_job_status))
        .route("/cleanup", post(job_handlers::handle_cleanup))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::jobs::{InMemoryJobStore, JobStore};
    use crate::llm_client::testing::FakeProvider;
    use crate::llm_client::{Provider, ProviderGateway};
    use crate::resume::extractor::write_test_pdf;

    const BOUNDARY: &str = "portfoliogen-test-boundary";

    const AI_ANSWER: &str = "Here is your portfolio!\n===HTML===\n```html\n<section id=\"hero\"><h1>Jane Doe</h1></section>\n```\n===CSS===\n```css\n#hero { padding: 2rem; }\n```\n===JS===\n```js\nconsole.log('ready');\n```";

    struct Harness {
        app: Router,
        jobs: Arc<dyn JobStore>,
        uploads: TempDir,
        _generated: TempDir,
    }

    fn harness(providers: Vec<Arc<FakeProvider>>, max_upload_bytes: usize) -> Harness {
        let uploads = tempfile::tempdir().unwrap();
        let generated = tempfile::tempdir().unwrap();
        let mut config = Config::for_dirs(uploads.path().into(), generated.path().into());
        config.max_upload_bytes = max_upload_bytes;

        let gateway = ProviderGateway::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn Provider>)
                .collect(),
        );
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let state = AppState {
            config,
            gateway: Arc::new(gateway),
            jobs: jobs.clone(),
        };

        Harness {
            app: build_router(state),
            jobs,
            uploads,
            _generated: generated,
        }
    }

    fn working_harness() -> Harness {
        harness(
            vec![
                FakeProvider::unconfigured("gemini"),
                FakeProvider::replying("groq", AI_ANSWER),
            ],
            10 * 1024 * 1024,
        )
    }

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(filename, content)))
            .unwrap()
    }

    fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        write_test_pdf(&path, pages);
        std::fs::read(path).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, value: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    async fn upload_resume(h: &Harness) -> String {
        let pdf = pdf_bytes(&["Jane Doe", "Senior Rust Engineer"]);
        let response = send(&h.app, upload_request("Jane Doe.pdf", &pdf)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["filename"], "Jane_Doe.pdf");
        assert!(body["fileSize"].as_str().unwrap().ends_with(" MB"));
        body["job_id"].as_str().unwrap().to_string()
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_end_to_end_upload_generate_retrieve() {
        let h = working_harness();
        let job_id = upload_resume(&h).await;

        // Status before generation
        let status = body_json(send(&h.app, get(&format!("/job/{job_id}/status"))).await).await;
        assert_eq!(status["status"], "uploaded");
        assert!(status["source_size"].as_u64().unwrap() > 0);

        // Generate
        let response = send(&h.app, post_json("/generate", json!({ "job_id": job_id }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let generated = body_json(response).await;
        assert_eq!(generated["preview_url"], format!("/preview/{job_id}"));
        assert_eq!(generated["view_url"], format!("/view/{job_id}"));
        assert_eq!(generated["download_url"], format!("/download/{job_id}"));

        // Status after generation
        let status = body_json(send(&h.app, get(&format!("/job/{job_id}/status"))).await).await;
        assert_eq!(status["status"], "completed");
        assert!(status["error"].is_null());
        let completed_at: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(status["completed_at"].clone()).unwrap();

        // Preview is the document verbatim
        let response = send(&h.app, get(&format!("/preview/{job_id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<body>") && html.contains("</body>"));
        assert!(html.contains("<section id=\"hero\"><h1>Jane Doe</h1></section>"));
        assert!(html.contains("#hero { padding: 2rem; }"));
        assert!(html.contains("console.log('ready');"));
        assert!(!html.contains("```"));
        assert!(html.contains(&format!(
            "Generated with PortfolioGen | {}",
            completed_at.format("%Y-%m-%d %H:%M")
        )));

        // View frames the preview
        let view = body_text(send(&h.app, get(&format!("/view/{job_id}"))).await).await;
        assert!(view.contains(&format!("src=\"/preview/{job_id}\"")));
        assert!(view.contains("Generated from: Jane_Doe.pdf"));

        // Download is an attachment
        let response = send(&h.app, get(&format!("/download/{job_id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Jane_Doe_portfolio_"));
        assert!(disposition.ends_with(".html\""));
        assert_eq!(body_text(response).await, html);

        // Diagnostics
        let model = body_json(send(&h.app, get("/api/model")).await).await;
        assert_eq!(model["services_available"]["gemini"], false);
        assert_eq!(model["services_available"]["groq"], true);

        // Cleanup keeps young jobs
        let cleanup = body_json(send(&h.app, post_json("/cleanup", json!({}))).await).await;
        assert_eq!(cleanup["evicted_jobs"], 0);
        assert_eq!(cleanup["active_jobs"], 1);
    }

    #[tokio::test]
    async fn test_generate_twice_is_conflict() {
        let h = working_harness();
        let job_id = upload_resume(&h).await;
        let first = send(&h.app, post_json("/generate", json!({ "job_id": job_id }))).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = send(&h.app, post_json("/generate", json!({ "job_id": job_id }))).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_generation_failure_marks_job_failed() {
        let h = harness(
            vec![
                FakeProvider::unconfigured("gemini"),
                FakeProvider::unconfigured("groq"),
            ],
            10 * 1024 * 1024,
        );
        let job_id = upload_resume(&h).await;

        let response = send(&h.app, post_json("/generate", json!({ "job_id": job_id }))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("All AI services unavailable"));

        let status = body_json(send(&h.app, get(&format!("/job/{job_id}/status"))).await).await;
        assert_eq!(status["status"], "failed");

        // Nothing to preview: back to the start page.
        let preview = send(&h.app, get(&format!("/preview/{job_id}"))).await;
        assert_eq!(preview.status(), StatusCode::SEE_OTHER);
        assert_eq!(preview.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let h = working_harness();

        let response = send(&h.app, upload_request("cv.docx", b"not a pdf")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Only PDF files are allowed");

        let response = send(&h.app, upload_request("", b"")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Text-less "PDF": rejected and the stored file removed.
        let response = send(&h.app, upload_request("scan.pdf", b"%PDF-1.4 garbage")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Could not extract text from PDF"));
        assert_eq!(file_count(h.uploads.path()), 0);
        assert_eq!(h.jobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let h = working_harness();
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = send(&h.app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["message"], "No file part");
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let h = harness(vec![FakeProvider::replying("gemini", AI_ANSWER)], 1024);
        let response = send(&h.app, upload_request("big.pdf", &vec![b'a'; 8 * 1024])).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_tokens() {
        let h = working_harness();

        let response = send(&h.app, post_json("/generate", json!({ "job_id": "nope" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = send(&h.app, post_json("/generate", json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let missing = uuid::Uuid::new_v4();
        let response = send(&h.app, get(&format!("/job/{missing}/status"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        for path in ["preview", "view", "download"] {
            let response = send(&h.app, get(&format!("/{path}/{missing}"))).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        }
    }

    #[tokio::test]
    async fn test_malformed_generate_body_uses_error_envelope() {
        let h = working_harness();

        let not_json = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("job_id=123"))
            .unwrap();
        let wrong_type = post_json("/generate", json!({ "job_id": 123 }));
        let broken = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"job_id\": "))
            .unwrap();

        for request in [not_json, wrong_type, broken] {
            let response = send(&h.app, request).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
            assert_eq!(body["error"]["message"], "Invalid job ID or file not uploaded");
        }
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let h = working_harness();
        let health = body_json(send(&h.app, get("/health")).await).await;
        assert_eq!(health["status"], "ok");
        let index = body_text(send(&h.app, get("/")).await).await;
        assert!(index.contains("/upload"));
    }
}
