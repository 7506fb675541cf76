pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/skills", get(handlers::handle_skills))
        // Stateless screening
        .route("/api/v1/screen", post(handlers::handle_screen))
        // Interactive sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(handlers::handle_set_job_description),
        )
        .route(
            "/api/v1/sessions/:id/candidates",
            post(handlers::handle_upload_candidates),
        )
        .route(
            "/api/v1/sessions/:id/screen",
            post(handlers::handle_screen_session),
        )
        .route(
            "/api/v1/sessions/:id/shortlist",
            get(handlers::handle_shortlist),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extraction::docx_fixture;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "screener-test-boundary";

    fn app() -> Router {
        build_router(AppState::new(Config::default()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (file_name, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn names(rows: &Value) -> Vec<String> {
        rows.as_array()
            .unwrap()
            .iter()
            .map(|row| row["candidate_name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), empty_request(Method::GET, "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_skills_catalog() {
        let (status, body) = send(&app(), empty_request(Method::GET, "/api/v1/skills")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shortlist_sizes"], json!([5, 10, 15, 20, 50, 100]));
        assert!(body["catalog"]["technical"]
            .as_array()
            .unwrap()
            .contains(&json!("Rust")));
    }

    #[tokio::test]
    async fn test_stateless_screen_ranks_and_shortlists() {
        let request = json_request(
            Method::POST,
            "/api/v1/screen",
            json!({
                "text": "Python SQL leadership",
                "candidates": [
                    {"display_name": "Baker", "text": "Sourdough, croissants and cakes"},
                    {"display_name": "Analyst", "text": "Python and SQL reporting, team leadership"},
                    {"text": "Jane Roe\nPython scripting"}
                ],
                "shortlist": {"top_n": 2}
            }),
        );
        let (status, body) = send(&app(), request).await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["scorer_backend"], "cosine");
        assert_eq!(names(&body["results"]), vec!["Analyst", "Jane Roe", "Baker"]);
        assert_eq!(body["results"][0]["rank"], 1);
        assert_eq!(body["results"][2]["score"], 0.0);
        assert_eq!(names(&body["shortlist"]), vec!["Analyst", "Jane Roe"]);
    }

    #[tokio::test]
    async fn test_stateless_screen_without_candidates_is_rejected() {
        let request = json_request(
            Method::POST,
            "/api/v1/screen",
            json!({"text": "python", "candidates": []}),
        );
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stateless_screen_with_empty_job_description_is_rejected() {
        let request = json_request(
            Method::POST,
            "/api/v1/screen",
            json!({"text": "the and of", "candidates": [{"text": "python"}]}),
        );
        let (status, _) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_flow() {
        let app = app();

        let (status, created) = send(&app, empty_request(Method::POST, "/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, jd) = send(
            &app,
            json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{id}/job-description"),
                json!({"skills": ["Python", "SQL", "Leadership"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jd["tokens"], json!(["python", "sql", "leadership"]));

        let bob = docx_fixture(&["Bob Jones", "Watercolour painting"]);
        let (status, uploaded) = send(
            &app,
            multipart_request(
                &format!("/api/v1/sessions/{id}/candidates"),
                &[
                    ("alice.txt", &b"Alice Smith\nPython, SQL, leadership of data teams"[..]),
                    ("bob.docx", &bob[..]),
                    ("carol.odt", &b"not supported"[..]),
                ],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{uploaded}");
        assert_eq!(uploaded["flagged"], 1);
        assert_eq!(uploaded["candidates"][0]["candidate_name"], "Alice Smith");
        assert_eq!(uploaded["candidates"][1]["candidate_name"], "Bob Jones");
        assert_eq!(
            uploaded["candidates"][2]["flag"]["kind"],
            "unsupported_format"
        );

        let (status, screened) = send(
            &app,
            empty_request(Method::POST, &format!("/api/v1/sessions/{id}/screen")),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{screened}");
        assert_eq!(
            names(&screened["results"]),
            vec!["Alice Smith", "Bob Jones", "carol.odt"]
        );
        assert_eq!(screened["flagged"][0]["display_name"], "carol.odt");

        let (status, top) = send(
            &app,
            empty_request(Method::GET, &format!("/api/v1/sessions/{id}/shortlist?top_n=5")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(top["rows"].as_array().unwrap().len(), 3);
        assert_eq!(top["total_candidates"], 3);

        let (status, above) = send(
            &app,
            empty_request(
                Method::GET,
                &format!("/api/v1/sessions/{id}/shortlist?threshold=0.01"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&above["rows"]), vec!["Alice Smith"]);
        assert_eq!(above["run_id"], top["run_id"]);

        let (status, _) = send(
            &app,
            empty_request(Method::DELETE, &format!("/api/v1/sessions/{id}")),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_shortlist_before_screening_is_unprocessable() {
        let app = app();
        let (_, created) = send(&app, empty_request(Method::POST, "/api/v1/sessions")).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            empty_request(Method::GET, &format!("/api/v1/sessions/{id}/shortlist?top_n=5")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_malformed_shortlist_query_uses_error_envelope() {
        let app = app();
        let (_, created) = send(&app, empty_request(Method::POST, "/api/v1/sessions")).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        for query in ["threshold=abc", "top_n=-1"] {
            let (status, body) = send(
                &app,
                empty_request(Method::GET, &format!("/api/v1/sessions/{id}/shortlist?{query}")),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{query}");
        }
    }

    #[tokio::test]
    async fn test_screen_session_without_job_description_is_rejected() {
        let app = app();
        let (_, created) = send(&app, empty_request(Method::POST, "/api/v1/sessions")).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            empty_request(Method::POST, &format!("/api/v1/sessions/{id}/screen")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app(), empty_request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
