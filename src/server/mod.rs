//! HTTP server for the commit feed.
//!
//! # Endpoints
//!
//! - `POST /webhook/{project_id}` - push notifications from the git host
//! - `GET|POST /api/projects`, `GET|PUT|DELETE /api/projects/{id}`,
//!   `GET /api/projects/{id}/stats` - project management
//! - `GET /api/commits`, `GET /api/commits/stats`, `GET /api/commits/by-date`,
//!   `POST /api/commits/{sha}/vote` - the commit feed
//! - `GET /health` - liveness
//!
//! Store calls are synchronous and may hit the disk, so handlers run them
//! through [`AppState::with_store`] on the blocking pool.

use std::sync::Arc;

use tower_http::trace::TraceLayer;

use crate::store::Store;
use crate::types::ProjectId;

pub mod commits;
pub mod error;
pub mod health;
pub mod projects;
pub mod webhook;

pub use error::ApiError;
pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state, passed to handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,

    /// Public base URL, used to build webhook URLs for new projects.
    base_url: String,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        AppState {
            inner: Arc::new(AppStateInner { store, base_url }),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The URL a git host should deliver this project's webhooks to.
    pub fn webhook_url(&self, id: &ProjectId) -> String {
        format!("{}/webhook/{}", self.inner.base_url, id)
    }

    /// Runs `f` against the store on tokio's blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn Store) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.inner.store);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }
}

/// Parses a project id from a path segment. Ids that cannot exist are 404s.
pub(crate) fn parse_project_id(raw: &str) -> Result<ProjectId, ApiError> {
    ProjectId::parse(raw).map_err(|_| ApiError::NotFound("Project"))
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook/{project_id}", post(webhook_handler))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/{id}/stats", get(projects::get_project_stats))
        .route("/api/commits", get(commits::list_commits))
        .route("/api/commits/stats", get(commits::get_commit_stats))
        .route("/api/commits/by-date", get(commits::commits_by_date))
        .route("/api/commits/{sha}/vote", post(commits::vote_commit))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::store::{CommitFilter, MemoryStore};
    use crate::test_utils::{commit_entry, push_body, sample_project, signed_header};
    use crate::types::Project;

    fn test_app() -> (axum::Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), "http://localhost:5000");
        (build_router(state), store)
    }

    fn add_project(store: &MemoryStore, name: &str, secret: Option<&str>) -> Project {
        store.create_project(sample_project(name, secret)).unwrap()
    }

    fn webhook_request(
        project_id: &str,
        event: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/webhook/{project_id}"))
            .header("content-type", "application/json");
        if let Some(event) = event {
            builder = builder.header("x-github-event", event);
        }
        if let Some(signature) = signature {
            builder = builder.header("x-hub-signature-256", signature);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    fn one_commit_push() -> Vec<u8> {
        serde_json::to_vec(&push_body(
            "refs/heads/main",
            vec![commit_entry("c1", "2024-01-01T00:00:00Z")],
        ))
        .unwrap()
    }

    // ─── Health ───

    #[tokio::test]
    async fn health_returns_200() {
        let (app, _store) = test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    // ─── Webhook ───

    #[tokio::test]
    async fn unsigned_push_is_ingested() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", None);
        let body = serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "repository": {"full_name": "octo/demo"},
            "commits": [{
                "id": "abc123",
                "message": "fix bug",
                "author": {"name": "A", "email": "a@x.com"},
                "timestamp": "2024-01-01T00:00:00Z",
                "added": ["f.txt"],
                "removed": [],
                "modified": []
            }]
        }))
        .unwrap();

        let (status, response) = send(
            &app,
            webhook_request(project.id.as_str(), Some("push"), None, &body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["message"], "Webhook processed successfully");

        let (_, page) = send(&app, get("/api/commits")).await;
        let commit = &page["commits"][0];
        assert_eq!(commit["sha"], "abc123");
        assert_eq!(commit["branch"], "main");
        assert_eq!(commit["project_name"], "demo");
        assert_eq!(commit["files_changed"][0]["filename"], "f.txt");
        assert_eq!(commit["files_changed"][0]["status"], "added");
        assert_eq!(commit["votes"], json!({"up": 0, "down": 0}));

        let (_, view) = send(&app, get(&format!("/api/projects/{}", project.id))).await;
        assert_eq!(view["total_commits"], 1);
    }

    #[tokio::test]
    async fn signed_push_with_right_secret_is_accepted() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", Some("s3cret"));
        let body = one_commit_push();
        let header = signed_header(&body, "s3cret");

        let (status, _) = send(
            &app,
            webhook_request(project.id.as_str(), Some("push"), Some(&header), &body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.commits(&CommitFilter::default()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_signature_is_401_and_stores_nothing() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", Some("s3cret"));
        let body = one_commit_push();
        let header = signed_header(&body, "guess");

        let (status, response) = send(
            &app,
            webhook_request(project.id.as_str(), Some("push"), Some(&header), &body),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["error"], "Invalid signature");
        assert!(store.commits(&CommitFilter::default()).unwrap().is_empty());
        assert_eq!(
            store.get_project(&project.id).unwrap().unwrap().total_commits,
            0
        );
    }

    #[tokio::test]
    async fn unknown_project_is_404() {
        let (app, _store) = test_app();
        let (status, response) = send(
            &app,
            webhook_request("nope", Some("push"), None, &one_commit_push()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response["error"], "Project not found");
    }

    #[tokio::test]
    async fn other_events_are_acknowledged_only() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", None);

        for event in [Some("ping"), None] {
            let (status, _) = send(
                &app,
                webhook_request(project.id.as_str(), event, None, &one_commit_push()),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        assert!(store.commits(&CommitFilter::default()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn redelivery_counts_once() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", None);
        let body = one_commit_push();

        for _ in 0..3 {
            let (status, _) = send(
                &app,
                webhook_request(project.id.as_str(), Some("push"), None, &body),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        assert_eq!(store.commits(&CommitFilter::default()).unwrap().len(), 1);
        assert_eq!(
            store.get_project(&project.id).unwrap().unwrap().total_commits,
            1
        );
    }

    // ─── Projects ───

    #[tokio::test]
    async fn create_returns_secret_once() {
        let (app, _store) = test_app();
        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/projects",
                &json!({"name": "demo", "repository_url": "https://github.com/octo/demo"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["webhook_secret"].as_str().unwrap().len(), 64);
        assert_eq!(
            created["webhook_url"],
            format!("http://localhost:5000/webhook/{id}")
        );
        assert_eq!(created["total_commits"], 0);

        let (status, view) = send(&app, get(&format!("/api/projects/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(view.get("webhook_secret").is_none());
    }

    #[tokio::test]
    async fn create_rejects_blank_and_duplicate_names() {
        let (app, _store) = test_app();
        let body = json!({"name": "demo", "repository_url": "https://x"});
        send(&app, json_request("POST", "/api/projects", &body)).await;

        let (status, response) = send(&app, json_request("POST", "/api/projects", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Project name already exists");

        let blank = json!({"name": " ", "repository_url": "https://x"});
        let (status, _) = send(&app, json_request("POST", "/api/projects", &blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_and_deactivate() {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", None);
        let uri = format!("/api/projects/{}", project.id);

        let (status, updated) = send(
            &app,
            json_request("PUT", &uri, &json!({"description": "the demo"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "the demo");
        assert_eq!(updated["name"], "demo");

        let (status, response) = send(&app, json_request("DELETE", &uri, &json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["message"], "Project deactivated successfully");

        let (_, list) = send(&app, get("/api/projects")).await;
        assert_eq!(list, json!([]));

        // Deactivated projects still accept pushes.
        let (status, _) = send(
            &app,
            webhook_request(project.id.as_str(), Some("push"), None, &one_commit_push()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_project_routes_are_404() {
        let (app, _store) = test_app();
        let (status, _) = send(&app, get("/api/projects/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get("/api/projects/ghost/stats")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            json_request("PUT", "/api/projects/ghost", &json!({"name": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ─── Commits ───

    async fn seeded() -> (axum::Router, Arc<MemoryStore>, Project) {
        let (app, store) = test_app();
        let project = add_project(&store, "demo", None);
        let body = serde_json::to_vec(&push_body(
            "refs/heads/main",
            vec![
                commit_entry("c1", "2024-01-01T00:00:00Z"),
                commit_entry("c2", "2024-01-03T00:00:00Z"),
                commit_entry("c3", "2024-01-05T00:00:00Z"),
            ],
        ))
        .unwrap();
        send(
            &app,
            webhook_request(project.id.as_str(), Some("push"), None, &body),
        )
        .await;
        (app, store, project)
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let (app, _store, project) = seeded().await;
        let (status, page) = send(
            &app,
            get(&format!("/api/commits?page=2&limit=2&project_id={}", project.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["commits"].as_array().unwrap().len(), 1);
        assert_eq!(page["commits"][0]["sha"], "c1");
        assert_eq!(
            page["pagination"],
            json!({
                "page": 2, "limit": 2, "total": 3, "total_pages": 2,
                "has_next": false, "has_prev": true
            })
        );
    }

    #[tokio::test]
    async fn by_date_filters_inclusively() {
        let (app, _store, _project) = seeded().await;
        let (status, commits) = send(
            &app,
            get("/api/commits/by-date?start_date=2024-01-01&end_date=2024-01-03"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let shas: Vec<&str> = commits
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["sha"].as_str().unwrap())
            .collect();
        assert_eq!(shas, vec!["c2", "c1"]);

        let (status, _) = send(&app, get("/api/commits/by-date?start_date=soon&end_date=later")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_endpoints() {
        let (app, _store, project) = seeded().await;

        let (status, stats) = send(&app, get("/api/commits/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_commits"], 3);
        assert_eq!(stats["unique_authors_count"], 1);
        assert_eq!(stats["days_since_first"], 4.0);
        assert_eq!(stats["commits_per_day"], 0.75);

        let (status, stats) = send(&app, get(&format!("/api/projects/{}/stats", project.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_commits"], 3);
        assert_eq!(stats["total_votes_up"], 0);
    }

    #[tokio::test]
    async fn voting() {
        let (app, _store, _project) = seeded().await;

        let (status, response) = send(
            &app,
            json_request("POST", "/api/commits/c2/vote", &json!({"type": "up"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["votes"], json!({"up": 1, "down": 0}));

        let (status, response) = send(
            &app,
            json_request("POST", "/api/commits/c2/vote", &json!({"type": "meh"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Invalid vote type");

        let (status, _) = send(
            &app,
            json_request("POST", "/api/commits/zzz/vote", &json!({"type": "down"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
