//! Project management endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, AppState, parse_project_id};
use crate::query::{ProjectStats, project_stats};
use crate::store::CommitFilter;
use crate::types::{NewProject, Project, ProjectUpdate, ProjectView};

/// Bytes of randomness in a generated webhook secret.
const SECRET_BYTES: usize = 32;

/// Response to a successful create. The only place the secret is ever shown.
#[derive(Debug, Serialize)]
pub struct CreatedProject {
    #[serde(flatten)]
    pub project: ProjectView,
    pub webhook_url: String,
    pub webhook_secret: String,
}

fn generate_secret() -> String {
    let bytes: [u8; SECRET_BYTES] = rand::random();
    hex::encode(bytes)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// `GET /api/projects` - active projects, newest first.
pub async fn list_projects(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ProjectView>>, ApiError> {
    let projects = app_state
        .with_store(|store| Ok(store.list_projects()?))
        .await?;
    Ok(Json(
        projects
            .iter()
            .filter(|p| p.is_active)
            .map(Project::view)
            .collect(),
    ))
}

/// `POST /api/projects`
pub async fn create_project(
    State(app_state): State<AppState>,
    Json(new): Json<NewProject>,
) -> Result<(StatusCode, Json<CreatedProject>), ApiError> {
    require_non_empty("name", &new.name)?;
    require_non_empty("repository_url", &new.repository_url)?;

    let secret = generate_secret();
    let project = Project::new(new, Some(secret.clone()));
    let project = app_state
        .with_store(move |store| Ok(store.create_project(project)?))
        .await?;

    info!(project_id = %project.id, name = %project.name, "Project created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedProject {
            webhook_url: app_state.webhook_url(&project.id),
            webhook_secret: secret,
            project: project.view(),
        }),
    ))
}

/// `GET /api/projects/{id}`
pub async fn get_project(
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ProjectView>, ApiError> {
    let id = parse_project_id(&raw_id)?;
    app_state
        .with_store(move |store| {
            store
                .get_project(&id)?
                .map(|p| Json(p.view()))
                .ok_or(ApiError::NotFound("Project"))
        })
        .await
}

/// `PUT /api/projects/{id}` - partial update. Aggregates are not writable.
pub async fn update_project(
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<ProjectView>, ApiError> {
    let id = parse_project_id(&raw_id)?;
    if let Some(name) = &update.name {
        require_non_empty("name", name)?;
    }
    if let Some(url) = &update.repository_url {
        require_non_empty("repository_url", url)?;
    }

    app_state
        .with_store(move |store| {
            store
                .update_project(&id, update)?
                .map(|p| Json(p.view()))
                .ok_or(ApiError::NotFound("Project"))
        })
        .await
}

/// `DELETE /api/projects/{id}` - soft delete.
///
/// Commits are kept and webhooks keep being accepted for the project.
pub async fn delete_project(
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_project_id(&raw_id)?;
    let deactivate = ProjectUpdate {
        is_active: Some(false),
        ..ProjectUpdate::default()
    };
    let project = app_state
        .with_store(move |store| {
            store
                .update_project(&id, deactivate)?
                .ok_or(ApiError::NotFound("Project"))
        })
        .await?;

    info!(project_id = %project.id, "Project deactivated");
    Ok(Json(json!({ "message": "Project deactivated successfully" })))
}

/// `GET /api/projects/{id}/stats`
pub async fn get_project_stats(
    State(app_state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ProjectStats>, ApiError> {
    let id = parse_project_id(&raw_id)?;
    app_state
        .with_store(move |store| {
            if store.get_project(&id)?.is_none() {
                return Err(ApiError::NotFound("Project"));
            }
            let commits = store.commits(&CommitFilter::for_project(id))?;
            Ok(Json(project_stats(&commits)))
        })
        .await
}
