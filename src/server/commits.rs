//! Commit read and vote endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiError, AppState};
use crate::query::{
    CommitStats, CommitView, DateRangeParams, PageParams, Pagination, commit_stats, paginate,
    with_project_names,
};
use crate::store::CommitFilter;
use crate::types::{ProjectId, Sha, VoteKind};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectParam {
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ByDateParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct CommitPage {
    pub commits: Vec<CommitView>,
    pub pagination: Pagination,
}

/// An absent or blank `project_id` means all projects.
fn project_filter(raw: Option<&str>) -> Result<Option<ProjectId>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => ProjectId::parse(s)
            .map(Some)
            .map_err(|e| ApiError::BadRequest(e.to_string())),
    }
}

fn vote_kind(raw: &str) -> Result<VoteKind, ApiError> {
    match raw {
        "up" => Ok(VoteKind::Up),
        "down" => Ok(VoteKind::Down),
        _ => Err(ApiError::BadRequest("Invalid vote type".to_string())),
    }
}

/// `GET /api/commits` - newest first, paginated.
pub async fn list_commits(
    State(app_state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CommitPage>, ApiError> {
    let request = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve();
    let filter = CommitFilter {
        project_id: project_filter(params.project_id.as_deref())?,
        range: None,
    };

    app_state
        .with_store(move |store| {
            let commits = store.commits(&filter)?;
            let (page, pagination) = paginate(commits, request);
            let projects = store.list_projects()?;
            Ok(Json(CommitPage {
                commits: with_project_names(page, &projects),
                pagination,
            }))
        })
        .await
}

/// `GET /api/commits/stats`
pub async fn get_commit_stats(
    State(app_state): State<AppState>,
    Query(params): Query<ProjectParam>,
) -> Result<Json<CommitStats>, ApiError> {
    let filter = CommitFilter {
        project_id: project_filter(params.project_id.as_deref())?,
        range: None,
    };
    app_state
        .with_store(move |store| Ok(Json(commit_stats(&store.commits(&filter)?))))
        .await
}

/// `GET /api/commits/by-date` - unpaginated, newest first.
pub async fn commits_by_date(
    State(app_state): State<AppState>,
    Query(params): Query<ByDateParams>,
) -> Result<Json<Vec<CommitView>>, ApiError> {
    let range = DateRangeParams {
        start_date: params.start_date,
        end_date: params.end_date,
    }
    .resolve()?;
    let filter = CommitFilter {
        project_id: project_filter(params.project_id.as_deref())?,
        range,
    };

    app_state
        .with_store(move |store| {
            let commits = store.commits(&filter)?;
            let projects = store.list_projects()?;
            Ok(Json(with_project_names(commits, &projects)))
        })
        .await
}

/// `POST /api/commits/{sha}/vote`
pub async fn vote_commit(
    State(app_state): State<AppState>,
    Path(raw_sha): Path<String>,
    Json(vote): Json<VoteRequest>,
) -> Result<Json<Value>, ApiError> {
    let kind = vote_kind(&vote.kind)?;
    let sha = Sha::parse(raw_sha).map_err(|_| ApiError::NotFound("Commit"))?;

    let votes = app_state
        .with_store(move |store| {
            store
                .increment_vote(&sha, kind)?
                .ok_or(ApiError::NotFound("Commit"))
        })
        .await?;
    Ok(Json(json!({ "votes": votes })))
}
