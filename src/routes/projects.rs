//! # 프로젝트 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET   /api/v1/projects`                        → 내 프로젝트 목록
//! - `POST  /api/v1/projects`                        → 새 프로젝트 생성
//! - `GET   /api/v1/projects/{project_id}`           → 단일 프로젝트 조회
//! - `PATCH /api/v1/projects/{project_id}/settings`  → 설정 병합
//!
//! 다른 사용자의 프로젝트는 존재하더라도 404로 응답합니다.

use crate::{db, error::AppError, middleware::AuthUser, models::*, routes::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let projects = db::list_projects(&state.pool, &user.user_id).await?;
    Ok(Json(json!({ "projects": projects })))
}

pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    req.validate()?;

    let project = db::create_project(&state.pool, &user.user_id, &req).await?;
    tracing::info!("Created project {} for user {}", project.id, user.user_id);
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let project = db::get_project(&state.pool, &project_id, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}

/// 본문의 키만 덮어쓰고 나머지 설정은 유지합니다.
pub async fn update_project_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Json(patch): Json<Settings>,
) -> Result<Json<Project>, AppError> {
    let project = db::update_project_settings(&state.pool, &project_id, &user.user_id, &patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(project))
}
