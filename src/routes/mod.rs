//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 서비스 호출로 옮기는 얇은 계층입니다.
//! 검증과 비즈니스 규칙은 `services::ProgressService`가 맡고,
//! 핸들러는 경로/쿼리/본문을 꺼내고 응답 형태만 정합니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인
//! - `projects`: 프로젝트 생성/조회/설정 병합
//! - `progress`: 진행 문서와 버전 이력 API

pub mod health;
pub mod progress;
pub mod projects;

pub use health::*;
pub use progress::*;
pub use projects::*;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::SqlitePool;

use crate::db::{SqliteProjectAccess, VersionStore};
use crate::services::ProgressService;

/// 애플리케이션 공유 상태
///
/// 모든 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 모든 필드가 내부적으로 Arc를 쓰므로 clone 비용이 작습니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub progress: ProgressService<SqliteProjectAccess>,
    /// JWT 검증용 비밀키
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        let progress = ProgressService::new(
            VersionStore::new(pool.clone()),
            SqliteProjectAccess::new(pool.clone()),
        );
        Self {
            pool,
            progress,
            jwt_secret,
        }
    }
}

/// `/api/v1` 아래에 모든 API 라우트를 묶은 라우터
pub fn router(state: AppState) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{project_id}", get(get_project))
        .route("/projects/{project_id}/settings", patch(update_project_settings));

    let progress_routes = Router::new()
        .route(
            "/projects/{project_id}/progress",
            get(get_progress)
                .post(create_progress)
                .put(update_progress)
                .delete(delete_progress),
        )
        .route(
            "/projects/{project_id}/progress/with-history",
            get(get_progress_with_history),
        )
        .route(
            "/projects/{project_id}/progress/history",
            get(get_progress_history),
        )
        .route(
            "/projects/{project_id}/progress/version/{version}",
            get(get_progress_version),
        )
        .route(
            "/projects/{project_id}/progress/compare/{version_a}/{version_b}",
            get(compare_versions),
        )
        .route(
            "/projects/{project_id}/progress/stats",
            get(get_progress_stats),
        )
        .route(
            "/projects/{project_id}/progress/restore/{version}",
            post(restore_version),
        )
        .route(
            "/projects/{project_id}/progress/publish",
            post(publish_progress),
        )
        .route(
            "/projects/{project_id}/progress/unpublish",
            post(unpublish_progress),
        )
        .route("/progress/search", post(search_progress));

    let api_routes = Router::new()
        .merge(project_routes)
        .merge(progress_routes)
        .route("/health", get(health_check))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
