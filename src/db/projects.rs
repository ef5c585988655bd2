//! # 프로젝트 쿼리 모듈
//!
//! 진행 문서의 소유권 확인에 필요한 최소한의 프로젝트 레코드를 다룹니다.
//! 프로젝트는 소프트 삭제(`is_deleted = 1`)되며, 삭제된 프로젝트는
//! 소유자에게도 보이지 않습니다.

use crate::error::AppError;
use crate::models::{default_settings, merge_settings, CreateProjectRequest, Project, ProjectRow, Settings};
use crate::services::ProjectAccess;
use sqlx::SqlitePool;

const PROJECT_COLUMNS: &str = "id, user_id, name, description, settings, created_at, updated_at";

fn into_project(row: ProjectRow) -> Result<Project, AppError> {
    Project::try_from(row)
        .map_err(|e| AppError::Internal(format!("Corrupt project settings: {}", e)))
}

/// 새 프로젝트를 생성합니다.
///
/// 요청의 settings는 기본 설정 위에 병합됩니다.
pub async fn create_project(
    pool: &SqlitePool,
    user_id: &str,
    req: &CreateProjectRequest,
) -> Result<Project, AppError> {
    let id = uuid::Uuid::now_v7().to_string();
    let settings = match &req.settings {
        Some(patch) => merge_settings(&default_settings(), patch),
        None => default_settings(),
    };
    let settings_json = serde_json::to_string(&settings)
        .map_err(|e| AppError::Internal(format!("Failed to encode settings: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO projects (id, user_id, name, description, settings)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&settings_json)
    .execute(pool)
    .await?;

    get_project(pool, &id, user_id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created project".to_string()))
}

/// 사용자가 소유한, 삭제되지 않은 프로젝트 하나를 조회합니다.
pub async fn get_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Project>, AppError> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND user_id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(into_project).transpose()
}

/// 사용자의 프로젝트 목록 (최근 수정순)
pub async fn list_projects(pool: &SqlitePool, user_id: &str) -> Result<Vec<Project>, AppError> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        r#"
        SELECT {PROJECT_COLUMNS}
        FROM projects
        WHERE user_id = ? AND is_deleted = 0
        ORDER BY updated_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(into_project).collect()
}

/// 프로젝트 설정에 `patch`를 병합해 저장합니다.
///
/// 읽기와 쓰기를 한 트랜잭션으로 묶어 동시 병합이 서로를 덮어쓰지 않게 합니다.
pub async fn update_project_settings(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    patch: &Settings,
) -> Result<Option<Project>, AppError> {
    let mut tx = pool.begin().await?;

    let current: Option<(String,)> = sqlx::query_as(
        "SELECT settings FROM projects WHERE id = ? AND user_id = ? AND is_deleted = 0",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((raw,)) = current else {
        return Ok(None);
    };

    let current: Settings = serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Corrupt project settings: {}", e)))?;
    let merged = merge_settings(&current, patch);
    let merged_json = serde_json::to_string(&merged)
        .map_err(|e| AppError::Internal(format!("Failed to encode settings: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE projects
        SET settings = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ?
        "#,
    )
    .bind(&merged_json)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_project(pool, id, user_id).await
}

/// `projects` 테이블 기반의 소유권 확인
///
/// 프로젝트가 존재하고, 삭제되지 않았고, 요청자가 소유자일 때만 접근을 허용합니다.
#[derive(Debug, Clone)]
pub struct SqliteProjectAccess {
    pool: SqlitePool,
}

impl SqliteProjectAccess {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ProjectAccess for SqliteProjectAccess {
    async fn can_access(&self, project_id: &str, user_id: &str) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM projects WHERE id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    async fn accessible_projects(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM projects WHERE user_id = ? AND is_deleted = 0")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;

    fn request(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description: None,
            settings: None,
        }
    }

    #[tokio::test]
    async fn access_is_limited_to_owner_and_live_projects() {
        let pool = test_pool().await;
        let access = SqliteProjectAccess::new(pool.clone());
        let mine = create_project(&pool, "alice", &request("mine")).await.unwrap();
        let gone = create_project(&pool, "alice", &request("gone")).await.unwrap();

        sqlx::query("UPDATE projects SET is_deleted = 1 WHERE id = ?")
            .bind(&gone.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(access.can_access(&mine.id, "alice").await.unwrap());
        assert!(!access.can_access(&mine.id, "bob").await.unwrap());
        assert!(!access.can_access(&gone.id, "alice").await.unwrap());
        assert!(!access.can_access("missing", "alice").await.unwrap());

        assert_eq!(access.accessible_projects("alice").await.unwrap(), vec![mine.id]);
        assert!(access.accessible_projects("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_patch_is_merged_and_persisted() {
        let pool = test_pool().await;
        let project = create_project(&pool, "alice", &request("p")).await.unwrap();
        assert_eq!(project.settings["default_priority"], json!("medium"));

        let patch = json!({ "default_priority": "high" }).as_object().cloned().unwrap();
        let updated = update_project_settings(&pool, &project.id, "alice", &patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.settings["default_priority"], json!("high"));
        assert_eq!(updated.settings["auto_generate_tasks"], json!(true));

        assert!(update_project_settings(&pool, &project.id, "bob", &patch)
            .await
            .unwrap()
            .is_none());
    }
}
