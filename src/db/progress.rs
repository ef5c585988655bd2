//! # 진행 문서 버전 저장소
//!
//! `project_progress`(현재 문서)와 `progress_history`(불변 이력) 테이블을 다룹니다.
//!
//! ## 불변식
//! - 프로젝트당 문서는 하나 (`project_id` UNIQUE)
//! - 이력의 `(progress_id, version)`은 유일 (UNIQUE 제약)
//! - 문서의 `version`은 항상 최신 이력의 `version`과 같음
//!
//! 문서 변경과 이력 추가는 항상 같은 트랜잭션 안에서 일어납니다.
//! 둘 중 하나라도 실패하면 트랜잭션이 롤백되어 아무것도 남지 않습니다.
//!
//! ## 동시 수정 제어 (낙관적 잠금)
//! 내용 변경은 `UPDATE ... WHERE id = ? AND version = ?`로 수행합니다.
//! 그 사이에 다른 요청이 먼저 버전을 올렸다면 영향받은 행이 0개가 되고,
//! `AppError::Conflict`를 반환합니다. 호출자는 작업 전체를 다시 시도하면 됩니다.

use crate::error::{is_unique_violation, AppError};
use crate::models::{ProgressDocument, ProgressHistoryEntry};
use sqlx::{SqliteConnection, SqlitePool};

const PROGRESS_COLUMNS: &str =
    "id, project_id, content, version, updated_by, is_published, created_at, updated_at";

const HISTORY_COLUMNS: &str =
    "id, progress_id, version, content, change_summary, updated_by, created_at";

/// 검색 조건 (저장소 수준)
///
/// `project_ids`는 이미 소유권으로 걸러진 목록이어야 합니다.
/// 비어 있으면 아무 문서도 일치하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub project_ids: Vec<String>,
    /// 본문 부분 문자열 (대소문자 무시, `%`/`_`는 글자 그대로)
    pub query: Option<String>,
    pub is_published: Option<bool>,
    /// `TIMESTAMP_FORMAT` 형식의 하한 (포함)
    pub updated_from: Option<String>,
    /// `TIMESTAMP_FORMAT` 형식의 상한 (포함)
    pub updated_to: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

/// 진행 문서와 이력을 저장/조회하는 저장소
///
/// `SqlitePool`은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
#[derive(Debug, Clone)]
pub struct VersionStore {
    pool: SqlitePool,
}

impl VersionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 프로젝트의 현재 문서를 조회합니다.
    pub async fn get_current(&self, project_id: &str) -> Result<Option<ProgressDocument>, AppError> {
        let doc = sqlx::query_as::<_, ProgressDocument>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM project_progress WHERE project_id = ?"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    pub async fn get_by_id(&self, progress_id: &str) -> Result<Option<ProgressDocument>, AppError> {
        let doc = sqlx::query_as::<_, ProgressDocument>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM project_progress WHERE id = ?"
        ))
        .bind(progress_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(doc)
    }

    /// 이력을 버전 내림차순(최신 먼저)으로 페이지 단위 조회합니다.
    pub async fn get_history(
        &self,
        progress_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ProgressHistoryEntry>, AppError> {
        let entries = sqlx::query_as::<_, ProgressHistoryEntry>(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM progress_history
            WHERE progress_id = ?
            ORDER BY version DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(progress_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count_history(&self, progress_id: &str) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM progress_history WHERE progress_id = ?")
                .bind(progress_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// 특정 버전의 이력 항목을 조회합니다.
    pub async fn get_version(
        &self,
        progress_id: &str,
        version: i64,
    ) -> Result<Option<ProgressHistoryEntry>, AppError> {
        let entry = sqlx::query_as::<_, ProgressHistoryEntry>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM progress_history WHERE progress_id = ? AND version = ?"
        ))
        .bind(progress_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// 이력 항목 하나를 추가합니다.
    ///
    /// 같은 `(progress_id, version)`이 이미 있으면 `AppError::Conflict`입니다.
    /// 서비스 계층은 이 함수 대신 문서 변경과 이력 추가를 묶은
    /// `create` / `update_content_and_metadata`를 사용합니다.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn append_history(
        &self,
        progress_id: &str,
        version: i64,
        content: &str,
        change_summary: Option<&str>,
        updated_by: &str,
    ) -> Result<ProgressHistoryEntry, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_history(&mut conn, progress_id, version, content, change_summary, updated_by).await
    }

    /// 버전 1 문서와 버전 1 이력을 한 트랜잭션으로 만듭니다.
    ///
    /// 이미 해당 프로젝트의 문서가 있으면 `AppError::AlreadyExists`입니다.
    pub async fn create(
        &self,
        project_id: &str,
        content: &str,
        is_published: bool,
        updated_by: &str,
        change_summary: &str,
    ) -> Result<ProgressDocument, AppError> {
        let id = uuid::Uuid::now_v7().to_string();
        let mut tx = self.pool.begin().await?;

        let doc = sqlx::query_as::<_, ProgressDocument>(&format!(
            r#"
            INSERT INTO project_progress (id, project_id, content, version, updated_by, is_published)
            VALUES (?, ?, ?, 1, ?, ?)
            RETURNING {PROGRESS_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(project_id)
        .bind(content)
        .bind(updated_by)
        .bind(is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyExists(
                    "Progress document already exists for this project".to_string(),
                )
            } else {
                AppError::Database(e)
            }
        })?;

        insert_history(&mut tx, &doc.id, 1, content, Some(change_summary), updated_by).await?;

        tx.commit().await?;
        Ok(doc)
    }

    /// 내용을 바꾸고 버전을 1 올린 뒤, 새 버전의 이력을 추가합니다.
    ///
    /// `expected_version`은 호출자가 읽어둔 현재 버전입니다. 그 사이 다른
    /// 요청이 버전을 올렸다면 아무것도 쓰지 않고 `AppError::Conflict`를 반환합니다.
    /// `is_published`가 `Some`이면 같은 트랜잭션에서 함께 바꿉니다.
    pub async fn update_content_and_metadata(
        &self,
        progress_id: &str,
        expected_version: i64,
        content: &str,
        is_published: Option<bool>,
        updated_by: &str,
        change_summary: &str,
    ) -> Result<ProgressDocument, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE project_progress
            SET content = ?,
                version = version + 1,
                is_published = COALESCE(?, is_published),
                updated_by = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(content)
        .bind(is_published)
        .bind(updated_by)
        .bind(progress_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // tx는 drop되면서 롤백됩니다.
            return Err(AppError::Conflict(format!(
                "Progress document is no longer at version {}; retry the operation",
                expected_version
            )));
        }

        let new_version = expected_version + 1;
        insert_history(
            &mut tx,
            progress_id,
            new_version,
            content,
            Some(change_summary),
            updated_by,
        )
        .await?;

        let doc = sqlx::query_as::<_, ProgressDocument>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM project_progress WHERE id = ?"
        ))
        .bind(progress_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(doc)
    }

    /// 버전과 무관한 필드(공개 여부, 수정자)만 갱신합니다.
    ///
    /// # 반환값
    /// - `Ok(Some(doc))`: 갱신된 문서
    /// - `Ok(None)`: 해당 ID의 문서가 없음
    pub async fn update_metadata(
        &self,
        progress_id: &str,
        is_published: Option<bool>,
        updated_by: &str,
    ) -> Result<Option<ProgressDocument>, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE project_progress
            SET is_published = COALESCE(?, is_published),
                updated_by = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
            "#,
        )
        .bind(is_published)
        .bind(updated_by)
        .bind(progress_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(progress_id).await
    }

    /// 문서와 모든 이력을 한 트랜잭션으로 삭제합니다.
    ///
    /// 외래키 `ON DELETE CASCADE`도 걸려 있지만, 외래키가 꺼진 연결에서도
    /// 이력이 남지 않도록 이력을 먼저 지웁니다.
    pub async fn delete(&self, progress_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM progress_history WHERE progress_id = ?")
            .bind(progress_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM project_progress WHERE id = ?")
            .bind(progress_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// 조건에 맞는 문서 한 페이지와 전체 일치 건수를 반환합니다.
    ///
    /// 결과는 `updated_at` 내림차순입니다. 건수는 페이지네이션과 무관합니다.
    pub async fn search(
        &self,
        filter: &SearchFilter,
    ) -> Result<(Vec<ProgressDocument>, i64), AppError> {
        if filter.project_ids.is_empty() {
            return Ok((Vec::new(), 0));
        }

        // ── 동적 WHERE 절 구성 ──
        // 조건 문자열과 바인딩 값을 같은 순서로 모아둔 뒤,
        // 건수 쿼리와 페이지 쿼리에서 똑같이 재사용합니다.
        let placeholders = vec!["?"; filter.project_ids.len()].join(", ");
        let mut where_clause = format!("project_id IN ({})", placeholders);
        let mut bindings: Vec<String> = filter.project_ids.clone();

        if let Some(query) = &filter.query {
            where_clause.push_str(" AND content LIKE ? ESCAPE '\\'");
            bindings.push(format!("%{}%", escape_like(query)));
        }

        if let Some(is_published) = filter.is_published {
            where_clause.push_str(" AND is_published = ?");
            bindings.push(if is_published { "1" } else { "0" }.to_string());
        }

        if let Some(from) = &filter.updated_from {
            where_clause.push_str(" AND updated_at >= ?");
            bindings.push(from.clone());
        }

        if let Some(to) = &filter.updated_to {
            where_clause.push_str(" AND updated_at <= ?");
            bindings.push(to.clone());
        }

        let count_sql = format!("SELECT COUNT(*) FROM project_progress WHERE {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for binding in &bindings {
            count_query = count_query.bind(binding);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM project_progress WHERE {} \
             ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut page_query = sqlx::query_as::<_, ProgressDocument>(&page_sql);
        for binding in &bindings {
            page_query = page_query.bind(binding);
        }
        let results = page_query
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&self.pool)
            .await?;

        Ok((results, total))
    }
}

/// 주어진 연결(또는 트랜잭션)에서 이력 항목을 추가합니다.
async fn insert_history(
    conn: &mut SqliteConnection,
    progress_id: &str,
    version: i64,
    content: &str,
    change_summary: Option<&str>,
    updated_by: &str,
) -> Result<ProgressHistoryEntry, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query_as::<_, ProgressHistoryEntry>(&format!(
        r#"
        INSERT INTO progress_history (id, progress_id, version, content, change_summary, updated_by)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {HISTORY_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(progress_id)
    .bind(version)
    .bind(content)
    .bind(change_summary)
    .bind(updated_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!(
                "Version {} already exists for this progress document; retry the operation",
                version
            ))
        } else {
            AppError::Database(e)
        }
    })
}

/// LIKE 패턴의 특수문자(`%`, `_`, `\`)를 글자 그대로 매칭되도록 이스케이프합니다.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
