//! # 진행 문서 서비스
//!
//! `VersionStore` 위에서 비즈니스 규칙을 적용합니다.
//!
//! - 모든 작업은 요청자가 프로젝트에 접근할 수 있는지 먼저 확인합니다.
//!   접근할 수 없으면 문서가 있어도 `NotFound`로 응답합니다.
//! - 입력 검증, 존재 확인은 어떤 쓰기보다도 먼저 끝납니다.
//! - 내용 변경(버전 증가 + 이력 추가)은 저장소의 한 트랜잭션에서 일어나며,
//!   동시 수정 충돌은 `AppError::Conflict`로 그대로 전달됩니다.
//!
//! 저장소와 소유권 확인은 생성자로 주입받습니다. 테스트에서는
//! `ProjectAccess`의 가짜 구현을 넣어 소유권 규칙만 따로 검증할 수 있습니다.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::db::{SearchFilter, VersionStore, TIMESTAMP_FORMAT};
use crate::error::AppError;
use crate::models::*;

use super::diff::diff_lines;
use super::markdown::analyze_content;
use super::summary::generate_change_summary;

/// 문서 생성 시 요약이 없을 때 기록되는 문구
pub const INITIAL_SUMMARY: &str = "Initial document creation";

/// 변경 요약의 최대 길이 (문자 수)
pub const MAX_SUMMARY_CHARS: usize = 500;

/// `get_progress_with_history`의 이력 개수 범위
pub const MAX_HISTORY_PREVIEW: i64 = 50;

/// 이력 목록 / 검색의 페이지 크기 상한
pub const MAX_PAGE_SIZE: i64 = 100;

/// 프로젝트 소유권 확인 (외부 협력자)
///
/// 진행 문서 서비스는 프로젝트가 어떻게 저장되는지 모르고,
/// "이 사용자가 이 프로젝트에 접근할 수 있는가"만 묻습니다.
pub trait ProjectAccess: Send + Sync {
    fn can_access(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// 사용자가 접근할 수 있는 모든 프로젝트 ID
    fn accessible_projects(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ProgressService<A> {
    store: VersionStore,
    access: A,
}

impl<A: ProjectAccess> ProgressService<A> {
    pub fn new(store: VersionStore, access: A) -> Self {
        Self { store, access }
    }

    /// 접근 가능한 프로젝트의 문서를 찾습니다. 접근 불가도 `None`입니다.
    async fn find_document(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Option<ProgressDocument>, AppError> {
        if !self.access.can_access(project_id, user_id).await? {
            return Ok(None);
        }
        self.store.get_current(project_id).await
    }

    async fn document(&self, project_id: &str, user_id: &str) -> Result<ProgressDocument, AppError> {
        self.find_document(project_id, user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_progress(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<ProgressDocument, AppError> {
        self.document(project_id, user_id).await
    }

    /// 문서와 최근 이력 `history_limit`개(1–50)를 함께 조회합니다.
    pub async fn get_progress_with_history(
        &self,
        project_id: &str,
        user_id: &str,
        history_limit: i64,
    ) -> Result<ProgressWithHistory, AppError> {
        validate_range("history_limit", history_limit, 1, MAX_HISTORY_PREVIEW)?;

        let progress = self.document(project_id, user_id).await?;
        let history = self.store.get_history(&progress.id, 0, history_limit).await?;

        Ok(ProgressWithHistory { progress, history })
    }

    /// 버전 1 문서와 버전 1 이력을 만듭니다.
    ///
    /// # 에러
    /// - `Validation`: 내용이 비어 있거나(공백만 포함) 요약이 너무 김
    /// - `NotFound`: 프로젝트가 없거나 접근 불가
    /// - `AlreadyExists`: 이미 문서가 있음
    pub async fn create_progress(
        &self,
        project_id: &str,
        user_id: &str,
        req: CreateProgressRequest,
    ) -> Result<ProgressDocument, AppError> {
        validate_content(&req.content)?;
        let summary = validate_summary(req.change_summary)?;

        if !self.access.can_access(project_id, user_id).await? {
            return Err(AppError::NotFound);
        }

        if self.store.get_current(project_id).await?.is_some() {
            return Err(AppError::AlreadyExists(
                "Progress document already exists for this project".to_string(),
            ));
        }

        let doc = self
            .store
            .create(
                project_id,
                &req.content,
                req.is_published,
                user_id,
                summary.as_deref().unwrap_or(INITIAL_SUMMARY),
            )
            .await?;

        tracing::info!(
            "Created progress document for project {} by user {}",
            project_id,
            user_id
        );
        Ok(doc)
    }

    /// 문서를 수정합니다.
    ///
    /// - 내용이 실제로 바뀌면 버전을 올리고 이력을 추가합니다.
    ///   요약이 없으면 이전 내용과 비교해 자동 생성합니다.
    /// - 내용이 현재와 같으면 버전/이력은 그대로입니다.
    /// - `is_published`는 버전과 무관하게 반영됩니다.
    /// - `updated_by`는 항상 요청자로 바뀝니다.
    pub async fn update_progress(
        &self,
        project_id: &str,
        user_id: &str,
        req: UpdateProgressRequest,
    ) -> Result<ProgressDocument, AppError> {
        if let Some(content) = &req.content {
            validate_content(content)?;
        }
        let summary = validate_summary(req.change_summary)?;

        let current = self.document(project_id, user_id).await?;

        let changed_content = req.content.filter(|c| *c != current.content);

        let doc = match changed_content {
            Some(content) => {
                let summary = summary
                    .unwrap_or_else(|| generate_change_summary(&current.content, &content));
                let result = self
                    .store
                    .update_content_and_metadata(
                        &current.id,
                        current.version,
                        &content,
                        req.is_published,
                        user_id,
                        &summary,
                    )
                    .await;
                if let Err(AppError::Conflict(_)) = &result {
                    tracing::warn!(
                        "Version conflict updating progress for project {} at version {}",
                        project_id,
                        current.version
                    );
                }
                result?
            }
            None => self
                .store
                .update_metadata(&current.id, req.is_published, user_id)
                .await?
                .ok_or(AppError::NotFound)?,
        };

        tracing::info!(
            "Updated progress document for project {} by user {} (version {})",
            project_id,
            user_id,
            doc.version
        );
        Ok(doc)
    }

    /// 문서와 모든 이력을 삭제합니다.
    pub async fn delete_progress(&self, project_id: &str, user_id: &str) -> Result<(), AppError> {
        let doc = self.document(project_id, user_id).await?;

        if !self.store.delete(&doc.id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!(
            "Deleted progress document for project {} by user {}",
            project_id,
            user_id
        );
        Ok(())
    }

    /// 이력 목록 (버전 내림차순). 문서가 없거나 접근할 수 없으면 빈 목록입니다.
    pub async fn get_progress_history(
        &self,
        project_id: &str,
        user_id: &str,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ProgressHistoryEntry>, AppError> {
        validate_page(skip, limit)?;

        match self.find_document(project_id, user_id).await? {
            Some(doc) => self.store.get_history(&doc.id, skip, limit).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_progress_version(
        &self,
        project_id: &str,
        version: i64,
        user_id: &str,
    ) -> Result<ProgressHistoryEntry, AppError> {
        let doc = self.document(project_id, user_id).await?;
        self.store
            .get_version(&doc.id, version)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// 두 버전(a → b)을 줄 단위로 비교합니다.
    pub async fn compare_versions(
        &self,
        project_id: &str,
        version_a: i64,
        version_b: i64,
        user_id: &str,
    ) -> Result<VersionComparison, AppError> {
        let doc = self.document(project_id, user_id).await?;

        let entry_a = self.store.get_version(&doc.id, version_a).await?;
        let entry_b = self.store.get_version(&doc.id, version_b).await?;
        let (Some(entry_a), Some(entry_b)) = (entry_a, entry_b) else {
            return Err(AppError::NotFound);
        };

        let diff = diff_lines(
            &entry_a.content,
            &entry_b.content,
            &format!("Version {}", version_a),
            &format!("Version {}", version_b),
        );
        let modified_lines = diff.modified();

        Ok(VersionComparison {
            version_a,
            version_b,
            content_a: entry_a.content,
            content_b: entry_b.content,
            changes_summary: diff.unified,
            added_lines: diff.added,
            removed_lines: diff.removed,
            modified_lines,
        })
    }

    pub async fn get_progress_stats(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<ProgressStats, AppError> {
        let doc = self.document(project_id, user_id).await?;
        let total_versions = self.store.count_history(&doc.id).await?;

        Ok(ProgressStats {
            total_versions,
            content: analyze_content(&doc.content),
            is_published: doc.is_published,
            last_updated: doc.updated_at,
        })
    }

    /// 요청자 소유 프로젝트의 문서를 검색합니다.
    ///
    /// `project_ids`가 주어지면 접근 가능한 프로젝트와의 교집합으로 범위를 좁힙니다.
    /// 빈 `query`와 빈 `project_ids`는 조건이 없는 것으로 취급합니다.
    pub async fn search_progress(
        &self,
        user_id: &str,
        req: ProgressSearchRequest,
    ) -> Result<SearchPage, AppError> {
        validate_page(req.skip, req.limit)?;

        let accessible = self.access.accessible_projects(user_id).await?;
        let project_ids = match req.project_ids.filter(|ids| !ids.is_empty()) {
            Some(requested) => accessible
                .into_iter()
                .filter(|id| requested.contains(id))
                .collect(),
            None => accessible,
        };

        let filter = SearchFilter {
            project_ids,
            query: req.query.filter(|q| !q.is_empty()),
            is_published: req.is_published,
            updated_from: req.updated_from.map(format_timestamp),
            updated_to: req.updated_to.map(format_timestamp),
            skip: req.skip,
            limit: req.limit,
        };

        let (results, total) = self.store.search(&filter).await?;

        Ok(SearchPage {
            results,
            total,
            skip: req.skip,
            limit: req.limit,
        })
    }

    /// 예전 버전의 내용을 현재 문서로 되돌립니다.
    ///
    /// 버전 번호는 되감지 않습니다. 현재 버전 + 1의 새 버전이 만들어지고,
    /// 그 이력의 내용은 복원 대상 스냅샷과 같습니다.
    pub async fn restore_version(
        &self,
        project_id: &str,
        version: i64,
        user_id: &str,
        change_summary: Option<String>,
    ) -> Result<ProgressDocument, AppError> {
        let summary = validate_summary(change_summary)?;

        let doc = self.document(project_id, user_id).await?;
        let target = self
            .store
            .get_version(&doc.id, version)
            .await?
            .ok_or(AppError::NotFound)?;

        let summary = summary.unwrap_or_else(|| format!("Restored to version {}", version));

        let restored = self
            .store
            .update_content_and_metadata(
                &doc.id,
                doc.version,
                &target.content,
                None,
                user_id,
                &summary,
            )
            .await?;

        tracing::info!(
            "Restored progress document for project {} to version {} (now version {})",
            project_id,
            version,
            restored.version
        );
        Ok(restored)
    }

    pub async fn publish_progress(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<ProgressDocument, AppError> {
        let doc = self.set_published(project_id, user_id, true).await?;
        tracing::info!("Published progress document for project {}", project_id);
        Ok(doc)
    }

    pub async fn unpublish_progress(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<ProgressDocument, AppError> {
        let doc = self.set_published(project_id, user_id, false).await?;
        tracing::info!("Unpublished progress document for project {}", project_id);
        Ok(doc)
    }

    async fn set_published(
        &self,
        project_id: &str,
        user_id: &str,
        is_published: bool,
    ) -> Result<ProgressDocument, AppError> {
        let doc = self.document(project_id, user_id).await?;
        self.store
            .update_metadata(&doc.id, Some(is_published), user_id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content cannot be empty".to_string()));
    }
    Ok(())
}

/// 요약 길이를 검사하고, 공백뿐인 요약은 "없음"으로 바꿉니다.
fn validate_summary(summary: Option<String>) -> Result<Option<String>, AppError> {
    let summary = summary.filter(|s| !s.trim().is_empty());
    if let Some(s) = &summary {
        if s.chars().count() > MAX_SUMMARY_CHARS {
            return Err(AppError::Validation(format!(
                "Change summary must be at most {} characters",
                MAX_SUMMARY_CHARS
            )));
        }
    }
    Ok(summary)
}

fn validate_range(name: &str, value: i64, min: i64, max: i64) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            name, min, max
        )));
    }
    Ok(())
}

fn validate_page(skip: i64, limit: i64) -> Result<(), AppError> {
    if skip < 0 {
        return Err(AppError::Validation("skip must not be negative".to_string()));
    }
    validate_range("limit", limit, 1, MAX_PAGE_SIZE)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
