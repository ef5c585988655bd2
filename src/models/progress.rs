//! # 진행 문서(Progress Document) 모델 정의
//!
//! 프로젝트마다 하나씩 존재하는 마크다운 진행 문서와,
//! 그 문서의 버전별 스냅샷(이력)을 표현하는 구조체들입니다.
//!
//! ## 버전 규칙
//! - 문서는 버전 1로 생성되고, 내용이 바뀔 때마다 정확히 1씩 증가합니다.
//! - 문서의 `version`은 언제나 가장 최근 이력 항목의 `version`과 같습니다.
//! - 이력 항목은 한 번 기록되면 수정/재정렬되지 않습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::ContentStats;

/// 현재 진행 문서 — DB의 `project_progress` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressDocument {
    /// 문서 고유 식별자 (UUIDv7)
    pub id: String,
    /// 소유 프로젝트 ID. 프로젝트당 문서는 최대 하나입니다.
    pub project_id: String,
    /// 마크다운 본문
    pub content: String,
    /// 현재 버전 번호 (1부터 시작, 감소하거나 건너뛰지 않음)
    pub version: i64,
    /// 마지막으로 문서를 변경한 사용자
    pub updated_by: String,
    /// 공개 여부. 버전과는 무관하게 바뀝니다.
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 버전 이력 항목 — DB의 `progress_history` 테이블 한 행에 대응합니다.
///
/// diff가 아니라 해당 버전의 전체 내용을 그대로 담고 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressHistoryEntry {
    pub id: String,
    pub progress_id: String,
    pub version: i64,
    pub content: String,
    /// 직전 버전 대비 변경 요약
    pub change_summary: Option<String>,
    pub updated_by: String,
    pub created_at: String,
}

/// 문서와 최근 이력 N개를 함께 담는 응답
#[derive(Debug, Clone, Serialize)]
pub struct ProgressWithHistory {
    #[serde(flatten)]
    pub progress: ProgressDocument,
    /// 버전 내림차순 (최신이 먼저)
    pub history: Vec<ProgressHistoryEntry>,
}

/// 문서 생성 요청 — `POST /projects/{project_id}/progress`의 본문
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProgressRequest {
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
    /// 없으면 "Initial document creation"이 기록됩니다.
    pub change_summary: Option<String>,
}

/// 문서 수정 요청 — `PUT /projects/{project_id}/progress`의 본문
///
/// 모든 필드가 선택 항목입니다. 내용(content)과 공개 여부(is_published)는
/// 서로 독립적으로 바뀝니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProgressRequest {
    pub content: Option<String>,
    pub is_published: Option<bool>,
    /// 없으면 이전 내용과 비교해 자동으로 요약을 만듭니다.
    pub change_summary: Option<String>,
}

/// 두 버전의 비교 결과
#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub version_a: i64,
    pub version_b: i64,
    pub content_a: String,
    pub content_b: String,
    /// `Version {a}` → `Version {b}` unified diff 텍스트
    pub changes_summary: String,
    pub added_lines: usize,
    pub removed_lines: usize,
    /// min(added_lines, removed_lines) — 줄 단위 짝맞춤이 아닌 근사치
    pub modified_lines: usize,
}

/// 문서 통계 — `GET /projects/{project_id}/progress/stats`
#[derive(Debug, Clone, Serialize)]
pub struct ProgressStats {
    /// 이력 항목 수
    pub total_versions: i64,
    #[serde(flatten)]
    pub content: ContentStats,
    pub is_published: bool,
    pub last_updated: String,
}

fn default_search_limit() -> i64 {
    50
}

/// 진행 문서 검색 조건 — `POST /progress/search`의 본문
///
/// 모든 조건은 AND로 결합되며, 항상 요청자 소유 프로젝트로 범위가 제한됩니다.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSearchRequest {
    /// 본문 부분 문자열 (대소문자 무시)
    pub query: Option<String>,
    pub project_ids: Option<Vec<String>>,
    pub is_published: Option<bool>,
    /// 이 시각 이후(포함)에 수정된 문서
    pub updated_from: Option<DateTime<Utc>>,
    /// 이 시각 이전(포함)에 수정된 문서
    pub updated_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

impl Default for ProgressSearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            project_ids: None,
            is_published: None,
            updated_from: None,
            updated_to: None,
            skip: 0,
            limit: default_search_limit(),
        }
    }
}

/// 검색 결과 한 페이지와, 페이지네이션과 무관한 전체 일치 건수
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub results: Vec<ProgressDocument>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}
