//! # 진행 문서 라우트 핸들러
//!
//! ## 엔드포인트 (모두 `/api/v1/projects/{project_id}` 아래)
//! | 메서드 | 경로 | 설명 |
//! |--------|------|------|
//! | GET | /progress | 현재 문서 |
//! | POST | /progress | 문서 생성 (201) |
//! | PUT | /progress | 문서 수정 |
//! | DELETE | /progress | 문서와 이력 삭제 (204) |
//! | GET | /progress/with-history?history_limit=10 | 문서 + 최근 이력 |
//! | GET | /progress/history?skip=0&limit=50 | 이력 목록 |
//! | GET | /progress/version/{version} | 특정 버전 |
//! | GET | /progress/compare/{a}/{b} | 두 버전 비교 |
//! | GET | /progress/stats | 통계 |
//! | POST | /progress/restore/{version}?change_summary= | 예전 버전 복원 |
//! | POST | /progress/publish, /progress/unpublish | 공개 여부 변경 |
//!
//! 검색만 프로젝트 밖에 있습니다: `POST /api/v1/progress/search`

use crate::{error::AppError, middleware::AuthUser, models::*, routes::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

/// 검색 응답에 전체 일치 건수를 싣는 헤더
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

fn default_history_limit() -> i64 {
    10
}

fn default_page_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct HistoryLimitQuery {
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct RestoreQuery {
    pub change_summary: Option<String>,
}

pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<ProgressDocument>, AppError> {
    let doc = state.progress.get_progress(&project_id, &user.user_id).await?;
    Ok(Json(doc))
}

pub async fn create_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Json(req): Json<CreateProgressRequest>,
) -> Result<(StatusCode, Json<ProgressDocument>), AppError> {
    let doc = state
        .progress
        .create_progress(&project_id, &user.user_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<ProgressDocument>, AppError> {
    let doc = state
        .progress
        .update_progress(&project_id, &user.user_id, req)
        .await?;
    Ok(Json(doc))
}

pub async fn delete_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .progress
        .delete_progress(&project_id, &user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_progress_with_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Query(query): Query<HistoryLimitQuery>,
) -> Result<Json<ProgressWithHistory>, AppError> {
    let doc = state
        .progress
        .get_progress_with_history(&project_id, &user.user_id, query.history_limit)
        .await?;
    Ok(Json(doc))
}

/// 문서가 없으면 404가 아니라 빈 배열입니다.
pub async fn get_progress_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ProgressHistoryEntry>>, AppError> {
    let history = state
        .progress
        .get_progress_history(&project_id, &user.user_id, page.skip, page.limit)
        .await?;
    Ok(Json(history))
}

pub async fn get_progress_version(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, version)): Path<(String, i64)>,
) -> Result<Json<ProgressHistoryEntry>, AppError> {
    let entry = state
        .progress
        .get_progress_version(&project_id, version, &user.user_id)
        .await?;
    Ok(Json(entry))
}

pub async fn compare_versions(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, version_a, version_b)): Path<(String, i64, i64)>,
) -> Result<Json<VersionComparison>, AppError> {
    let comparison = state
        .progress
        .compare_versions(&project_id, version_a, version_b, &user.user_id)
        .await?;
    Ok(Json(comparison))
}

pub async fn get_progress_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<ProgressStats>, AppError> {
    let stats = state
        .progress
        .get_progress_stats(&project_id, &user.user_id)
        .await?;
    Ok(Json(stats))
}

pub async fn restore_version(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, version)): Path<(String, i64)>,
    Query(query): Query<RestoreQuery>,
) -> Result<Json<ProgressDocument>, AppError> {
    let doc = state
        .progress
        .restore_version(&project_id, version, &user.user_id, query.change_summary)
        .await?;
    Ok(Json(doc))
}

pub async fn publish_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<ProgressDocument>, AppError> {
    let doc = state
        .progress
        .publish_progress(&project_id, &user.user_id)
        .await?;
    Ok(Json(doc))
}

pub async fn unpublish_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<ProgressDocument>, AppError> {
    let doc = state
        .progress
        .unpublish_progress(&project_id, &user.user_id)
        .await?;
    Ok(Json(doc))
}

/// 본문의 조건으로 내 프로젝트의 문서를 검색합니다.
///
/// 전체 일치 건수는 본문의 `total`과 `X-Total-Count` 헤더 양쪽에 실립니다.
pub async fn search_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ProgressSearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.progress.search_progress(&user.user_id, req).await?;
    let total = page.total.to_string();
    Ok(([(TOTAL_COUNT_HEADER, total)], Json(page)))
}

#[cfg(test)]
mod tests {
    use crate::db::{self, test_pool};
    use crate::middleware::auth::create_access_token;
    use crate::models::CreateProjectRequest;
    use crate::routes::{router, AppState};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    struct TestApp {
        app: Router,
        project_id: String,
        token: String,
    }

    async fn setup() -> TestApp {
        let pool = test_pool().await;
        let project = db::create_project(
            &pool,
            "alice",
            &CreateProjectRequest {
                name: "Roadmap".to_string(),
                description: None,
                settings: None,
            },
        )
        .await
        .unwrap();

        TestApp {
            app: router(AppState::new(pool, SECRET.to_string())),
            project_id: project.id,
            token: create_access_token("alice", SECRET).unwrap(),
        }
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let t = setup().await;
        let (status, _, body) = send(&t.app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn progress_routes_require_a_token() {
        let t = setup().await;
        let uri = format!("/api/v1/projects/{}/progress", t.project_id);

        let (status, _, body) = send(&t.app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "missing_token");

        let (status, _, _) = send(&t.app, Method::GET, &uri, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn document_lifecycle_over_http() {
        let t = setup().await;
        let base = format!("/api/v1/projects/{}/progress", t.project_id);
        let token = Some(t.token.as_str());

        let (status, _, doc) = send(
            &t.app,
            Method::POST,
            &base,
            token,
            Some(json!({ "content": "# Title\nHello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["updated_by"], "alice");

        let (status, _, body) = send(
            &t.app,
            Method::POST,
            &base,
            token,
            Some(json!({ "content": "again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "already_exists");

        let (status, _, doc) = send(
            &t.app,
            Method::PUT,
            &base,
            token,
            Some(json!({ "content": "# Title\nHello\nWorld" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["version"], 2);

        let (status, _, history) =
            send(&t.app, Method::GET, &format!("{}/history", base), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[0]["change_summary"], "Added 1 lines, Added 1 words");

        let (status, _, cmp) = send(
            &t.app,
            Method::GET,
            &format!("{}/compare/1/2", base),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cmp["version_a"], 1);
        assert_eq!(cmp["version_b"], 2);
        assert!(cmp["added_lines"].as_u64().unwrap() >= 1);
        assert!(cmp["changes_summary"].as_str().unwrap().contains("+World"));

        let (status, _, doc) = send(
            &t.app,
            Method::POST,
            &format!("{}/restore/1?change_summary=Back%20to%20start", base),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["version"], 3);
        assert_eq!(doc["content"], "# Title\nHello");

        let (status, _, entry) = send(
            &t.app,
            Method::GET,
            &format!("{}/version/3", base),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["change_summary"], "Back to start");

        let (status, _, stats) =
            send(&t.app, Method::GET, &format!("{}/stats", base), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_versions"], 3);
        assert_eq!(stats["headings"], 1);

        let (status, _, doc) =
            send(&t.app, Method::POST, &format!("{}/publish", base), token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["is_published"], true);
        assert_eq!(doc["version"], 3);

        let (status, _, with_history) = send(
            &t.app,
            Method::GET,
            &format!("{}/with-history?history_limit=2", base),
            token,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(with_history["version"], 3);
        assert_eq!(with_history["history"].as_array().unwrap().len(), 2);

        let (status, _, body) = send(&t.app, Method::DELETE, &base, token, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _, body) = send(&t.app, Method::GET, &base, token, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn other_users_get_not_found() {
        let t = setup().await;
        let base = format!("/api/v1/projects/{}/progress", t.project_id);
        send(
            &t.app,
            Method::POST,
            &base,
            Some(t.token.as_str()),
            Some(json!({ "content": "private" })),
        )
        .await;

        let bob = create_access_token("bob", SECRET).unwrap();
        let (status, _, _) = send(&t.app, Method::GET, &base, Some(bob.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, history) = send(
            &t.app,
            Method::GET,
            &format!("{}/history", base),
            Some(bob.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let t = setup().await;
        let base = format!("/api/v1/projects/{}/progress", t.project_id);

        let (status, _, body) = send(
            &t.app,
            Method::POST,
            &base,
            Some(t.token.as_str()),
            Some(json!({ "content": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");

        let (status, _, _) = send(
            &t.app,
            Method::GET,
            &format!("{}/history?limit=0", base),
            Some(t.token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_reports_total_in_body_and_header() {
        let t = setup().await;
        send(
            &t.app,
            Method::POST,
            &format!("/api/v1/projects/{}/progress", t.project_id),
            Some(t.token.as_str()),
            Some(json!({ "content": "Sprint notes" })),
        )
        .await;

        let (status, headers, page) = send(
            &t.app,
            Method::POST,
            "/api/v1/progress/search",
            Some(t.token.as_str()),
            Some(json!({ "query": "sprint", "limit": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["skip"], 0);
        assert_eq!(page["limit"], 10);
        assert_eq!(page["results"][0]["project_id"], t.project_id.as_str());
        assert_eq!(headers[super::TOTAL_COUNT_HEADER], "1");
    }

    #[tokio::test]
    async fn project_name_and_description_lengths_are_limited() {
        let t = setup().await;

        for body in [
            json!({ "name": "n".repeat(201) }),
            json!({ "name": "ok", "description": "d".repeat(2001) }),
            json!({ "name": "  " }),
        ] {
            let (status, _, err) = send(
                &t.app,
                Method::POST,
                "/api/v1/projects",
                Some(t.token.as_str()),
                Some(body),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err["error"]["code"], "validation_error");
        }

        let (status, _, project) = send(
            &t.app,
            Method::POST,
            "/api/v1/projects",
            Some(t.token.as_str()),
            Some(json!({ "name": "n".repeat(200), "description": "d".repeat(2000) })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(project["name"].as_str().unwrap().len(), 200);
    }

    #[tokio::test]
    async fn project_settings_are_merged() {
        let t = setup().await;
        let (status, _, project) = send(
            &t.app,
            Method::PATCH,
            &format!("/api/v1/projects/{}/settings", t.project_id),
            Some(t.token.as_str()),
            Some(json!({ "default_priority": "high" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(project["settings"]["default_priority"], "high");
        assert_eq!(project["settings"]["task_format_template"], "standard");

        let (status, _, list) =
            send(&t.app, Method::GET, "/api/v1/projects", Some(t.token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["projects"].as_array().unwrap().len(), 1);
    }
}
