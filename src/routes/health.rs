//! # 헬스체크 핸들러
//!
//! - `GET /api/v1/health` → `{ "status": "ok" }`
//!
//! 인증이 필요 없는 유일한 엔드포인트입니다.

use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}
