//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 코드를 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `progress`: 진행 문서와 버전 이력 저장소 (`VersionStore`)
//! - `projects`: 프로젝트 레코드와 소유권 확인 (`SqliteProjectAccess`)

pub mod progress;
pub mod projects;

pub use progress::*;
pub use projects::*;

/// SQLite가 기본값으로 쓰는 것과 같은 ISO-8601 UTC 형식 (밀리초 포함)
///
/// 같은 형식으로 맞춰야 `updated_at` 문자열 비교가 시간 비교와 같아집니다.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 마이그레이션이 적용된 인메모리 SQLite 풀 (테스트 전용)
///
/// 인메모리 DB는 연결마다 따로 생기므로 연결을 하나로 고정하고,
/// 유휴 연결이 닫혀 데이터가 사라지지 않도록 타임아웃을 끕니다.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");

    pool
}
