//! # 미들웨어 모듈
//!
//! - `auth`: Bearer JWT를 검증하고 요청자 ID를 꺼내는 `AuthUser` 추출기

pub mod auth;

pub use auth::AuthUser;
