//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `progress`: 진행 문서와 버전 이력, 요청/응답 구조체
//! - `project`: 소유권 확인에 쓰이는 최소한의 프로젝트 정보와 설정 병합
//!
//! `pub use X::*;`로 재공개하여 `crate::models::ProgressDocument`처럼
//! 짧게 접근할 수 있게 합니다.

pub mod progress;
pub mod project;

pub use progress::*;
pub use project::*;
