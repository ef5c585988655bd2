//! # 비즈니스 로직 모듈
//!
//! HTTP나 DB 세부사항과 무관한 규칙을 모아둔 모듈입니다.
//!
//! - `markdown`: 본문 통계 (줄/단어/헤딩/코드블록 수 등)
//! - `summary`: 두 버전 사이의 변경 요약 문구 생성
//! - `diff`: 줄 단위 unified diff
//! - `progress`: 진행 문서 서비스 (`ProgressService`)

pub mod diff;
pub mod markdown;
pub mod progress;
pub mod summary;

pub use markdown::*;
pub use progress::*;
