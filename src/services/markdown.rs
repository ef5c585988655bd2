//! # 마크다운 콘텐츠 분석
//!
//! 진행 문서 본문의 텍스트 통계를 계산하는 순수 함수들입니다.
//! 부수 효과도, 실패하는 경우도 없습니다.
//!
//! 이 모듈의 함수들:
//! - `analyze_content()`: 줄/단어/문자/헤딩/링크 등의 개수를 한 번에 계산
//! - `count_words()`: 텍스트의 단어 수 계산
//! - `count_chars()`: 텍스트의 문자 수 계산

use serde::Serialize;

/// 본문 분석 결과
///
/// 헤딩/코드블록/링크/이미지 개수는 마크다운을 실제로 파싱하지 않고
/// 기호 개수로 어림잡은 값입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentStats {
    /// `\n` 기준 줄 수. 끝의 개행 뒤 빈 줄도 한 줄로 셉니다.
    pub lines: usize,
    /// 공백으로 구분된 단어 수
    pub words: usize,
    /// 유니코드 문자 수
    pub characters: usize,
    /// 공백 제거 후 비어 있지 않은 줄 수
    pub non_empty_lines: usize,
    /// 공백 제거 후 `#`로 시작하는 줄 수
    pub headings: usize,
    /// ```` ``` ```` 출현 횟수 (열고 닫는 펜스를 짝짓지 않음)
    pub code_blocks: usize,
    /// `[` 개수 + `](` 개수
    pub links: usize,
    /// `![` 개수
    pub images: usize,
}

/// 본문 전체를 분석합니다.
///
/// 빈 문자열은 `lines == 1`(빈 줄 하나)이고 나머지는 모두 0입니다.
pub fn analyze_content(content: &str) -> ContentStats {
    let mut stats = ContentStats {
        words: count_words(content),
        characters: count_chars(content),
        code_blocks: content.matches("```").count(),
        links: content.matches('[').count() + content.matches("](").count(),
        images: content.matches("![").count(),
        ..ContentStats::default()
    };

    // split('\n')은 빈 문자열에서도 빈 조각 하나를 돌려줍니다.
    for line in content.split('\n') {
        stats.lines += 1;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            stats.non_empty_lines += 1;
        }
        if trimmed.starts_with('#') {
            stats.headings += 1;
        }
    }

    stats
}

/// 텍스트의 단어 수를 계산합니다.
///
/// 공백(스페이스, 탭, 줄바꿈)으로 분리하여 단어를 셉니다.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 텍스트의 문자 수를 계산합니다.
///
/// 유니코드 문자 단위로 셉니다 (한글 1자 = 1문자).
/// `.len()`은 바이트 수를 반환하므로 한글 등에는 부적합합니다.
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}
