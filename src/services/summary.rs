//! # 변경 요약 생성
//!
//! 두 버전의 본문 통계를 비교해 사람이 읽을 수 있는 짧은 요약을 만듭니다.
//! 실제 diff가 아니므로, 줄/단어/헤딩 수가 그대로인 재배치는 감지하지 못합니다.

use super::markdown::analyze_content;

/// 변경이 감지되지 않았을 때의 요약
pub const MINOR_UPDATES: &str = "Minor content updates";

/// 이전 내용과 새 내용의 차이를 요약합니다.
///
/// 줄 → 단어 → 헤딩 순서로, 0이 아닌 증감마다 `"Added N X"` 또는
/// `"Removed N X"`를 만들고 `", "`로 잇습니다.
///
/// ```text
/// generate_change_summary("a", "a\nb c") → "Added 1 lines, Added 2 words"
/// ```
pub fn generate_change_summary(old_content: &str, new_content: &str) -> String {
    let old = analyze_content(old_content);
    let new = analyze_content(new_content);

    let deltas = [
        (delta(old.lines, new.lines), "lines"),
        (delta(old.words, new.words), "words"),
        (delta(old.headings, new.headings), "headings"),
    ];

    let clauses: Vec<String> = deltas
        .iter()
        .filter(|(d, _)| *d != 0)
        .map(|(d, unit)| {
            if *d > 0 {
                format!("Added {} {}", d, unit)
            } else {
                format!("Removed {} {}", d.unsigned_abs(), unit)
            }
        })
        .collect();

    if clauses.is_empty() {
        MINOR_UPDATES.to_string()
    } else {
        clauses.join(", ")
    }
}

fn delta(old: usize, new: usize) -> i64 {
    new as i64 - old as i64
}
