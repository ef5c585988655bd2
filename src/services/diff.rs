//! # 버전 비교 (줄 단위 diff)
//!
//! `similar` 크레이트로 두 스냅샷의 unified diff를 만들고,
//! 추가/삭제된 줄 수를 셉니다.

use similar::{ChangeTag, TextDiff};

/// unified diff에서 변경 줄 주변에 보여줄 문맥 줄 수
const CONTEXT_LINES: usize = 3;

/// 줄 단위 비교 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// `--- {old_label}` / `+++ {new_label}` 헤더가 붙은 unified diff.
    /// 두 입력이 같으면 빈 문자열입니다.
    pub unified: String,
    pub added: usize,
    pub removed: usize,
}

impl LineDiff {
    /// 수정된 줄 수의 근사치. 추가와 삭제를 실제로 짝짓지 않고
    /// 둘 중 작은 값을 씁니다.
    pub fn modified(&self) -> usize {
        self.added.min(self.removed)
    }
}

/// `old` → `new` 줄 단위 diff를 계산합니다.
///
/// 추가/삭제 줄 수는 헤더 줄을 제외한 `+`/`-` 줄 수와 같습니다.
pub fn diff_lines(old: &str, new: &str, old_label: &str, new_label: &str) -> LineDiff {
    let diff = TextDiff::from_lines(old, new);

    let (added, removed) = diff
        .iter_all_changes()
        .fold((0, 0), |(a, r), change| match change.tag() {
            ChangeTag::Insert => (a + 1, r),
            ChangeTag::Delete => (a, r + 1),
            ChangeTag::Equal => (a, r),
        });

    let unified = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string();

    LineDiff {
        unified,
        added,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_no_changes() {
        let diff = diff_lines("# Title\nHello", "# Title\nHello", "Version 1", "Version 1");
        assert_eq!(diff.added, 0);
        assert_eq!(diff.removed, 0);
        assert_eq!(diff.modified(), 0);
        assert!(diff.unified.is_empty());
    }

    #[test]
    fn appended_line_is_one_insert() {
        let diff = diff_lines("a\nb\n", "a\nb\nc\n", "Version 1", "Version 2");
        assert_eq!((diff.added, diff.removed), (1, 0));
        assert!(diff.unified.starts_with("--- Version 1\n+++ Version 2\n"));
        assert!(diff.unified.contains("+c"));
    }

    #[test]
    fn replaced_line_counts_as_modified() {
        let diff = diff_lines("a\nb\nc\n", "a\nB\nc\nd\n", "Version 2", "Version 3");
        assert_eq!(diff.added, 2);
        assert_eq!(diff.removed, 1);
        assert_eq!(diff.modified(), 1);
    }

    #[test]
    fn counts_exclude_header_lines() {
        let diff = diff_lines("x\n", "y\n", "Version 1", "Version 2");
        let plus = diff.unified.lines().filter(|l| l.starts_with('+')).count();
        let minus = diff.unified.lines().filter(|l| l.starts_with('-')).count();
        // 헤더 "+++", "---" 한 줄씩을 빼면 실제 변경 줄 수와 같아야 합니다.
        assert_eq!(plus - 1, diff.added);
        assert_eq!(minus - 1, diff.removed);
    }
}
