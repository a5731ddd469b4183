//! Line diff for change summaries.
//!
//! Classic longest-common-subsequence table, `O(old_lines × new_lines)` in
//! both time and space. [`diff_guarded`] refuses inputs above a line
//! threshold and reports them coarsely instead.
//!
//! Lines are the pieces between `\n` separators, so a trailing newline shows
//! up as a final empty line and `\r` stays part of the line text.
//!
//! Display text for the CLI comes from [`render_unified`], which leaves hunk
//! layout to `similar`.

use similar::TextDiff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Add,
    Remove,
}

/// One step of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
    /// 1-based line number: in the old text for `Remove`, in the new text
    /// for `Add` and `Context`.
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub lines: Vec<DiffLine>,
    pub additions: usize,
    pub deletions: usize,
}

impl DiffResult {
    /// No additions and no deletions.
    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.deletions == 0
    }

    pub fn lines_changed(&self) -> usize {
        self.additions + self.deletions
    }
}

/// Line diff of `old` → `new`.
///
/// Identical inputs return an empty result without building the table.
/// When backtracking hits a tie between dropping an old line and taking a
/// new one, the addition wins; output is stable across runs and platforms.
pub fn diff(old: &str, new: &str) -> DiffResult {
    if old == new {
        return DiffResult::default();
    }

    let a: Vec<&str> = old.split('\n').collect();
    let b: Vec<&str> = new.split('\n').collect();
    let (m, n) = (a.len(), b.len());
    let width = n + 1;
    let at = |i: usize, j: usize| i * width + j;

    let mut dp = vec![0u32; (m + 1) * width];
    for i in 1..=m {
        for j in 1..=n {
            dp[at(i, j)] = if a[i - 1] == b[j - 1] {
                dp[at(i - 1, j - 1)] + 1
            } else {
                dp[at(i - 1, j)].max(dp[at(i, j - 1)])
            };
        }
    }

    let mut steps = Vec::with_capacity(m + n);
    let (mut additions, mut deletions) = (0, 0);
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && a[i - 1] == b[j - 1] {
            steps.push(DiffLine {
                kind: LineKind::Context,
                text: b[j - 1].to_string(),
                position: j,
            });
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || dp[at(i, j - 1)] >= dp[at(i - 1, j)]) {
            steps.push(DiffLine {
                kind: LineKind::Add,
                text: b[j - 1].to_string(),
                position: j,
            });
            additions += 1;
            j -= 1;
        } else {
            steps.push(DiffLine {
                kind: LineKind::Remove,
                text: a[i - 1].to_string(),
                position: i,
            });
            deletions += 1;
            i -= 1;
        }
    }
    steps.reverse();

    DiffResult {
        lines: steps,
        additions,
        deletions,
    }
}

/// A diff, or the reason it was not computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedDiff {
    Full(DiffResult),
    /// At least one side exceeded the line threshold.
    Omitted { old_lines: usize, new_lines: usize },
}

/// [`diff`] behind a size guard: inputs longer than `max_lines` on either side
/// are not diffed.
pub fn diff_guarded(old: &str, new: &str, max_lines: usize) -> GuardedDiff {
    let old_lines = line_count(old);
    let new_lines = line_count(new);
    if old != new && (old_lines > max_lines || new_lines > max_lines) {
        tracing::debug!(old_lines, new_lines, max_lines, "diff omitted for large input");
        return GuardedDiff::Omitted {
            old_lines,
            new_lines,
        };
    }
    GuardedDiff::Full(diff(old, new))
}

pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Unified diff text of `old` → `new` with three lines of context. Empty when
/// the inputs are identical.
pub fn render_unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(old_label, new_label)
        .context_radius(3)
        .to_string()
}
