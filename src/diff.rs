// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Line diffs between installed and rendered dotfiles.

use owo_colors::OwoColorize;
use std::fmt::Write;

/// One line of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

impl DiffLine<'_> {
    fn is_change(&self) -> bool {
        !matches!(self, Self::Same(_))
    }
}

/// Compute line diff turning `old` into `new`.
///
/// Uses a longest common subsequence table, which is plenty for files the
/// size of a dotfile. Removals are listed before additions within each
/// changed hunk.
pub fn diff<'a>(old: &'a str, new: &'a str) -> Vec<DiffLine<'a>> {
    let old: Vec<&str> = old.lines().collect();
    let new: Vec<&str> = new.lines().collect();

    // lcs[i][j] is the LCS length of old[i..] and new[j..].
    let mut lcs = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            lines.push(DiffLine::Same(old[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            lines.push(DiffLine::Removed(old[i]));
            i += 1;
        } else {
            lines.push(DiffLine::Added(new[j]));
            j += 1;
        }
    }
    lines.extend(old[i..].iter().copied().map(DiffLine::Removed));
    lines.extend(new[j..].iter().copied().map(DiffLine::Added));

    lines
}

/// Format diff, keeping only lines near a change.
///
/// Lines within `context` lines of a change are shown, and every gap between
/// shown lines is marked with `...`. Removed lines are red and added lines
/// green when `color` is set.
pub fn format(lines: &[DiffLine<'_>], context: usize, color: bool) -> String {
    let mut shown = vec![false; lines.len()];
    for (idx, _) in lines.iter().enumerate().filter(|(_, line)| line.is_change()) {
        let start = idx.saturating_sub(context);
        let end = (idx + context).min(lines.len() - 1);
        shown[start..=end].iter_mut().for_each(|show| *show = true);
    }

    let mut out = String::new();
    let mut last: Option<usize> = None;
    for (idx, line) in lines.iter().enumerate().filter(|(idx, _)| shown[*idx]) {
        if last.is_some_and(|last| idx != last + 1) {
            out.push_str("...\n");
        }
        last = Some(idx);

        // INVARIANT: Writing into a String cannot fail.
        let _ = match (line, color) {
            (DiffLine::Same(text), _) => writeln!(out, "  {text}"),
            (DiffLine::Removed(text), false) => writeln!(out, "- {text}"),
            (DiffLine::Added(text), false) => writeln!(out, "+ {text}"),
            (DiffLine::Removed(text), true) => writeln!(out, "{}", format!("- {text}").red()),
            (DiffLine::Added(text), true) => writeln!(out, "{}", format!("+ {text}").green()),
        };
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn diff_identical_files() {
        let result = diff("a\nb\n", "a\nb\n");
        assert_eq!(result, vec![DiffLine::Same("a"), DiffLine::Same("b")]);
        assert_eq!(format(&result, 2, false), "");
    }

    #[test]
    fn diff_against_missing_file() {
        let result = diff("", "set number\nsyntax on\n");
        assert_eq!(
            result,
            vec![DiffLine::Added("set number"), DiffLine::Added("syntax on")]
        );
    }

    #[test]
    fn diff_replaced_line() {
        let result = diff("a\nb\nc\n", "a\nB\nc\n");
        let expect = vec![
            DiffLine::Same("a"),
            DiffLine::Removed("b"),
            DiffLine::Added("B"),
            DiffLine::Same("c"),
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn format_marks_skipped_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9\n";
        let new = "1\nTWO\n3\n4\n5\n6\n7\n8\nNINE\n";
        let result = format(&diff(old, new), 1, false);
        let expect = indoc! {"
              1
            - 2
            + TWO
              3
            ...
              8
            - 9
            + NINE
        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn format_without_context() {
        let result = format(&diff("a\nb\nc\n", "a\nc\n"), 0, false);
        assert_eq!(result, "- b\n");
    }

    #[test]
    fn format_colors_changes_only() {
        let result = format(&diff("a\nb\n", "a\nc\n"), 1, true);
        assert!(result.starts_with("  a\n"));
        assert!(result.contains(&format!("{}", "- b".red())));
        assert!(result.contains(&format!("{}", "+ c".green())));
    }
}
