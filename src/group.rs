//! Commit grouping and deduplication.
//!
//! A single left-to-right pass over the normalized stream. Commits merge into
//! an existing group when their refs intersect, or when they share a scope and
//! their summaries overlap enough. First-occurrence order is preserved and
//! every commit lands in exactly one group.

use std::collections::HashMap;

use crate::{
   config::HeuristicTables,
   types::{Category, CommitGroup, NormalizedCommit},
};

/// Case-insensitive token-set overlap ratio (Jaccard) between two summaries.
pub fn summary_similarity(a: &str, b: &str) -> f32 {
   let tokens = |s: &str| -> std::collections::BTreeSet<String> {
      s.to_lowercase()
         .split(|c: char| !c.is_alphanumeric())
         .filter(|w| !w.is_empty())
         .map(ToString::to_string)
         .collect()
   };

   let left = tokens(a);
   let right = tokens(b);

   if left.is_empty() && right.is_empty() {
      return 1.0;
   }

   let intersection = left.intersection(&right).count();
   let union = left.union(&right).count();
   intersection as f32 / union as f32
}

/// True for chore/style commits whose summary matches the configured
/// trivial-pattern list.
pub fn is_trivial(commit: &NormalizedCommit, tables: &HeuristicTables) -> bool {
   if !matches!(commit.category, Category::Chore | Category::Style) {
      return false;
   }

   let summary = commit.summary.to_lowercase();
   tables
      .trivial_patterns
      .iter()
      .any(|pattern| summary.contains(&pattern.to_lowercase()))
}

/// Drop trivial commits from the stream.
///
/// Zero-content guard: if the filter would remove everything, the stream is
/// returned unfiltered so the run still has something to report.
fn filter_trivial(commits: Vec<NormalizedCommit>, tables: &HeuristicTables) -> Vec<NormalizedCommit> {
   let kept: Vec<NormalizedCommit> = commits
      .iter()
      .filter(|c| !is_trivial(c, tables))
      .cloned()
      .collect();

   if kept.is_empty() && !commits.is_empty() {
      return commits;
   }
   kept
}

/// Group the ordered normalized stream into ordered [`CommitGroup`]s.
///
/// O(n) on the happy path via a running `(scope, refs)` index; pairwise
/// summary comparison only happens between commits sharing a scope.
pub fn group_commits(
   commits: Vec<NormalizedCommit>,
   tables: &HeuristicTables,
   similarity_cutoff: f32,
) -> Vec<CommitGroup> {
   let commits = filter_trivial(commits, tables);

   let mut groups: Vec<CommitGroup> = Vec::new();
   let mut ref_index: HashMap<String, usize> = HashMap::new();
   let mut scope_index: HashMap<String, Vec<usize>> = HashMap::new();

   for commit in commits {
      // (a) shared refs join the earliest group that claimed one of them
      let mut target = commit
         .refs
         .iter()
         .find_map(|r| ref_index.get(r).copied());

      // (b) same scope + similar summary
      if target.is_none()
         && let Some(scope) = &commit.scope
         && let Some(candidates) = scope_index.get(scope)
      {
         target = candidates.iter().copied().find(|&idx| {
            summary_similarity(&groups[idx].representative().summary, &commit.summary)
               >= similarity_cutoff
         });
      }

      let idx = match target {
         Some(idx) => {
            groups[idx].members.push(commit.clone());
            idx
         },
         None => {
            let idx = groups.len();
            if let Some(scope) = &commit.scope {
               scope_index.entry(scope.clone()).or_default().push(idx);
            }
            groups.push(CommitGroup::new(commit.clone()));
            idx
         },
      };

      // Claim this commit's refs for the group it landed in (first claim wins)
      for r in &commit.refs {
         ref_index.entry(r.clone()).or_insert(idx);
      }
   }

   groups
}

#[cfg(test)]
mod tests {
   use std::collections::BTreeSet;

   use super::*;

   fn tables() -> HeuristicTables {
      HeuristicTables::default()
   }

   fn commit(
      index: usize,
      category: Category,
      scope: Option<&str>,
      summary: &str,
      refs: &[&str],
   ) -> NormalizedCommit {
      NormalizedCommit {
         category,
         is_breaking: false,
         scope: scope.map(ToString::to_string),
         summary: summary.to_string(),
         refs: refs.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
         source_index: index,
      }
   }

   #[test]
   fn test_summary_similarity_identical() {
      assert_eq!(summary_similarity("fixed the parser", "fixed the parser"), 1.0);
   }

   #[test]
   fn test_summary_similarity_disjoint() {
      assert_eq!(summary_similarity("alpha beta", "gamma delta"), 0.0);
   }

   #[test]
   fn test_summary_similarity_case_insensitive() {
      assert_eq!(summary_similarity("Fixed Parser", "fixed parser"), 1.0);
   }

   #[test]
   fn test_group_by_shared_refs() {
      let commits = vec![
         commit(0, Category::Fix, None, "fixed login crash", &["#12"]),
         commit(1, Category::Feature, None, "unrelated feature", &[]),
         commit(2, Category::Fix, None, "follow-up for login crash", &["#12"]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 2);
      assert_eq!(groups[0].members.len(), 2);
      assert_eq!(groups[0].members[1].source_index, 2);
   }

   #[test]
   fn test_group_by_scope_and_similarity() {
      let commits = vec![
         commit(0, Category::Fix, Some("auth"), "fixed token refresh logic", &[]),
         commit(1, Category::Fix, Some("auth"), "fixed token refresh logic again", &[]),
         commit(2, Category::Fix, Some("auth"), "completely different topic here", &[]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 2);
      assert_eq!(groups[0].members.len(), 2);
   }

   #[test]
   fn test_no_grouping_without_scope_or_refs() {
      let commits = vec![
         commit(0, Category::Fix, None, "fixed token refresh logic", &[]),
         commit(1, Category::Fix, None, "fixed token refresh logic again", &[]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 2);
   }

   #[test]
   fn test_first_occurrence_order_preserved() {
      let commits = vec![
         commit(0, Category::Chore, Some("deps"), "upgraded serde crate version", &[]),
         commit(1, Category::Feature, None, "added export command", &[]),
         commit(2, Category::Chore, Some("deps"), "upgraded serde crate version again", &[]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 2);
      assert_eq!(groups[0].representative().source_index, 0);
      assert_eq!(groups[1].representative().source_index, 1);
   }

   #[test]
   fn test_every_commit_in_exactly_one_group() {
      let commits: Vec<NormalizedCommit> = (0..20)
         .map(|i| {
            commit(
               i,
               if i % 2 == 0 { Category::Fix } else { Category::Feature },
               if i % 3 == 0 { Some("core") } else { None },
               &format!("change number {i}"),
               &[],
            )
         })
         .collect();
      let groups = group_commits(commits, &tables(), 0.6);

      let mut seen: Vec<usize> = groups
         .iter()
         .flat_map(|g| g.members.iter().map(|m| m.source_index))
         .collect();
      seen.sort_unstable();
      assert_eq!(seen, (0..20).collect::<Vec<_>>());
   }

   #[test]
   fn test_grouping_is_idempotent() {
      let commits = vec![
         commit(0, Category::Fix, Some("auth"), "fixed token refresh logic", &["#5"]),
         commit(1, Category::Fix, Some("auth"), "fixed token refresh logic more", &["#5"]),
         commit(2, Category::Feature, Some("cli"), "added verbose flag", &[]),
      ];
      let first = group_commits(commits, &tables(), 0.6);

      // Re-run on the representatives of the first pass
      let representatives: Vec<NormalizedCommit> =
         first.iter().map(|g| g.representative().clone()).collect();
      let second = group_commits(representatives.clone(), &tables(), 0.6);

      assert_eq!(second.len(), first.len());
      for (group, representative) in second.iter().zip(&representatives) {
         assert_eq!(group.members.len(), 1);
         assert_eq!(group.representative(), representative);
      }
   }

   #[test]
   fn test_trivial_commits_dropped() {
      let commits = vec![
         commit(0, Category::Feature, None, "added export command", &[]),
         commit(1, Category::Chore, None, "fix typo in comment", &[]),
         commit(2, Category::Style, None, "whitespace cleanup", &[]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 1);
      assert_eq!(groups[0].representative().source_index, 0);
   }

   #[test]
   fn test_trivial_filter_spares_fix_category() {
      // "typo" in the summary but category is Fix: not trivial
      let commits = vec![commit(0, Category::Fix, None, "fix typo breaking url parsing", &[])];
      let groups = group_commits(commits, &tables(), 0.6);
      assert_eq!(groups.len(), 1);
   }

   #[test]
   fn test_zero_content_guard_keeps_all_trivial_stream() {
      let commits = vec![
         commit(0, Category::Chore, None, "fix typo", &[]),
         commit(1, Category::Style, None, "formatting pass", &[]),
      ];
      let groups = group_commits(commits, &tables(), 0.6);
      // Filtering everything away would yield a zero-content changelog
      assert_eq!(groups.len(), 2);
   }
}
