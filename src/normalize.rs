//! Commit normalization.
//!
//! Turns one raw commit record into exactly one [`NormalizedCommit`]. Never
//! fails: unparseable input degrades to `Category::Other` with the trimmed
//! first line as the summary.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::{
   classify::{classify, detect_component, parse_conventional_prefix},
   config::HeuristicTables,
   types::{NormalizedCommit, RawCommit},
};

/// Issue/PR reference patterns. All normalize to the `#123` form.
static REF_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
   vec![
      Regex::new(r"#(\d+)").expect("ref regex is valid"),
      Regex::new(r"(?i)\bGH-(\d+)\b").expect("ref regex is valid"),
      Regex::new(r"(?i)\b(?:pr|issue)\s+#?(\d+)\b").expect("ref regex is valid"),
   ]
});

/// Normalize Unicode punctuation AI-generated or pasted text tends to carry
/// (smart quotes, long dashes, ellipsis, invisible spaces) to plain ASCII.
pub fn normalize_unicode(text: &str) -> String {
   text
      .replace(['\u{2018}', '\u{2019}', '\u{201A}'], "'")
      .replace(['\u{201C}', '\u{201D}', '\u{201E}'], "\"")
      .replace(['\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}'], "-")
      .replace('\u{2026}', "...")
      .replace(['\u{00A0}', '\u{2009}', '\u{202F}'], " ")
      .replace(['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'], "")
      .nfkc()
      .collect()
}

/// Extract issue/PR identifiers from a commit message.
///
/// Absence of a match is not an error; the set may be empty.
pub fn extract_refs(text: &str) -> BTreeSet<String> {
   let mut refs = BTreeSet::new();
   for pattern in REF_PATTERNS.iter() {
      for caps in pattern.captures_iter(text) {
         refs.insert(format!("#{}", &caps[1]));
      }
   }
   refs
}

/// Collapse a subject line into a clean single-line summary.
fn clean_summary(line: &str) -> String {
   normalize_unicode(line)
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
}

/// Produce exactly one [`NormalizedCommit`] from a raw record. Total: every
/// input yields a commit with a non-null category.
pub fn normalize_commit(
   raw: &RawCommit,
   source_index: usize,
   tables: &HeuristicTables,
) -> NormalizedCommit {
   let (category, is_breaking) = classify(&raw.message, &raw.files_changed, tables);

   let first_line = raw.message.lines().next().unwrap_or_default();
   let (explicit_scope, subject) = match parse_conventional_prefix(first_line) {
      Some(prefix) => (prefix.scope, prefix.subject),
      None => (None, first_line.trim().to_string()),
   };

   // Explicit conventional scope wins; otherwise detect from changed paths
   let scope = explicit_scope.or_else(|| detect_component(&raw.files_changed, tables));

   NormalizedCommit {
      category,
      is_breaking,
      scope,
      summary: clean_summary(&subject),
      refs: extract_refs(&raw.message),
      source_index,
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::types::Category;

   fn tables() -> HeuristicTables {
      HeuristicTables::default()
   }

   fn raw(message: &str) -> RawCommit {
      RawCommit { message: message.to_string(), ..Default::default() }
   }

   #[test]
   fn test_extract_refs_hash_form() {
      let refs = extract_refs("fix crash (#12) and cleanup #7");
      assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec!["#12", "#7"]);
   }

   #[test]
   fn test_extract_refs_gh_and_issue_forms() {
      let refs = extract_refs("see GH-456, also closes issue 99");
      assert!(refs.contains("#456"));
      assert!(refs.contains("#99"));
   }

   #[test]
   fn test_extract_refs_empty() {
      assert!(extract_refs("nothing to see here").is_empty());
   }

   #[test]
   fn test_normalize_unicode_punctuation() {
      assert_eq!(normalize_unicode("\u{201C}quoted\u{201D} \u{2014} done\u{2026}"), "\"quoted\" - done...");
      assert_eq!(normalize_unicode("zero\u{200B}width"), "zerowidth");
   }

   #[test]
   fn test_normalize_conventional_commit() {
      let commit = normalize_commit(&raw("feat(auth): add OAuth login (#10)"), 3, &tables());
      assert_eq!(commit.category, Category::Feature);
      assert_eq!(commit.scope.as_deref(), Some("auth"));
      assert_eq!(commit.summary, "add OAuth login (#10)");
      assert!(commit.refs.contains("#10"));
      assert_eq!(commit.source_index, 3);
      assert!(!commit.is_breaking);
   }

   #[test]
   fn test_normalize_plain_commit_falls_back() {
      let commit = normalize_commit(&raw("Tuesday tweaks"), 0, &tables());
      assert_eq!(commit.category, Category::Other);
      assert!(!commit.is_breaking);
      assert_eq!(commit.summary, "Tuesday tweaks");
      assert!(commit.refs.is_empty());
   }

   #[test]
   fn test_normalize_never_fails_on_garbage() {
      for message in ["", "\n\n\n", ":::", "!(!)!:", "\u{200B}\u{200B}"] {
         let commit = normalize_commit(&raw(message), 0, &tables());
         // Category is always present; Other is the floor
         assert_eq!(commit.category, Category::Other);
      }
   }

   #[test]
   fn test_normalize_component_from_files() {
      let record = RawCommit {
         message:       "quick follow-up".to_string(),
         files_changed: vec!["src/auth/session.rs".to_string()],
         ..Default::default()
      };
      let commit = normalize_commit(&record, 0, &tables());
      assert_eq!(commit.scope.as_deref(), Some("auth"));
   }

   #[test]
   fn test_normalize_summary_collapses_whitespace() {
      let commit = normalize_commit(&raw("fix:   too\t many   spaces"), 0, &tables());
      assert_eq!(commit.summary, "too many spaces");
   }
}
