//! Commit classification.
//!
//! Conventional-prefix parsing first, keyword-vocabulary scoring as the
//! fallback, path-pattern scope detection last. Pure functions of their
//! inputs so identical input always yields identical output.

use std::sync::LazyLock;

use regex::Regex;

use crate::{config::HeuristicTables, types::Category};

/// `type(scope)!: subject` on the first line of a commit message
static CONVENTIONAL_RE: LazyLock<Regex> = LazyLock::new(|| {
   Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^)]*)\))?(?P<breaking>!)?\s*:\s*(?P<subject>.+)$")
      .expect("conventional prefix regex is valid")
});

/// Parsed conventional-commit prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalPrefix {
   pub type_token: String,
   pub scope:      Option<String>,
   pub bang:       bool,
   pub subject:    String,
}

/// Parse the conventional prefix from a commit subject line, if present.
pub fn parse_conventional_prefix(first_line: &str) -> Option<ConventionalPrefix> {
   let caps = CONVENTIONAL_RE.captures(first_line.trim())?;
   let scope = caps
      .name("scope")
      .map(|m| m.as_str().trim().to_string())
      .filter(|s| !s.is_empty());
   Some(ConventionalPrefix {
      type_token: caps["type"].to_string(),
      scope,
      bang: caps.name("breaking").is_some(),
      subject: caps["subject"].trim().to_string(),
   })
}

/// Classify a commit message into a category and breaking flag.
///
/// A conventional prefix with a known type token wins outright; otherwise the
/// keyword vocabularies decide, with ties resolving to `Other`. Breaking is
/// detected independently of the category so it can dominate the version
/// decision regardless of type.
pub fn classify(text: &str, changed_files: &[String], tables: &HeuristicTables) -> (Category, bool) {
   let first_line = text.lines().next().unwrap_or_default();
   let is_breaking = detect_breaking(text, tables);

   if let Some(prefix) = parse_conventional_prefix(first_line) {
      let is_breaking = is_breaking || prefix.bang;
      if let Some(category) = Category::from_token(&prefix.type_token) {
         return (category, is_breaking);
      }
      // Known shape, unknown token: fall through to the heuristics
      return (fallback_category(text, changed_files, tables), is_breaking);
   }

   (fallback_category(text, changed_files, tables), is_breaking)
}

/// Detect breaking changes beyond the conventional `!` marker.
pub fn detect_breaking(text: &str, tables: &HeuristicTables) -> bool {
   if text.contains("BREAKING CHANGE") || text.contains("BREAKING-CHANGE") {
      return true;
   }

   let lower = text.to_lowercase();
   tables
      .breaking_indicators
      .iter()
      .any(|indicator| lower.contains(indicator.as_str()))
}

/// Keyword/phrase scoring against the category vocabularies.
///
/// Single-word terms match whole words only; multi-word phrases match as
/// substrings. A unique best score picks the category; a tie or an all-zero
/// result falls back to file-extension hints, then `Other`.
fn fallback_category(text: &str, changed_files: &[String], tables: &HeuristicTables) -> Category {
   let lower = text.to_lowercase();
   let words: Vec<&str> = lower
      .split(|c: char| !c.is_alphanumeric())
      .filter(|w| !w.is_empty())
      .collect();

   let mut best: Option<(Category, usize)> = None;
   let mut tied = false;

   for (category, terms) in &tables.vocabularies {
      let score = terms
         .iter()
         .filter(|term| {
            if term.contains(' ') {
               lower.contains(term.as_str())
            } else {
               words.contains(&term.as_str())
            }
         })
         .count();

      if score == 0 {
         continue;
      }
      match best {
         Some((_, best_score)) if score > best_score => {
            best = Some((*category, score));
            tied = false;
         },
         Some((_, best_score)) if score == best_score => tied = true,
         Some(_) => {},
         None => best = Some((*category, score)),
      }
   }

   match best {
      Some(_) if tied => Category::Other,
      Some((category, _)) => category,
      None => file_hint_category(changed_files).unwrap_or(Category::Other),
   }
}

/// Last-resort hints from the shape of the changed-file list.
fn file_hint_category(changed_files: &[String]) -> Option<Category> {
   if changed_files.is_empty() {
      return None;
   }

   let all_docs = changed_files.iter().all(|f| {
      let lower = f.to_lowercase();
      lower.ends_with(".md") || lower.ends_with(".rst") || lower.ends_with(".txt")
   });
   if all_docs {
      return Some(Category::Docs);
   }

   let all_tests = changed_files.iter().all(|f| {
      let lower = f.to_lowercase();
      lower.contains("test") || lower.contains("spec")
   });
   if all_tests {
      return Some(Category::Test);
   }

   let all_manifests = changed_files.iter().all(|f| {
      matches!(
         f.rsplit('/').next().unwrap_or(f),
         "Cargo.toml" | "Cargo.lock" | "package.json" | "package-lock.json" | "yarn.lock"
      )
   });
   if all_manifests {
      return Some(Category::Chore);
   }

   None
}

/// Detect the component touched by a commit from its changed-file paths.
///
/// Multiple matches yield the most specific (longest-pattern) match; ties
/// keep table order.
pub fn detect_component(changed_files: &[String], tables: &HeuristicTables) -> Option<String> {
   let lowered: Vec<String> = changed_files.iter().map(|f| f.to_lowercase()).collect();

   let mut best: Option<&crate::config::ComponentPattern> = None;
   for entry in &tables.components {
      let pattern = entry.pattern.to_lowercase();
      if lowered.iter().any(|f| f.contains(&pattern)) {
         let better = best.is_none_or(|b| entry.pattern.len() > b.pattern.len());
         if better {
            best = Some(entry);
         }
      }
   }

   best.map(|entry| entry.component.clone())
}

#[cfg(test)]
mod tests {
   use super::*;

   fn tables() -> HeuristicTables {
      HeuristicTables::default()
   }

   #[test]
   fn test_parse_conventional_prefix_full() {
      let prefix = parse_conventional_prefix("feat(auth)!: add oauth login").unwrap();
      assert_eq!(prefix.type_token, "feat");
      assert_eq!(prefix.scope.as_deref(), Some("auth"));
      assert!(prefix.bang);
      assert_eq!(prefix.subject, "add oauth login");
   }

   #[test]
   fn test_parse_conventional_prefix_no_scope() {
      let prefix = parse_conventional_prefix("fix: crash on empty input").unwrap();
      assert_eq!(prefix.type_token, "fix");
      assert_eq!(prefix.scope, None);
      assert!(!prefix.bang);
   }

   #[test]
   fn test_parse_conventional_prefix_rejects_plain_text() {
      assert!(parse_conventional_prefix("just a plain message").is_none());
      assert!(parse_conventional_prefix("").is_none());
   }

   #[test]
   fn test_classify_conventional_types() {
      let t = tables();
      assert_eq!(classify("feat: add thing", &[], &t), (Category::Feature, false));
      assert_eq!(classify("fix: broken thing", &[], &t), (Category::Fix, false));
      assert_eq!(classify("docs: explain thing", &[], &t), (Category::Docs, false));
   }

   #[test]
   fn test_classify_bang_sets_breaking() {
      let t = tables();
      assert_eq!(classify("feat!: drop old api", &[], &t), (Category::Feature, true));
      assert_eq!(classify("fix(core)!: reject bad input", &[], &t), (Category::Fix, true));
   }

   #[test]
   fn test_classify_breaking_change_footer() {
      let t = tables();
      let msg = "feat: new engine\n\nBREAKING CHANGE: old config format removed";
      assert_eq!(classify(msg, &[], &t), (Category::Feature, true));
   }

   #[test]
   fn test_classify_breaking_indicator_phrase() {
      let t = tables();
      let (_, breaking) = classify("removed legacy parser, drop support for v1 files", &[], &t);
      assert!(breaking);
   }

   #[test]
   fn test_classify_fallback_keywords() {
      let t = tables();
      assert_eq!(classify("implement retry loop for uploads", &[], &t).0, Category::Feature);
      assert_eq!(classify("resolve crash when list is empty", &[], &t).0, Category::Fix);
      assert_eq!(classify("optimize hot path in parser", &[], &t).0, Category::Performance);
   }

   #[test]
   fn test_classify_tie_resolves_to_other() {
      let t = tables();
      // One feature keyword ("add") and one fix keyword ("bug"): tied
      assert_eq!(classify("add note about bug", &[], &t).0, Category::Other);
   }

   #[test]
   fn test_classify_no_signal_is_other() {
      let t = tables();
      assert_eq!(classify("misc tweaks", &[], &t).0, Category::Other);
   }

   #[test]
   fn test_classify_file_hints() {
      let t = tables();
      let docs = vec!["README.md".to_string(), "docs/guide.md".to_string()];
      assert_eq!(classify("misc tweaks", &docs, &t).0, Category::Docs);

      let manifests = vec!["Cargo.lock".to_string()];
      assert_eq!(classify("weekly churn", &manifests, &t).0, Category::Chore);
   }

   #[test]
   fn test_classify_is_deterministic() {
      let t = tables();
      let files = vec!["src/api/server.rs".to_string()];
      let first = classify("update the api and fix the server bug", &files, &t);
      for _ in 0..10 {
         assert_eq!(classify("update the api and fix the server bug", &files, &t), first);
      }
   }

   #[test]
   fn test_detect_component_longest_pattern_wins() {
      let t = tables();
      // "migration" (9 chars) beats "db" (2 chars) on the same path
      let files = vec!["db/migration/0042_add_users.sql".to_string()];
      assert_eq!(detect_component(&files, &t).as_deref(), Some("database"));
   }

   #[test]
   fn test_detect_component_no_match() {
      let t = tables();
      let files = vec!["src/zzz.rs".to_string()];
      assert_eq!(detect_component(&files, &t), None);
   }

   #[test]
   fn test_detect_component_empty_files() {
      let t = tables();
      assert_eq!(detect_component(&[], &t), None);
   }
}
