use std::{collections::BTreeSet, fmt, path::PathBuf};

use chrono::{DateTime, FixedOffset};
use clap::Parser;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// === Commit records ===

/// Raw commit record as retrieved from the repository.
///
/// Opaque message text plus optional metadata; produced once by the commit
/// source and consumed by the normalizer.
#[derive(Debug, Clone, Default)]
pub struct RawCommit {
   /// Full commit message (subject + body)
   pub message:       String,
   /// Author name, when available
   pub author:        Option<String>,
   /// Author date, when available
   pub timestamp:     Option<DateTime<FixedOffset>>,
   /// Paths touched by this commit
   pub files_changed: Vec<String>,
}

/// Commit category assigned by the classifier.
///
/// Never absent: unclassifiable commits map to `Other`, not to a missing
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
   Feature,
   Fix,
   Docs,
   Refactor,
   Performance,
   Test,
   Build,
   Chore,
   Style,
   Other,
}

impl Category {
   /// Conventional-commit token for this category
   pub const fn token(&self) -> &'static str {
      match self {
         Self::Feature => "feat",
         Self::Fix => "fix",
         Self::Docs => "docs",
         Self::Refactor => "refactor",
         Self::Performance => "perf",
         Self::Test => "test",
         Self::Build => "build",
         Self::Chore => "chore",
         Self::Style => "style",
         Self::Other => "other",
      }
   }

   /// Parse a conventional-commit type token (case-insensitive).
   /// Unknown tokens yield `None` so callers can fall back to heuristics.
   pub fn from_token(token: &str) -> Option<Self> {
      match token.to_lowercase().as_str() {
         "feat" | "feature" => Some(Self::Feature),
         "fix" | "bugfix" | "hotfix" => Some(Self::Fix),
         "docs" | "doc" => Some(Self::Docs),
         "refactor" => Some(Self::Refactor),
         "perf" | "performance" => Some(Self::Performance),
         "test" | "tests" => Some(Self::Test),
         "build" | "ci" => Some(Self::Build),
         "chore" | "deps" | "revert" => Some(Self::Chore),
         "style" => Some(Self::Style),
         _ => None,
      }
   }

   /// Changelog section this category lands in when rendering locally
   pub const fn section(&self) -> Section {
      match self {
         Self::Feature => Section::Features,
         Self::Fix => Section::Fixes,
         Self::Docs => Section::Documentation,
         Self::Refactor | Self::Performance | Self::Other => Section::Changes,
         Self::Test | Self::Build | Self::Chore | Self::Style => Section::Maintenance,
      }
   }
}

impl fmt::Display for Category {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self.token())
   }
}

/// Commit after normalization and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommit {
   /// Assigned category, never absent
   pub category:     Category,
   /// Breaking-change flag (explicit marker or detected indicator)
   pub is_breaking:  bool,
   /// Component name detected from changed paths, when any
   pub scope:        Option<String>,
   /// Cleaned one-line description
   pub summary:      String,
   /// Issue/PR references extracted from the message (`#123` form)
   pub refs:         BTreeSet<String>,
   /// Position in the original commit ordering
   pub source_index: usize,
}

impl NormalizedCommit {
   /// Render the single-line form fed to the generator and token budgeter:
   /// `type(scope)!: summary (#refs)`
   pub fn prompt_line(&self) -> String {
      let scope_part = self
         .scope
         .as_ref()
         .map(|s| format!("({s})"))
         .unwrap_or_default();
      let bang = if self.is_breaking { "!" } else { "" };
      let refs_part = if self.refs.is_empty() {
         String::new()
      } else {
         format!(" ({})", self.refs.iter().cloned().collect::<Vec<_>>().join(", "))
      };
      format!("{}{scope_part}{bang}: {}{refs_part}", self.category, self.summary)
   }
}

/// Non-empty ordered set of commits describing the same change.
///
/// Owned by the assembly pass; every normalized commit belongs to exactly one
/// group.
#[derive(Debug, Clone)]
pub struct CommitGroup {
   pub members: Vec<NormalizedCommit>,
}

impl CommitGroup {
   pub fn new(first: NormalizedCommit) -> Self {
      Self { members: vec![first] }
   }

   /// Earliest member; defines the group's ordering position and summary.
   pub fn representative(&self) -> &NormalizedCommit {
      &self.members[0]
   }

   /// Highest-severity category across members (breaking flag aside):
   /// feature dominates fix dominates the rest.
   pub fn category(&self) -> Category {
      let mut category = self.representative().category;
      for member in &self.members[1..] {
         category = match (category, member.category) {
            (Category::Feature, _) | (_, Category::Feature) => Category::Feature,
            (Category::Fix, _) | (_, Category::Fix) => Category::Fix,
            (current, _) => current,
         };
      }
      category
   }

   /// True if any member is a breaking change
   pub fn is_breaking(&self) -> bool {
      self.members.iter().any(|m| m.is_breaking)
   }

   /// Union of member refs
   pub fn refs(&self) -> BTreeSet<String> {
      self
         .members
         .iter()
         .flat_map(|m| m.refs.iter().cloned())
         .collect()
   }

   /// Render the group for prompting: the representative line, with related
   /// commits indented below so the generator can fold them into one entry.
   pub fn prompt_text(&self) -> String {
      let mut lines = vec![self.representative().prompt_line()];
      for member in &self.members[1..] {
         lines.push(format!("  related: {}", member.prompt_line()));
      }
      lines.join("\n")
   }
}

/// Token-bounded slice of the grouped commit stream.
///
/// Batch order concatenated reconstructs the original commit ordering; a
/// single group never spans two batches.
#[derive(Debug, Clone)]
pub struct Batch {
   /// Position in dispatch/merge order
   pub index:          usize,
   pub groups:         Vec<CommitGroup>,
   /// Estimated token cost of `prompt_text()` for all groups
   pub token_estimate: usize,
   /// Set when a single group alone exceeded the budget; the batch ships
   /// anyway rather than splitting the group
   pub oversized:      bool,
}

impl Batch {
   /// Concatenated prompt text for all groups in this batch
   pub fn prompt_text(&self) -> String {
      self
         .groups
         .iter()
         .map(|g| g.prompt_text())
         .collect::<Vec<_>>()
         .join("\n")
   }
}

// === Version decision ===

/// Semantic-version field to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BumpLevel {
   Patch,
   Minor,
   Major,
}

impl BumpLevel {
   pub const fn as_str(&self) -> &'static str {
      match self {
         Self::Major => "major",
         Self::Minor => "minor",
         Self::Patch => "patch",
      }
   }
}

impl fmt::Display for BumpLevel {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self.as_str())
   }
}

/// Outcome of the version decision engine; recomputed per run, never
/// persisted.
#[derive(Debug, Clone)]
pub struct VersionDecision {
   pub bump_level: BumpLevel,
   pub rationale:  String,
}

// === Changelog document ===

/// Changelog section in canonical priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
   Breaking,
   Features,
   Fixes,
   Changes,
   Removals,
   Deprecations,
   Documentation,
   Maintenance,
}

impl Section {
   /// Display name for section headers
   pub const fn as_str(&self) -> &'static str {
      match self {
         Self::Breaking => "Breaking Changes",
         Self::Features => "Features",
         Self::Fixes => "Fixes",
         Self::Changes => "Changes",
         Self::Removals => "Removals",
         Self::Deprecations => "Deprecations",
         Self::Documentation => "Documentation",
         Self::Maintenance => "Maintenance",
      }
   }

   /// Parse a section header (case-insensitive), tolerating the spelling
   /// variants generators tend to produce. Unknown names yield `None`.
   pub fn from_name(name: &str) -> Option<Self> {
      match name.trim().to_lowercase().as_str() {
         "breaking" | "breaking changes" => Some(Self::Breaking),
         "features" | "feature" | "added" | "new features" => Some(Self::Features),
         "fixes" | "bug fixes" | "fixed" => Some(Self::Fixes),
         "changes" | "changed" | "improvements" => Some(Self::Changes),
         "removals" | "removed" => Some(Self::Removals),
         "deprecations" | "deprecated" => Some(Self::Deprecations),
         "documentation" | "docs" => Some(Self::Documentation),
         "maintenance" | "chores" | "internal" | "housekeeping" => Some(Self::Maintenance),
         _ => None,
      }
   }

   /// Fixed rendering priority: breaking changes first, maintenance last.
   pub const fn render_order() -> &'static [Self] {
      &[
         Self::Breaking,
         Self::Features,
         Self::Fixes,
         Self::Changes,
         Self::Removals,
         Self::Deprecations,
         Self::Documentation,
         Self::Maintenance,
      ]
   }
}

impl fmt::Display for Section {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self.as_str())
   }
}

/// Final assembled document: section name to ordered entries.
///
/// Created empty at run start, mutated only by the assembly merger,
/// immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct ChangelogDocument {
   pub sections: IndexMap<Section, Vec<String>>,
}

impl ChangelogDocument {
   pub fn is_empty(&self) -> bool {
      self.sections.values().all(|entries| entries.is_empty())
   }

   pub fn entry_count(&self) -> usize {
      self.sections.values().map(|entries| entries.len()).sum()
   }
}

/// Record of a batch whose generated fragment could not be used.
#[derive(Debug, Clone)]
pub struct BatchFailure {
   pub batch_index: usize,
   pub reason:      String,
}

// === CLI ===

/// Resolve model name from short aliases to full model names
pub fn resolve_model_name(name: &str) -> String {
   match name {
      // Claude short names
      "sonnet" | "s" => "claude-sonnet-4.5",
      "opus" | "o" => "claude-opus-4.5",
      "haiku" | "h" => "claude-haiku-4-5",

      // GPT short names
      "gpt5" | "g5" => "gpt-5",
      "gpt5-mini" => "gpt-5-mini",
      "gpt4o" => "gpt-4o",
      "gpt4o-mini" => "gpt-4o-mini",

      // Gemini short names
      "gemini" => "gemini-2.5-pro",
      "flash" => "gemini-2.5-flash",

      // Otherwise pass through as-is (allows full model names)
      _ => name,
   }
   .to_string()
}

#[derive(Parser, Debug, Default)]
#[command(name = "lchangelog", version, about = "Generate a versioned changelog from commit history")]
pub struct Args {
   /// Starting ref, exclusive (defaults to the latest tag)
   #[arg(long)]
   pub from: Option<String>,

   /// Ending ref, inclusive
   #[arg(long, default_value = "HEAD")]
   pub to: String,

   /// Current version (defaults to the latest tag name)
   #[arg(long)]
   pub current_version: Option<String>,

   /// Preview without writing the changelog file
   #[arg(long)]
   pub dry_run: bool,

   /// Render entries locally without calling the generator
   #[arg(long)]
   pub offline: bool,

   /// Directory to run git commands in
   #[arg(long, default_value = ".")]
   pub dir: String,

   /// Model for generation. Use short names (sonnet/haiku/gpt4o) or full
   /// model names.
   #[arg(long, short = 'm')]
   pub model: Option<String>,

   /// Temperature for API calls (0.0-1.0)
   #[arg(long, short = 't')]
   pub temperature: Option<f32>,

   /// Token budget per generation batch
   #[arg(long)]
   pub budget: Option<usize>,

   /// Changelog file to prepend to (default: CHANGELOG.md)
   #[arg(long)]
   pub file: Option<String>,

   /// Project name shown to the generator (defaults to the repo directory
   /// name)
   #[arg(long)]
   pub project: Option<String>,

   /// Path to config file (default: ~/.config/llm-changelog/config.toml)
   #[arg(long)]
   pub config: Option<PathBuf>,

   /// Additional context to provide to the generator (all trailing non-flag
   /// text)
   #[arg(trailing_var_arg = true)]
   pub context: Vec<String>,
}

#[cfg(test)]
mod tests {
   use super::*;

   fn commit(category: Category, summary: &str) -> NormalizedCommit {
      NormalizedCommit {
         category,
         is_breaking: false,
         scope: None,
         summary: summary.to_string(),
         refs: BTreeSet::new(),
         source_index: 0,
      }
   }

   #[test]
   fn test_category_from_token() {
      assert_eq!(Category::from_token("feat"), Some(Category::Feature));
      assert_eq!(Category::from_token("Fix"), Some(Category::Fix));
      assert_eq!(Category::from_token("PERF"), Some(Category::Performance));
      assert_eq!(Category::from_token("wibble"), None);
   }

   #[test]
   fn test_prompt_line_full() {
      let mut c = commit(Category::Feature, "added oauth login");
      c.scope = Some("auth".to_string());
      c.is_breaking = true;
      c.refs.insert("#10".to_string());
      assert_eq!(c.prompt_line(), "feat(auth)!: added oauth login (#10)");
   }

   #[test]
   fn test_prompt_line_minimal() {
      let c = commit(Category::Other, "something happened");
      assert_eq!(c.prompt_line(), "other: something happened");
   }

   #[test]
   fn test_group_category_feature_dominates() {
      let mut group = CommitGroup::new(commit(Category::Fix, "fixed crash"));
      group.members.push(commit(Category::Feature, "added flag"));
      assert_eq!(group.category(), Category::Feature);
   }

   #[test]
   fn test_group_prompt_text_related_lines() {
      let mut group = CommitGroup::new(commit(Category::Fix, "fixed crash"));
      group.members.push(commit(Category::Fix, "fixed crash again"));
      let text = group.prompt_text();
      assert!(text.starts_with("fix: fixed crash"));
      assert!(text.contains("  related: fix: fixed crash again"));
   }

   #[test]
   fn test_section_from_name_aliases() {
      assert_eq!(Section::from_name("Bug Fixes"), Some(Section::Fixes));
      assert_eq!(Section::from_name("ADDED"), Some(Section::Features));
      assert_eq!(Section::from_name("breaking changes"), Some(Section::Breaking));
      assert_eq!(Section::from_name("nonsense"), None);
   }

   #[test]
   fn test_section_render_order_starts_with_breaking() {
      assert_eq!(Section::render_order()[0], Section::Breaking);
      assert_eq!(Section::render_order().len(), 8);
   }

   #[test]
   fn test_bump_level_ordering() {
      assert!(BumpLevel::Major > BumpLevel::Minor);
      assert!(BumpLevel::Minor > BumpLevel::Patch);
   }

   #[test]
   fn test_document_empty() {
      let mut doc = ChangelogDocument::default();
      assert!(doc.is_empty());
      doc.sections.insert(Section::Fixes, vec!["- fixed crash".to_string()]);
      assert!(!doc.is_empty());
      assert_eq!(doc.entry_count(), 1);
   }
}
