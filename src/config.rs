use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
   error::{ChangelogError, Result},
   types::Category,
};

/// Path fragment to component-name mapping for scope detection.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentPattern {
   /// Fragment matched against changed-file paths (case-insensitive)
   pub pattern:   String,
   /// Component name reported as the commit scope
   pub component: String,
}

/// Immutable heuristic tables loaded once per run and passed explicitly into
/// classifier/grouper calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeuristicTables {
   /// Keyword vocabularies for fallback classification, keyed by category
   pub vocabularies: IndexMap<Category, Vec<String>>,

   /// Path-pattern to component-name table; longest matching pattern wins
   pub components: Vec<ComponentPattern>,

   /// Summary fragments marking chore/style commits as trivial
   pub trivial_patterns: Vec<String>,

   /// Phrases that flag a breaking change beyond explicit markers
   pub breaking_indicators: Vec<String>,
}

impl Default for HeuristicTables {
   fn default() -> Self {
      let mut vocabularies = IndexMap::new();
      vocabularies.insert(Category::Feature, str_vec(&[
         "add", "implement", "create", "introduce", "support",
      ]));
      vocabularies.insert(Category::Fix, str_vec(&[
         "fix", "resolve", "correct", "patch", "bug", "crash",
      ]));
      vocabularies.insert(Category::Docs, str_vec(&[
         "docs", "readme", "guide", "tutorial", "documentation",
      ]));
      vocabularies.insert(Category::Performance, str_vec(&[
         "perf", "performance", "optimize", "speed up", "faster",
      ]));
      vocabularies.insert(Category::Refactor, str_vec(&[
         "refactor", "restructure", "reorganize", "rework", "simplify",
      ]));
      vocabularies.insert(Category::Test, str_vec(&["test", "spec", "coverage"]));
      vocabularies.insert(Category::Build, str_vec(&[
         "build", "compile", "bundle", "deploy", "pipeline",
      ]));
      vocabularies.insert(Category::Style, str_vec(&[
         "format", "lint", "whitespace", "prettier",
      ]));
      vocabularies.insert(Category::Chore, str_vec(&[
         "chore", "bump", "dependency", "dependencies", "upgrade",
      ]));

      Self {
         vocabularies,
         components: vec![
            component("ui", "frontend"),
            component("frontend", "frontend"),
            component("client", "frontend"),
            component("api", "api"),
            component("server", "backend"),
            component("backend", "backend"),
            component("db", "database"),
            component("database", "database"),
            component("migration", "database"),
            component("schema", "database"),
            component("auth", "auth"),
            component("login", "auth"),
            component("config", "config"),
            component("docs/", "docs"),
            component("readme", "docs"),
            component("test", "test"),
            component(".github/", "ci"),
            component("Cargo.toml", "deps"),
            component("package.json", "deps"),
         ],
         trivial_patterns: str_vec(&[
            "fix typo",
            "typo",
            "update readme",
            "bump version",
            "update dependencies",
            "update deps",
            "formatting",
            "whitespace",
            "lint",
         ]),
         breaking_indicators: str_vec(&[
            "breaking change",
            "breaking-change",
            "backward incompatible",
            "backwards incompatible",
            "backward-incompatible",
            "drop support",
            "drops support",
            "removed support",
         ]),
      }
   }
}

fn str_vec(items: &[&str]) -> Vec<String> {
   items.iter().map(ToString::to_string).collect()
}

fn component(pattern: &str, name: &str) -> ComponentPattern {
   ComponentPattern { pattern: pattern.to_string(), component: name.to_string() }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChangelogConfig {
   pub api_base_url: String,

   /// Optional API key for authentication (overridden by
   /// `LLM_CHANGELOG_API_KEY` env var)
   pub api_key: Option<String>,

   /// HTTP request timeout in seconds
   pub request_timeout_secs: u64,

   /// HTTP connection timeout in seconds
   pub connect_timeout_secs: u64,

   pub model:              String,
   pub temperature:        f32,
   pub max_retries:        u32,
   pub initial_backoff_ms: u64,

   /// Token budget per generation batch
   pub batch_token_budget: usize,

   /// Tokens reserved per batch for the prompt template around the commits
   pub prompt_token_headroom: usize,

   /// Upper bound on concurrent generator calls
   pub max_parallel_requests: usize,

   /// Summary-similarity cutoff for grouping same-scope commits (token-set
   /// overlap ratio)
   pub similarity_cutoff: f32,

   /// Changelog file the final document is prepended to
   pub changelog_file: String,

   /// Prompt variant for fragment generation (e.g., "default")
   #[serde(default = "default_fragment_prompt_variant")]
   pub fragment_prompt_variant: String,

   /// Heuristic tables for classification, grouping, and scope detection
   pub tables: HeuristicTables,
}

fn default_fragment_prompt_variant() -> String {
   "default".to_string()
}

impl Default for ChangelogConfig {
   fn default() -> Self {
      Self {
         api_base_url:            "http://localhost:4000".to_string(),
         api_key:                 None,
         request_timeout_secs:    120,
         connect_timeout_secs:    30,
         model:                   "claude-sonnet-4.5".to_string(),
         temperature:             0.3, // Low temperature for consistent changelog prose
         max_retries:             3,
         initial_backoff_ms:      1000,
         batch_token_budget:      8000,
         prompt_token_headroom:   256,
         max_parallel_requests:   4,
         similarity_cutoff:       0.6,
         changelog_file:          "CHANGELOG.md".to_string(),
         fragment_prompt_variant: default_fragment_prompt_variant(),
         tables:                  HeuristicTables::default(),
      }
   }
}

impl ChangelogConfig {
   /// Load config from default location
   /// (~/.config/llm-changelog/config.toml). Falls back to Default if the
   /// file doesn't exist. Environment variables override config file values:
   /// - `LLM_CHANGELOG_API_URL` overrides `api_base_url`
   /// - `LLM_CHANGELOG_API_KEY` overrides `api_key`
   pub fn load() -> Result<Self> {
      let config_path = if let Ok(custom_path) = std::env::var("LLM_CHANGELOG_CONFIG") {
         PathBuf::from(custom_path)
      } else {
         Self::default_config_path().unwrap_or_else(|_| PathBuf::new())
      };

      let mut config = if config_path.exists() {
         Self::from_file(&config_path)?
      } else {
         Self::default()
      };

      Self::apply_env_overrides(&mut config);

      crate::templates::ensure_prompts_dir()?;
      Ok(config)
   }

   /// Load config from specific file
   pub fn from_file(path: &Path) -> Result<Self> {
      let contents = std::fs::read_to_string(path)
         .map_err(|e| ChangelogError::ConfigError(format!("Failed to read config: {e}")))?;
      let mut config: Self = toml::from_str(&contents)
         .map_err(|e| ChangelogError::ConfigError(format!("Failed to parse config: {e}")))?;

      Self::apply_env_overrides(&mut config);

      crate::templates::ensure_prompts_dir()?;
      Ok(config)
   }

   /// Apply environment variable overrides to config
   fn apply_env_overrides(config: &mut Self) {
      if let Ok(api_url) = std::env::var("LLM_CHANGELOG_API_URL") {
         config.api_base_url = api_url;
      }

      if let Ok(api_key) = std::env::var("LLM_CHANGELOG_API_KEY") {
         config.api_key = Some(api_key);
      }
   }

   /// Get default config path (platform-safe)
   /// Tries HOME (Unix/Linux/macOS) then USERPROFILE (Windows)
   pub fn default_config_path() -> Result<PathBuf> {
      if let Ok(home) = std::env::var("HOME") {
         return Ok(PathBuf::from(home).join(".config/llm-changelog/config.toml"));
      }

      if let Ok(home) = std::env::var("USERPROFILE") {
         return Ok(PathBuf::from(home).join(".config/llm-changelog/config.toml"));
      }

      Err(ChangelogError::ConfigError(
         "No home directory found (tried HOME and USERPROFILE)".to_string(),
      ))
   }
}
