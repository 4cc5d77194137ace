use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangelogError {
   #[error("Git command failed: {0}")]
   GitError(String),

   #[error("API request failed (HTTP {status}): {body}")]
   ApiError { status: u16, body: String },

   #[error("API call failed after {retries} retries: {source}")]
   ApiRetryExhausted {
      retries: u32,
      #[source]
      source:  Box<Self>,
   },

   #[error("Invalid version format: {input:?} (expected MAJOR.MINOR.PATCH, optionally prefixed)")]
   InvalidVersionFormat { input: String },

   #[error("Batch {batch_index} returned an unparseable fragment: {reason}")]
   FragmentParseFailure { batch_index: usize, reason: String },

   #[error("No commits found in the requested range; nothing to classify")]
   EmptyCommitSet,

   #[error("Template rendering failed: {0}")]
   TemplateError(String),

   #[error("Config error: {0}")]
   ConfigError(String),

   #[error("IO error: {0}")]
   IoError(#[from] std::io::Error),

   #[error("JSON error: {0}")]
   JsonError(#[from] serde_json::Error),

   #[error("HTTP error: {0}")]
   HttpError(#[from] reqwest::Error),

   #[error("{0}")]
   Other(String),
}

pub type Result<T> = std::result::Result<T, ChangelogError>;
