//! Commit source: retrieval of raw commit records from the repository.
//!
//! Shells out to `git` like the rest of the tool's plumbing. Commits come
//! back oldest first so downstream ordering invariants hold without a sort.

use std::process::Command;

use chrono::DateTime;

use crate::{
   error::{ChangelogError, Result},
   types::RawCommit,
};

/// Record separator between commits in `git log` output
const RECORD_SEP: char = '\u{1e}';
/// Field separator within one commit record
const FIELD_SEP: char = '\u{1f}';

/// Most recent tag reachable from HEAD, if the repository has one.
pub fn latest_tag(dir: &str) -> Option<String> {
   let output = Command::new("git")
      .args(["describe", "--tags", "--abbrev=0"])
      .current_dir(dir)
      .output()
      .ok()?;

   if !output.status.success() {
      return None;
   }

   let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
   (!tag.is_empty()).then_some(tag)
}

/// Repository name for prompt context: basename of the working tree root.
pub fn project_name(dir: &str) -> Option<String> {
   let output = Command::new("git")
      .args(["rev-parse", "--show-toplevel"])
      .current_dir(dir)
      .output()
      .ok()?;

   if !output.status.success() {
      return None;
   }

   let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
   std::path::Path::new(&toplevel)
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
}

/// Collect raw commits for the range `from..to` (or all of `to`'s history
/// when `from` is absent), oldest first, merges excluded.
pub fn collect_commits(from: Option<&str>, to: &str, dir: &str) -> Result<Vec<RawCommit>> {
   let range = match from {
      Some(from) => format!("{from}..{to}"),
      None => to.to_string(),
   };

   // Author, date, and full body are delimited explicitly so multi-line
   // bodies survive; --name-only appends the changed paths after the final
   // field separator.
   let output = Command::new("git")
      .args([
         "log",
         "--no-merges",
         "--reverse",
         "--pretty=format:%x1e%an%x1f%aI%x1f%B%x1f",
         "--name-only",
         &range,
      ])
      .current_dir(dir)
      .output()
      .map_err(|e| ChangelogError::GitError(format!("Failed to run git log: {e}")))?;

   if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ChangelogError::GitError(format!("git log {range} failed: {stderr}")));
   }

   Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse delimiter-framed `git log` output into raw commit records.
fn parse_log(raw: &str) -> Vec<RawCommit> {
   raw
      .split(RECORD_SEP)
      .filter(|record| !record.trim().is_empty())
      .filter_map(|record| {
         let mut fields = record.splitn(4, FIELD_SEP);
         let author = fields.next()?.trim().to_string();
         let date = fields.next()?.trim().to_string();
         let message = fields.next()?.trim().to_string();
         let files_blob = fields.next().unwrap_or_default();

         let files_changed = files_blob
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();

         Some(RawCommit {
            message,
            author: (!author.is_empty()).then_some(author),
            timestamp: DateTime::parse_from_rfc3339(&date).ok(),
            files_changed,
         })
      })
      .collect()
}
