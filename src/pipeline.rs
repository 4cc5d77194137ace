//! End-to-end pipeline wiring.
//!
//! raw commits → normalize → group → split → generate (one call per batch,
//! dispatched over a bounded worker pool) → merge. The version decision runs
//! independently on the same classified stream. The generator is injected so
//! callers can swap the HTTP client for local rendering or a test double.

use rayon::prelude::*;

use crate::{
   assemble::{BatchOutcome, merge_fragments},
   batch::split_batches,
   config::ChangelogConfig,
   error::{ChangelogError, Result},
   group::group_commits,
   normalize::normalize_commit,
   tokens::TokenBudgeter,
   types::{Batch, BatchFailure, ChangelogDocument, NormalizedCommit, RawCommit, VersionDecision},
   version::{CurrentVersion, decide},
};

/// Everything a run produces besides side effects.
#[derive(Debug)]
pub struct PipelineOutput {
   pub document:     ChangelogDocument,
   pub decision:     VersionDecision,
   pub next_version: String,
   /// Batches that degraded to no content (generator or parse failure)
   pub failures: Vec<BatchFailure>,
   /// Indices of batches that exceeded the token budget as a single group
   pub oversized_batches: Vec<usize>,
   pub batch_count:       usize,
}

/// Run the full pipeline.
///
/// Fails only on an unparseable current version; everything downstream
/// degrades per unit (commit to `Other`, batch to a recorded failure) instead
/// of aborting.
pub fn run_pipeline<F>(
   raw_commits: &[RawCommit],
   current_version: &str,
   config: &ChangelogConfig,
   budgeter: &TokenBudgeter,
   generate: F,
) -> Result<PipelineOutput>
where
   F: Fn(&Batch) -> Result<String> + Sync,
{
   // Version parsing is the one thing we refuse to guess at, and the
   // document header needs it, so it goes first.
   let current = CurrentVersion::parse(current_version)?;

   let normalized: Vec<NormalizedCommit> = raw_commits
      .iter()
      .enumerate()
      .map(|(index, raw)| normalize_commit(raw, index, &config.tables))
      .collect();

   let decision = decide(&current, &normalized);
   let next_version = current.bumped(decision.bump_level);

   if normalized.is_empty() {
      return Ok(PipelineOutput {
         document: ChangelogDocument::default(),
         decision,
         next_version,
         failures: Vec::new(),
         oversized_batches: Vec::new(),
         batch_count: 0,
      });
   }

   let groups = group_commits(normalized, &config.tables, config.similarity_cutoff);

   let budget = config
      .batch_token_budget
      .saturating_sub(config.prompt_token_headroom)
      .max(1);
   let batches = split_batches(groups, budget, budgeter);

   let oversized_batches: Vec<usize> = batches
      .iter()
      .filter(|b| b.oversized)
      .map(|b| b.index)
      .collect();
   for index in &oversized_batches {
      crate::style::warn(&format!(
         "batch {index} exceeds the token budget as a single change group; sending anyway"
      ));
   }

   // Bounded worker pool; fragments may complete out of order, the merger
   // reorders by batch index.
   let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(config.max_parallel_requests.max(1))
      .build()
      .map_err(|e| ChangelogError::Other(format!("Failed to build worker pool: {e}")))?;

   let outcomes: Vec<BatchOutcome> = pool.install(|| {
      batches
         .par_iter()
         .map(|batch| (batch.index, generate(batch)))
         .collect()
   });

   let merged = merge_fragments(outcomes);

   Ok(PipelineOutput {
      document: merged.document,
      decision,
      next_version,
      failures: merged.failures,
      oversized_batches,
      batch_count: batches.len(),
   })
}
