//! Batch splitting.
//!
//! Greedy bin-packing of the grouped commit stream into token-bounded
//! batches, preserving original order. A group is never split across
//! batches: the "same change reported once" guarantee outranks the budget,
//! so a single oversized group ships alone in a flagged batch.

use crate::{
   tokens::TokenBudgeter,
   types::{Batch, CommitGroup},
};

/// Pack groups into ordered batches within `budget` estimated tokens each.
///
/// Invariants: no batch is empty; concatenating all batches' groups in order
/// reconstructs the input; `oversized` is set only on single-group batches
/// whose own estimate exceeds the budget.
pub fn split_batches(
   groups: Vec<CommitGroup>,
   budget: usize,
   budgeter: &TokenBudgeter,
) -> Vec<Batch> {
   fn close_current(
      current: &mut Vec<CommitGroup>,
      current_tokens: &mut usize,
      batches: &mut Vec<Batch>,
   ) {
      if current.is_empty() {
         return;
      }
      batches.push(Batch {
         index:          batches.len(),
         groups:         std::mem::take(current),
         token_estimate: *current_tokens,
         oversized:      false,
      });
      *current_tokens = 0;
   }

   let mut batches: Vec<Batch> = Vec::new();
   let mut current: Vec<CommitGroup> = Vec::new();
   let mut current_tokens = 0usize;

   for group in groups {
      let group_tokens = budgeter.estimate(&group.prompt_text());

      // A group too large for any batch goes alone, flagged, never split
      if group_tokens > budget {
         close_current(&mut current, &mut current_tokens, &mut batches);
         batches.push(Batch {
            index:          batches.len(),
            groups:         vec![group],
            token_estimate: group_tokens,
            oversized:      true,
         });
         continue;
      }

      if current_tokens + group_tokens > budget {
         close_current(&mut current, &mut current_tokens, &mut batches);
      }

      current_tokens += group_tokens;
      current.push(group);
   }

   close_current(&mut current, &mut current_tokens, &mut batches);
   batches
}
