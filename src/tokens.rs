//! Deterministic token estimation.
//!
//! Estimates in order:
//! 1. tiktoken (OpenAI/GPT model names), padded by a safety margin
//! 2. Character estimate (3 chars ≈ 1 token)
//!
//! Both paths are deterministic and conservative: the estimate is an upper
//! bound on what the generator's real tokenizer will count, so a batch that
//! fits the estimate fits the model. Overcounting wastes a little batch
//! capacity; undercounting would overflow the generator's context, so the
//! margin leans high.

use std::fmt;

use tiktoken_rs::{CoreBPE, get_bpe_from_model};

/// Tokenizer profile for a generation model.
pub struct TokenBudgeter {
   model: String,
   bpe:   Option<CoreBPE>,
}

impl fmt::Debug for TokenBudgeter {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("TokenBudgeter")
         .field("model", &self.model)
         .field("has_bpe", &self.bpe.is_some())
         .finish_non_exhaustive()
   }
}

/// Safety margin applied on top of exact BPE counts: +1/16, rounded up.
/// Covers tokenizer drift between model revisions.
const BPE_MARGIN_DIVISOR: usize = 16;

/// Character heuristic for unknown models. English prose runs close to
/// 4 chars/token; 3 keeps the estimate on the high side.
const CHARS_PER_TOKEN: usize = 3;

impl TokenBudgeter {
   /// Create a budgeter for the given model name. Unknown models fall back
   /// to the character heuristic.
   pub fn for_model(model: &str) -> Self {
      Self { model: model.to_string(), bpe: get_bpe_from_model(model).ok() }
   }

   /// Estimate the token cost of a text.
   pub fn estimate(&self, text: &str) -> usize {
      if let Some(ref encoder) = self.bpe {
         let exact = encoder.encode_with_special_tokens(text).len();
         exact + exact.div_ceil(BPE_MARGIN_DIVISOR)
      } else {
         text.len().div_ceil(CHARS_PER_TOKEN)
      }
   }
}
