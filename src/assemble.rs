//! Assembly of generated fragments into the final document.
//!
//! Each batch's fragment arrives as markdown pre-segmented into `### Section`
//! blocks. The merger concatenates same-named sections in batch order,
//! de-duplicates entries whose normalized text is identical, drops sections
//! that end up empty, and orders the result by the fixed canonical priority.
//! One bad fragment degrades one batch, never the whole run.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::{
   error::{ChangelogError, Result},
   types::{Batch, BatchFailure, ChangelogDocument, Section},
};

/// Outcome of one generator call, tagged with the originating batch index so
/// merging can ignore completion order.
pub type BatchOutcome = (usize, Result<String>);

/// Result of merging all batch outcomes.
#[derive(Debug)]
pub struct MergeResult {
   pub document: ChangelogDocument,
   /// Batches whose fragment was missing or unparseable, in index order
   pub failures: Vec<BatchFailure>,
   /// Number of batches that contributed entries
   pub completed: usize,
}

/// Parse one generated fragment into section → entries.
///
/// Recognized headers map through [`Section::from_name`]; unrecognized prose
/// headers fall into `Changes` so generator spelling drift degrades
/// gracefully. A fragment with no usable section at all is a parse failure.
pub fn parse_fragment(batch_index: usize, text: &str) -> Result<IndexMap<Section, Vec<String>>> {
   let mut sections: IndexMap<Section, Vec<String>> = IndexMap::new();
   let mut current: Option<Section> = None;

   for line in text.lines() {
      let trimmed = line.trim();

      if let Some(name) = trimmed
         .strip_prefix("### ")
         .or_else(|| trimmed.strip_prefix("## "))
      {
         let name = name.trim();
         current = match Section::from_name(name) {
            Some(section) => Some(section),
            // Headers carrying digits are version/date lines, not sections
            None if name.chars().any(|c| c.is_ascii_digit()) => None,
            None => Some(Section::Changes),
         };
         if let Some(section) = current {
            sections.entry(section).or_default();
         }
         continue;
      }

      if let Some(section) = current
         && let Some(entry) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
      {
         let entry = entry.trim();
         if !entry.is_empty() {
            sections
               .entry(section)
               .or_default()
               .push(format!("- {entry}"));
         }
      }
   }

   sections.retain(|_, entries| !entries.is_empty());

   if sections.is_empty() {
      return Err(ChangelogError::FragmentParseFailure {
         batch_index,
         reason: "no recognizable sections or entries".to_string(),
      });
   }

   Ok(sections)
}

/// Normalize an entry for duplicate detection across batches.
fn entry_key(entry: &str) -> String {
   entry
      .trim_start_matches(['-', '*', ' '])
      .trim_end_matches('.')
      .to_lowercase()
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
}

/// Merge per-batch outcomes into the final document.
///
/// Outcomes may arrive in any order; merging always proceeds in batch-index
/// order. Failed batches are recorded and skipped.
pub fn merge_fragments(mut outcomes: Vec<BatchOutcome>) -> MergeResult {
   outcomes.sort_by_key(|(index, _)| *index);

   let mut collected: IndexMap<Section, Vec<String>> = IndexMap::new();
   let mut seen: IndexMap<Section, HashSet<String>> = IndexMap::new();
   let mut failures = Vec::new();
   let mut completed = 0usize;

   for (index, outcome) in outcomes {
      let parsed = outcome.and_then(|text| parse_fragment(index, &text));
      let sections = match parsed {
         Ok(sections) => sections,
         Err(e) => {
            failures.push(BatchFailure { batch_index: index, reason: e.to_string() });
            continue;
         },
      };

      completed += 1;
      for (section, entries) in sections {
         for entry in entries {
            let key = entry_key(&entry);
            if seen.entry(section).or_default().insert(key) {
               collected.entry(section).or_default().push(entry);
            }
         }
      }
   }

   // Canonical ordering, empty sections dropped
   let mut document = ChangelogDocument::default();
   for section in Section::render_order() {
      if let Some(entries) = collected.shift_remove(section)
         && !entries.is_empty()
      {
         document.sections.insert(*section, entries);
      }
   }

   MergeResult { document, failures, completed }
}

/// Render a batch's entries locally, without the generator.
///
/// Used in offline mode and as the deterministic shape the generator is asked
/// to imitate: one entry per group, breaking changes surfaced first.
pub fn render_local_fragment(batch: &Batch) -> String {
   let mut sections: IndexMap<Section, Vec<String>> = IndexMap::new();

   for group in &batch.groups {
      let section = if group.is_breaking() {
         Section::Breaking
      } else {
         group.category().section()
      };

      let mut entry = capitalize(&group.representative().summary);
      let refs = group.refs();
      if !refs.is_empty() {
         let listed = refs.iter().cloned().collect::<Vec<_>>().join(", ");
         if !entry.contains(&listed) {
            entry.push_str(&format!(" ({listed})"));
         }
      }
      sections.entry(section).or_default().push(entry);
   }

   let mut out = Vec::new();
   for section in Section::render_order() {
      if let Some(entries) = sections.get(section) {
         out.push(format!("### {section}"));
         for entry in entries {
            out.push(format!("- {entry}"));
         }
         out.push(String::new());
      }
   }
   out.join("\n")
}

fn capitalize(s: &str) -> String {
   let mut chars = s.chars();
   match chars.next() {
      Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
      None => String::new(),
   }
}
