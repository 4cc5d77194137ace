//! Document sink: rendering the assembled document and prepending it to the
//! changelog file.

use std::path::Path;

use chrono::Local;

use crate::{
   error::{ChangelogError, Result},
   types::ChangelogDocument,
};

/// Render the final document as a markdown release block:
/// `## [version] - date` followed by the section blocks in stored order.
pub fn render_document(document: &ChangelogDocument, next_version: &str, date: &str) -> String {
   let mut out = vec![format!("## [{next_version}] - {date}"), String::new()];

   if document.is_empty() {
      out.push("No notable changes.".to_string());
      out.push(String::new());
      return out.join("\n");
   }

   for (section, entries) in &document.sections {
      if entries.is_empty() {
         continue;
      }
      out.push(format!("### {section}"));
      out.push(String::new());
      for entry in entries {
         out.push(entry.clone());
      }
      out.push(String::new());
   }

   out.join("\n")
}

/// Today's date in changelog header format.
pub fn today() -> String {
   Local::now().format("%Y-%m-%d").to_string()
}

/// Prepend a release block to the changelog file, creating it when absent.
pub fn prepend_to_file(block: &str, path: &Path) -> Result<()> {
   let updated = if path.exists() {
      let existing = std::fs::read_to_string(path).map_err(|e| {
         ChangelogError::Other(format!("Failed to read {}: {}", path.display(), e))
      })?;
      format!("{}\n\n{}", block.trim_end(), existing)
   } else {
      format!("{}\n", block.trim_end())
   };

   std::fs::write(path, updated)
      .map_err(|e| ChangelogError::Other(format!("Failed to write {}: {}", path.display(), e)))?;
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::types::Section;

   #[test]
   fn test_render_document_sections_in_stored_order() {
      let mut document = ChangelogDocument::default();
      document
         .sections
         .insert(Section::Features, vec!["- Added export command (#10)".to_string()]);
      document
         .sections
         .insert(Section::Fixes, vec!["- Fixed crash on empty input".to_string()]);

      let rendered = render_document(&document, "v1.5.0", "2026-08-07");
      assert!(rendered.starts_with("## [v1.5.0] - 2026-08-07"));
      let features_at = rendered.find("### Features").unwrap();
      let fixes_at = rendered.find("### Fixes").unwrap();
      assert!(features_at < fixes_at);
      assert!(rendered.contains("- Added export command (#10)"));
   }

   #[test]
   fn test_render_document_empty() {
      let rendered = render_document(&ChangelogDocument::default(), "1.0.1", "2026-08-07");
      assert!(rendered.contains("No notable changes."));
   }

   #[test]
   fn test_prepend_to_file_roundtrip() {
      let dir = std::env::temp_dir().join("llm-changelog-test-prepend");
      let _ = std::fs::create_dir_all(&dir);
      let path = dir.join("CHANGELOG.md");
      let _ = std::fs::remove_file(&path);

      prepend_to_file("## [1.0.1] - 2026-08-07\n\n- first", &path).unwrap();
      prepend_to_file("## [1.1.0] - 2026-08-08\n\n- second", &path).unwrap();

      let content = std::fs::read_to_string(&path).unwrap();
      let newer = content.find("1.1.0").unwrap();
      let older = content.find("1.0.1").unwrap();
      assert!(newer < older);

      let _ = std::fs::remove_file(&path);
   }
}
