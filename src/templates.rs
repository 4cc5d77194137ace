//! Prompt template loading and rendering.
//!
//! Templates are embedded in the binary and unpacked to
//! `~/.llm-changelog/prompts/` on first run so users can override them.
//! User files take precedence over embedded ones.

use std::{
   path::{Path, PathBuf},
   sync::LazyLock,
};

use parking_lot::Mutex;
use rust_embed::RustEmbed;
use tera::{Context, Tera};

use crate::error::{ChangelogError, Result};

/// Embedded prompts folder (compiled into binary)
#[derive(RustEmbed)]
#[folder = "prompts/"]
struct Prompts;

/// Global Tera instance for template rendering (wrapped in Mutex for mutable
/// access)
static TERA: LazyLock<Mutex<Tera>> = LazyLock::new(|| {
   if let Err(e) = ensure_prompts_dir() {
      eprintln!("Warning: Failed to initialize prompts directory: {e}");
   }

   let mut tera = Tera::default();

   // Load templates from the user prompts directory first so they take
   // precedence.
   if let Some(prompts_dir) = get_user_prompts_dir()
      && let Err(e) = register_directory_templates(&mut tera, &prompts_dir.join("fragment"), "fragment")
   {
      eprintln!("Warning: {e}");
   }

   // Register embedded templates that aren't overridden by user files.
   for file in Prompts::iter() {
      if tera.get_template_names().any(|name| name == file.as_ref()) {
         continue;
      }

      if let Some(embedded_file) = Prompts::get(file.as_ref()) {
         match std::str::from_utf8(embedded_file.data.as_ref()) {
            Ok(content) => {
               if let Err(e) = tera.add_raw_template(file.as_ref(), content) {
                  eprintln!(
                     "Warning: Failed to register embedded template {}: {}",
                     file.as_ref(),
                     e
                  );
               }
            },
            Err(e) => {
               eprintln!("Warning: Embedded template {} is not valid UTF-8: {}", file.as_ref(), e);
            },
         }
      }
   }

   // Disable auto-escaping: prompts are plain markdown, not HTML
   tera.autoescape_on(vec![]);

   Mutex::new(tera)
});

/// Determine user prompts directory (~/.llm-changelog/prompts/) if a home dir
/// exists.
fn get_user_prompts_dir() -> Option<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .ok()
      .map(|home| PathBuf::from(home).join(".llm-changelog").join("prompts"))
}

/// Initialize prompts directory by unpacking embedded prompts if needed
pub fn ensure_prompts_dir() -> Result<()> {
   let Some(user_prompts_dir) = get_user_prompts_dir() else {
      // No HOME/USERPROFILE; fall back to the embedded prompts in-memory.
      return Ok(());
   };

   if !user_prompts_dir.exists() {
      std::fs::create_dir_all(&user_prompts_dir).map_err(|e| {
         ChangelogError::Other(format!(
            "Failed to create directory {}: {}",
            user_prompts_dir.display(),
            e
         ))
      })?;
   }

   // Unpack embedded prompts, updating if content differs
   for file in Prompts::iter() {
      let file_path = user_prompts_dir.join(file.as_ref());

      if let Some(parent) = file_path.parent() {
         std::fs::create_dir_all(parent).map_err(|e| {
            ChangelogError::Other(format!("Failed to create directory {}: {}", parent.display(), e))
         })?;
      }

      if let Some(embedded_file) = Prompts::get(file.as_ref()) {
         let embedded_content = embedded_file.data;

         let should_write = if file_path.exists() {
            match std::fs::read(&file_path) {
               Ok(existing_content) => existing_content != embedded_content.as_ref(),
               Err(_) => true,
            }
         } else {
            true
         };

         if should_write {
            std::fs::write(&file_path, embedded_content.as_ref()).map_err(|e| {
               ChangelogError::Other(format!("Failed to write file {}: {}", file_path.display(), e))
            })?;
         }
      }
   }

   Ok(())
}

fn register_directory_templates(tera: &mut Tera, directory: &Path, category: &str) -> Result<()> {
   if !directory.exists() {
      return Ok(());
   }

   let entries = std::fs::read_dir(directory).map_err(|e| {
      ChangelogError::Other(format!("Failed to read directory {}: {}", directory.display(), e))
   })?;

   for entry in entries.flatten() {
      let path = entry.path();
      if path.extension().is_none_or(|ext| ext != "md") {
         continue;
      }
      let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
         continue;
      };

      let content = std::fs::read_to_string(&path).map_err(|e| {
         ChangelogError::Other(format!("Failed to read template {}: {}", path.display(), e))
      })?;

      let name = format!("{category}/{stem}.md");
      tera
         .add_raw_template(&name, &content)
         .map_err(|e| ChangelogError::TemplateError(format!("{name}: {e}")))?;
   }

   Ok(())
}

/// Render the per-batch fragment prompt.
///
/// Falls back to the `default` variant when the requested one is missing.
pub fn render_fragment_prompt(
   variant: &str,
   project_name: &str,
   current_version: &str,
   commits: &str,
   user_context: Option<&str>,
) -> Result<String> {
   let mut context = Context::new();
   context.insert("project_name", project_name);
   context.insert("current_version", current_version);
   context.insert("commits", commits);
   context.insert("user_context", &user_context.unwrap_or_default());

   let tera = TERA.lock();
   let name = format!("fragment/{variant}.md");
   let name = if tera.get_template_names().any(|n| n == name) {
      name
   } else {
      "fragment/default.md".to_string()
   };

   tera
      .render(&name, &context)
      .map_err(|e| ChangelogError::TemplateError(format!("{name}: {e}")))
}
