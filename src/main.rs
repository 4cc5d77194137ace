use std::path::Path;

use api::GeneratorContext;
use clap::Parser;
use config::ChangelogConfig;
use error::{ChangelogError, Result};
use llm_changelog::*;
use pipeline::run_pipeline;
use tokens::TokenBudgeter;
use types::{Args, resolve_model_name};

/// Apply CLI overrides to config
fn apply_cli_overrides(config: &mut ChangelogConfig, args: &Args) {
   if let Some(ref model) = args.model {
      config.model = resolve_model_name(model);
   }
   if let Some(temp) = args.temperature {
      if (0.0..=1.0).contains(&temp) {
         config.temperature = temp;
      } else {
         eprintln!(
            "Warning: Temperature {} out of range [0.0, 1.0], using default {}",
            temp, config.temperature
         );
      }
   }
   if let Some(budget) = args.budget {
      config.batch_token_budget = budget;
   }
   if let Some(ref file) = args.file {
      config.changelog_file = file.clone();
   }
}

/// Load config from args or default
fn load_config_from_args(args: &Args) -> Result<ChangelogConfig> {
   if let Some(ref config_path) = args.config {
      ChangelogConfig::from_file(config_path)
   } else {
      ChangelogConfig::load()
   }
}

fn main() -> Result<()> {
   dotenvy::dotenv().ok();

   let args = Args::parse();

   let mut config = load_config_from_args(&args)?;
   apply_cli_overrides(&mut config, &args);

   // Range start and current version both default to the latest tag
   let latest_tag = git::latest_tag(&args.dir);
   let from = args.from.clone().or_else(|| latest_tag.clone());
   let current_version = args
      .current_version
      .clone()
      .or(latest_tag)
      .ok_or_else(|| {
         ChangelogError::Other(
            "No version tags found; pass --current-version explicitly".to_string(),
         )
      })?;

   if from.is_none() {
      style::warn("No starting tag found, analyzing the full history");
   }

   let commits = git::collect_commits(from.as_deref(), &args.to, &args.dir)?;
   if commits.is_empty() {
      style::warn(&ChangelogError::EmptyCommitSet.to_string());
   } else {
      style::print_info(&format!(
         "Analyzing {} commits since {}",
         commits.len(),
         from.as_deref().unwrap_or("the beginning")
      ));
   }

   if !args.offline {
      println!("Using model: {} (temp: {})", style::model(&config.model), config.temperature);
   }

   let budgeter = TokenBudgeter::for_model(&config.model);
   let project = args
      .project
      .clone()
      .or_else(|| git::project_name(&args.dir))
      .unwrap_or_else(|| "this project".to_string());
   let user_context = if args.context.is_empty() {
      None
   } else {
      Some(args.context.join(" "))
   };

   let ctx = GeneratorContext {
      project_name:    &project,
      current_version: &current_version,
      user_context:    user_context.as_deref(),
   };

   let output = run_pipeline(&commits, &current_version, &config, &budgeter, |batch| {
      if args.offline {
         Ok(assemble::render_local_fragment(batch))
      } else {
         api::generate_fragment(batch, &ctx, &config)
      }
   })?;

   println!(
      "Version bump: {} ({})",
      style::bold(output.decision.bump_level.as_str()),
      style::dim(&output.decision.rationale)
   );
   println!(
      "Next version: {} {} {}",
      current_version,
      style::icons::ARROW,
      style::bold(&output.next_version)
   );

   for failure in &output.failures {
      style::warn(&format!("batch {} degraded: {}", failure.batch_index, failure.reason));
   }
   if !output.failures.is_empty() {
      style::warn(&format!(
         "document assembled from {} of {} batches",
         output.batch_count - output.failures.len(),
         output.batch_count
      ));
   }

   let block = changelog::render_document(&output.document, &output.next_version, &changelog::today());

   if args.dry_run || commits.is_empty() {
      println!("\n{block}");
      return Ok(());
   }

   let path = Path::new(&args.dir).join(&config.changelog_file);
   changelog::prepend_to_file(&block, &path)?;
   println!(
      "{} Prepended {} entries to {}",
      style::success(style::icons::SUCCESS),
      output.document.entry_count(),
      path.display()
   );

   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_apply_cli_overrides_model_alias() {
      let mut config = ChangelogConfig::default();
      let args = Args { model: Some("haiku".to_string()), ..Default::default() };
      apply_cli_overrides(&mut config, &args);
      assert_eq!(config.model, "claude-haiku-4-5");
   }

   #[test]
   fn test_apply_cli_overrides_temperature_in_range() {
      let mut config = ChangelogConfig::default();
      let args = Args { temperature: Some(0.7), ..Default::default() };
      apply_cli_overrides(&mut config, &args);
      assert_eq!(config.temperature, 0.7);
   }

   #[test]
   fn test_apply_cli_overrides_temperature_out_of_range_ignored() {
      let mut config = ChangelogConfig::default();
      let default_temp = config.temperature;
      let args = Args { temperature: Some(3.0), ..Default::default() };
      apply_cli_overrides(&mut config, &args);
      assert_eq!(config.temperature, default_temp);
   }

   #[test]
   fn test_apply_cli_overrides_budget_and_file() {
      let mut config = ChangelogConfig::default();
      let args = Args {
         budget: Some(4000),
         file: Some("HISTORY.md".to_string()),
         ..Default::default()
      };
      apply_cli_overrides(&mut config, &args);
      assert_eq!(config.batch_token_budget, 4000);
      assert_eq!(config.changelog_file, "HISTORY.md");
   }

   #[test]
   fn test_apply_cli_overrides_none_keeps_defaults() {
      let mut config = ChangelogConfig::default();
      let expected_model = config.model.clone();
      apply_cli_overrides(&mut config, &Args::default());
      assert_eq!(config.model, expected_model);
   }
}
