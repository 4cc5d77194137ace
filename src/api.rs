//! Generator-side HTTP client.
//!
//! One bounded prompt per batch against an OpenAI-compatible
//! `chat/completions` endpoint. Retry with exponential backoff lives here at
//! the collaborator boundary; per-batch failure tolerance is the merger's
//! job, not a retry.

use std::{thread, time::Duration};

use serde::Deserialize;

use crate::{
   config::ChangelogConfig,
   error::{ChangelogError, Result},
   templates,
   types::Batch,
};

/// System role content sent with every fragment request.
const SYSTEM_PROMPT: &str = "You are a technical writer specializing in software changelogs. \
                             You create clear, well-organized entries that help users \
                             understand what changed in a release, focusing on impact rather \
                             than implementation details.";

/// Running project/version context supplied with every generator call.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
   pub project_name:    &'a str,
   pub current_version: &'a str,
   pub user_context:    Option<&'a str>,
}

/// Build HTTP client with timeouts from config
fn build_client(config: &ChangelogConfig) -> reqwest::blocking::Client {
   reqwest::blocking::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .build()
      .expect("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
   choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
   message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
   #[serde(default)]
   content: Option<String>,
}

/// Retry an API call with exponential backoff.
///
/// The closure returns `(retry, result)`: `retry = true` requests another
/// attempt (server-side trouble), a hard error aborts immediately unless it
/// is transport-level.
pub fn retry_api_call<F, T>(config: &ChangelogConfig, mut f: F) -> Result<T>
where
   F: FnMut() -> Result<(bool, Option<T>)>,
{
   let mut attempt = 0;

   loop {
      attempt += 1;

      match f() {
         Ok((false, Some(result))) => return Ok(result),
         Ok((false, None)) => {
            return Err(ChangelogError::Other("API call returned no result".to_string()));
         },
         Ok((true, _)) => {
            if attempt >= config.max_retries {
               return Err(ChangelogError::ApiRetryExhausted {
                  retries: config.max_retries,
                  source:  Box::new(ChangelogError::Other(
                     "server kept failing after retries".to_string(),
                  )),
               });
            }
         },
         Err(e @ ChangelogError::HttpError(_)) => {
            if attempt >= config.max_retries {
               return Err(ChangelogError::ApiRetryExhausted {
                  retries: config.max_retries,
                  source:  Box::new(e),
               });
            }
            eprintln!("{}", crate::style::warning(&format!("Transport error, retrying: {e}")));
         },
         Err(e) => return Err(e),
      }

      let backoff_ms = config.initial_backoff_ms * (1 << (attempt - 1));
      thread::sleep(Duration::from_millis(backoff_ms));
   }
}

/// Generate the changelog fragment for one batch.
pub fn generate_fragment(
   batch: &Batch,
   ctx: &GeneratorContext<'_>,
   config: &ChangelogConfig,
) -> Result<String> {
   let prompt = templates::render_fragment_prompt(
      &config.fragment_prompt_variant,
      ctx.project_name,
      ctx.current_version,
      &batch.prompt_text(),
      ctx.user_context,
   )?;

   retry_api_call(config, || {
      let client = build_client(config);

      let request_body = serde_json::json!({
         "model": config.model,
         "max_tokens": 2000,
         "temperature": config.temperature,
         "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt.as_str() }
         ]
      });

      let mut request_builder = client
         .post(format!("{}/chat/completions", config.api_base_url))
         .header("content-type", "application/json");

      if let Some(api_key) = &config.api_key {
         request_builder = request_builder.header("Authorization", format!("Bearer {api_key}"));
      }

      let response = request_builder
         .json(&request_body)
         .send()
         .map_err(ChangelogError::HttpError)?;

      let status = response.status();

      if status.is_server_error() {
         let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
         eprintln!(
            "{}",
            crate::style::warning(&format!("Server error {status} on batch {}: {error_text}", batch.index))
         );
         return Ok((true, None)); // Retry
      }

      if !status.is_success() {
         let error_text = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
         return Err(ChangelogError::ApiError { status: status.as_u16(), body: error_text });
      }

      let api_response: ApiResponse = response.json().map_err(ChangelogError::HttpError)?;

      let content = api_response
         .choices
         .first()
         .and_then(|choice| choice.message.content.as_deref())
         .ok_or_else(|| ChangelogError::Other("No content in API response".to_string()))?;

      Ok((false, Some(extract_markdown_from_content(content))))
   })
}

/// Strip a wrapping code fence if the model fenced its markdown output.
fn extract_markdown_from_content(content: &str) -> String {
   let trimmed = content.trim();

   if let Some(rest) = trimmed.strip_prefix("```") {
      // Skip optional language identifier on the fence line
      let body_start = rest.find('\n').map_or(0, |i| i + 1);
      let body = &rest[body_start..];
      if let Some(end) = body.rfind("```") {
         return body[..end].trim().to_string();
      }
   }

   trimmed.to_string()
}
