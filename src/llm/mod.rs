//! LLM client abstractions and provider implementations.
//!
//! The rest of the crate depends only on the [`LLMClient`] trait and the typed
//! [`structured`] helper; dynamic schema validation happens here and nowhere
//! else.

pub mod anthropic;
pub mod client;
pub mod openai;

pub use client::{DefaultModelFactory, LLMClient, ModelFactory, Provider, TextStream};

use crate::types::{AppError, Result};
use schemars::{JsonSchema, SchemaGenerator};
use serde::de::DeserializeOwned;

/// Ask the model for a value conforming to `T`'s JSON schema.
///
/// This is the single place raw model output is turned into typed data. The
/// schema is derived from `T`, handed to the provider, and the response is
/// fence-stripped and deserialized before anything downstream sees it.
pub async fn structured<T>(client: &dyn LLMClient, system: &str, prompt: &str) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = SchemaGenerator::default().into_root_schema_for::<T>();
    let schema = serde_json::to_value(&schema)?;
    let value = client.generate_structured(system, prompt, &schema).await?;
    serde_json::from_value(value)
        .map_err(|e| AppError::LLM(format!("structured output did not match schema: {}", e)))
}

/// Strip a leading/trailing markdown code fence from model output.
///
/// Models wrap both JSON and HTML in fences regardless of instructions.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Pull the outermost JSON object out of free-form model output.
pub fn extract_json(content: &str) -> Result<serde_json::Value> {
    let cleaned = strip_code_fences(content);
    let candidate = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    };
    serde_json::from_str(candidate)
        .map_err(|e| AppError::LLM(format!("model did not return valid JSON: {}", e)))
}
