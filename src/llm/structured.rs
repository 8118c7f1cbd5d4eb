//! Schema-constrained generation.
//!
//! A stage asks for a `T: StructuredOutput`; the model is told the JSON
//! schema both through `response_format` and in the system prompt, the reply
//! is checked by a [`SchemaValidator`] and only then deserialized.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    ChatMessage, ChatOptions, JsonSchemaFormat, LlmClient, LlmError, ResponseFormat,
};

/// A result shape that can be requested from a model.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema name sent to the provider.
    const NAME: &'static str;

    /// JSON schema the reply must satisfy.
    fn json_schema() -> Value;
}

/// Pluggable validation of a model reply against a JSON schema.
///
/// `name` identifies the schema (a [`StructuredOutput::NAME`]); a given name
/// always refers to the same schema, so implementations may cache by it.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, name: &str, schema: &Value, instance: &Value) -> Result<(), Vec<String>>;
}

/// Compiled schemas keyed by schema name, shared by every validator.
static COMPILED_SCHEMAS: OnceLock<RwLock<HashMap<String, Arc<JSONSchema>>>> = OnceLock::new();

/// Validator backed by the `jsonschema` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    fn compiled(name: &str, schema: &Value) -> Result<Arc<JSONSchema>, Vec<String>> {
        let cache = COMPILED_SCHEMAS.get_or_init(|| RwLock::new(HashMap::new()));
        if let Some(compiled) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(compiled));
        }

        let compiled = JSONSchema::compile(schema)
            .map(Arc::new)
            .map_err(|e| vec![format!("invalid schema {}: {}", name, e)])?;
        tracing::debug!(schema = name, "Compiled JSON schema");
        let mut cache = cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            cache.entry(name.to_string()).or_insert(compiled),
        ))
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, name: &str, schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
        let compiled = Self::compiled(name, schema)?;
        let result = compiled.validate(instance).map_err(|errors| {
            errors
                .map(|e| format!("{} (at '{}')", e, e.instance_path))
                .collect::<Vec<_>>()
        });
        result
    }
}

/// Pull the JSON object out of a model reply.
///
/// Models regularly wrap JSON in markdown fences or add a sentence before it.
pub fn extract_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&unfenced[start..=end])
}

/// Run one schema-constrained generation call.
///
/// Transport and HTTP failures come back with their original kind (so rate
/// limits stay distinguishable); unparsable replies are `ParseError` and
/// schema mismatches `SchemaViolation`.
pub async fn generate_structured<T: StructuredOutput>(
    llm: &dyn LlmClient,
    validator: &dyn SchemaValidator,
    model: &str,
    prompt: &str,
    temperature: f64,
) -> Result<T, LlmError> {
    let schema = T::json_schema();
    let system = format!(
        "You are a meticulous research assistant. Respond with ONLY a JSON object that \
         satisfies this JSON schema, with no other text:\n{}",
        schema
    );
    let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
    let options = ChatOptions {
        temperature: Some(temperature),
        max_tokens: None,
        response_format: Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: T::NAME.to_string(),
                strict: false,
                schema: schema.clone(),
            },
        }),
    };

    let response = llm.chat_completion(model, &messages, options).await?;
    let content = response
        .content
        .ok_or_else(|| LlmError::parse_error(format!("{}: empty response", T::NAME)))?;

    let json = extract_json(&content)
        .ok_or_else(|| LlmError::parse_error(format!("{}: no JSON object in reply", T::NAME)))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| LlmError::parse_error(format!("{}: {}", T::NAME, e)))?;

    if let Err(errors) = validator.validate(T::NAME, &schema, &value) {
        return Err(LlmError::schema_violation(format!(
            "{}: {}",
            T::NAME,
            errors.join("; ")
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| LlmError::schema_violation(format!("{}: {}", T::NAME, e)))
}
