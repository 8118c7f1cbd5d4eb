//! Model access shared by every pipeline stage.

use std::sync::Arc;

use crate::config::ModelProfiles;
use crate::llm::{
    generate_structured, JsonSchemaValidator, LlmClient, LlmError, SchemaValidator,
    StructuredOutput,
};

/// Which configured model a call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// Fast and cheap, fails more often.
    Primary,
    /// Slower and pricier, more reliable.
    Fallback,
}

impl ModelProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProfile::Primary => "primary",
            ModelProfile::Fallback => "fallback",
        }
    }
}

/// Structured generation against the primary or fallback model.
///
/// Cheap to clone; stages hold their own copy.
#[derive(Clone)]
pub struct ModelProvider {
    llm: Arc<dyn LlmClient>,
    validator: Arc<dyn SchemaValidator>,
    profiles: ModelProfiles,
}

impl ModelProvider {
    pub fn new(llm: Arc<dyn LlmClient>, profiles: ModelProfiles) -> Self {
        Self {
            llm,
            validator: Arc::new(JsonSchemaValidator),
            profiles,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn model(&self, profile: ModelProfile) -> &str {
        match profile {
            ModelProfile::Primary => &self.profiles.primary,
            ModelProfile::Fallback => &self.profiles.fallback,
        }
    }

    /// One schema-constrained call. Retry and fallback are up to the caller.
    pub async fn generate<T: StructuredOutput>(
        &self,
        profile: ModelProfile,
        prompt: &str,
        temperature: f64,
    ) -> Result<T, LlmError> {
        let model = self.model(profile);
        tracing::debug!(
            schema = T::NAME,
            profile = profile.as_str(),
            model,
            temperature,
            "structured generation"
        );
        generate_structured::<T>(
            self.llm.as_ref(),
            self.validator.as_ref(),
            model,
            prompt,
            temperature,
        )
        .await
    }
}

impl std::fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelProvider")
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}
