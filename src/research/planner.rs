//! Research plan generation.

use super::error::ResearchError;
use super::models::{ModelProfile, ModelProvider};
use super::retry::RetryPolicy;
use super::schema::{MAX_ANALYSES, MIN_ANALYSES, PLAN_QUERY_COUNT};
use super::types::ResearchPlan;

const PRIMARY_TEMPERATURE: f64 = 0.5;
const FALLBACK_TEMPERATURE: f64 = 0.3;

pub struct PlanGenerator {
    models: ModelProvider,
    retry: RetryPolicy,
}

impl PlanGenerator {
    pub fn new(models: ModelProvider) -> Self {
        Self {
            models,
            retry: RetryPolicy::PLAN_GENERATION,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Primary model with rate-limit retries, then one fallback attempt.
    pub async fn generate(&self, topic: &str) -> Result<ResearchPlan, ResearchError> {
        let prompt = plan_prompt(topic);

        let primary = self
            .retry
            .run("plan generation", || {
                self.models
                    .generate::<ResearchPlan>(ModelProfile::Primary, &prompt, PRIMARY_TEMPERATURE)
            })
            .await;

        let primary_error = match primary {
            Ok(plan) => return Ok(plan),
            Err(e) => e,
        };

        tracing::warn!(
            "Primary model failed to generate plan ({}), falling back to {}",
            primary_error,
            self.models.model(ModelProfile::Fallback)
        );

        self.models
            .generate::<ResearchPlan>(ModelProfile::Fallback, &prompt, FALLBACK_TEMPERATURE)
            .await
            .map_err(|fallback| {
                tracing::error!("Fallback model failed to generate plan: {}", fallback);
                ResearchError::PlanGeneration {
                    primary: primary_error,
                    fallback,
                }
            })
    }
}

fn plan_prompt(topic: &str) -> String {
    format!(
        "Create a focused research plan for the topic: \"{topic}\".\n\
         \n\
         The plan must contain:\n\
         - Exactly {queries} targeted search queries. Each query uses `web`, `academic` or \
         `both` sources, has a rationale of at least one full sentence, a priority from 1 \
         (most important) to 5, and 2-4 expected insights.\n\
         - {min}-{max} key analyses to perform, each with a type, a description, an \
         importance from 1 to 5 and 2-4 focus areas.\n\
         \n\
         Spread priorities across the queries and mix web and academic sources. Consider \
         different angles and potential controversies, but stay focused on the core aspects \
         of the topic.",
        topic = topic,
        queries = PLAN_QUERY_COUNT,
        min = MIN_ANALYSES,
        max = MAX_ANALYSES,
    )
}
