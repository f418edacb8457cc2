//! LLM provider abstraction and the structured-JSON gateway.
//!
//! Provides a trait-based abstraction for chat-completion providers with
//! typed responses, plus the [`gateway::LlmGateway`] that layers model
//! profiles, retries, fence stripping, and schema validation on top.

pub mod gateway;
pub mod openai_compat;

use crate::error::LlmError;

/// Sampling profile for a gateway call.
///
/// Callers pick the profile; the concrete model name and endpoint are
/// resolved from configuration. Temperatures follow the editorial
/// pipeline's contract: judgement calls run cold, copywriting runs warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// Deterministic structured output (final verdicts, extraction).
    DeterministicJson,
    /// Analytical assessment (novelty, hype, style scoring).
    Analytical,
    /// Title and headline copywriting.
    CreativeTitle,
    /// Meta description copywriting.
    CreativeMeta,
    /// Outline planning and query generation.
    QueryGen,
}

impl ModelProfile {
    /// Sampling temperature for this profile.
    pub fn temperature(self) -> f32 {
        match self {
            Self::DeterministicJson => 0.1,
            Self::Analytical => 0.2,
            Self::CreativeTitle | Self::QueryGen => 0.6,
            Self::CreativeMeta => 0.8,
        }
    }
}

/// Response from an LLM completion request.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,
    /// The model that produced this response.
    pub model: String,
}

/// Parameters controlling LLM generation behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic, 1.0+ = creative).
    pub temperature: f32,
    /// Ask the provider for a JSON object response where supported.
    pub json_mode: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
            json_mode: true,
        }
    }
}

/// Trait abstracting the chat-completion operation.
///
/// The production implementation is [`openai_compat::OpenAiCompatProvider`];
/// tests substitute scripted providers. The trait is object-safe for use as
/// `Box<dyn LlmProvider>`.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the display name of this provider.
    fn name(&self) -> &str;

    /// Send a completion request to the LLM.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_temperatures() {
        assert!(ModelProfile::DeterministicJson.temperature() <= 0.1);
        assert!((0.2..=0.3).contains(&ModelProfile::Analytical.temperature()));
        assert_eq!(ModelProfile::CreativeTitle.temperature(), 0.6);
        assert_eq!(ModelProfile::CreativeMeta.temperature(), 0.8);
        assert_eq!(ModelProfile::QueryGen.temperature(), 0.6);
    }
}
