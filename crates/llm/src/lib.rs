//! LLM integration crate for the placement assistant.
//!
//! Provides a provider-agnostic abstraction for text generation behind the
//! [`LlmClient`] trait, plus the safety settings attached to every answer
//! request.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use placement_llm::{LlmClient, LlmRequest, SafetySettings, providers::GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("api-key");
//! let request = LlmRequest::new("What is the CGPA cutoff?", "gemini-1.5-pro")
//!     .with_temperature(0.3)
//!     .with_safety(SafetySettings::strict());
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod safety;
pub mod transport;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use safety::{BlockThreshold, HarmCategory, SafetySetting, SafetySettings};
