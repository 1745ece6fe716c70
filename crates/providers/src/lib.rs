//! Generative provider implementations for reqsynth.
//!
//! All providers implement the `reqsynth_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod fallback;
pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use fallback::FallbackProvider;
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, resolve_model};
