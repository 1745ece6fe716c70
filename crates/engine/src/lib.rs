//! The reqsynth engine: synthesis, intent routing, and revision.
//!
//! A [`Session`] owns the source registry, the live document, and the
//! conversation log. Every operation goes through it:
//!
//! ```text
//! add_source ─▶ generate ─▶ Document v1
//!                               │
//! instruct ─▶ IntentClassifier ─┼─ Edit  ─▶ revision prompt ─▶ Document vN+1
//!                               └─ Query ─▶ query prompt ─▶ answer turn
//! ```

pub mod context;
pub mod intent;
pub mod revision;
pub mod session;
pub mod settings;
pub mod synthesis;

mod call;

pub use context::{AssembledPrompt, AssemblyMetadata, AssemblyMode, ContextAssembler};
pub use intent::{EDIT_KEYWORDS, Intent, IntentClassifier};
pub use revision::{RevisionEngine, RevisionOutcome, RevisionState};
pub use session::Session;
pub use settings::GenerationSettings;
pub use synthesis::SynthesisEngine;

#[cfg(test)]
pub(crate) mod test_helpers;
