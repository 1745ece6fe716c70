//! # reqsynth Core
//!
//! Domain types, traits, and error definitions for the requirements synthesis
//! and revision engine. This crate has **zero framework dependencies**: it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The generative backend is defined as a trait here. Implementations live in
//! `reqsynth-providers`, orchestration lives in `reqsynth-engine`. This enables:
//! - Swapping providers via configuration
//! - Deterministic testing with scripted providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod citation;
pub mod conversation;
pub mod document;
pub mod error;
pub mod event;
pub mod provider;
pub mod schema;
pub mod source;

// Re-export key types at crate root for ergonomics
pub use citation::{Citation, ContentSegment, extract_citations, split_citations};
pub use conversation::{ConversationLog, ConversationTurn, TurnRole};
pub use document::{CitationAudit, Document, DocumentExport, Section};
pub use error::{Error, ProviderError, Result};
pub use event::{DomainEvent, EventBus};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseSchema, Usage};
pub use schema::{DocumentDraft, SectionDraft, parse_draft};
pub use source::{Source, SourceId, SourceKind, SourceRegistry};
