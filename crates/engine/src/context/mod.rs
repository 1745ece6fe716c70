//! Prompt assembly for the three provider call shapes.
//!
//! | Mode | Document | Sources | History |
//! |------|----------|---------|---------|
//! | Full synthesis | none | full bodies | none |
//! | Revision | pretty JSON export | excerpts | none |
//! | Query | pretty JSON export | none | recent turns |

pub mod assembler;
pub mod token;

pub use assembler::{AssembledPrompt, AssemblyMetadata, AssemblyMode, ContextAssembler};
