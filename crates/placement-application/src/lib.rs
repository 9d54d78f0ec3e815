//! # Application Layer
//!
//! Orchestrates the domain layer's registries and provider-graph-store
//! port into the allocation candidate engine: the Candidate Matcher
//! (single-provider and mixed paths) and the Candidate Assembler.
//!
//! | Component | Description |
//! |-----------|--------------|
//! | [`engine`] | [`engine::AllocationCandidateEngine`], the public entry point |
//! | [`matcher`] | The single-provider and mixed matching paths |
//! | [`assembler`] | Turns raw candidates into provider summaries |
//! | [`resolved`] | Resolves a caller-facing request group to ids |
//! | [`config`] | Matcher behavior knobs |

/// Builds [`value_objects::ProviderSummary`](placement_domain::value_objects::ProviderSummary)
/// lists from retained candidates.
pub mod assembler;
/// Matcher configuration knobs.
pub mod config;
/// The public engine entry point.
pub mod engine;
/// The single-provider and mixed matching paths.
pub mod matcher;
/// Name-to-id resolution of a caller-facing request group.
pub mod resolved;

pub use config::MatcherConfig;
pub use engine::AllocationCandidateEngine;
