//! Analyzer/Aggregator pipeline core.
//!
//! This module provides the composable abstraction every extraction is built
//! from:
//! - `ElementAnalyzer`: turns matching syntax nodes into partial results
//! - `ContextController`: maintains traversal context analyzers can read
//! - `Aggregator`: folds partial results into one result, with a declared order
//! - `MainAnalyzer`: runs an ordered list of analyzers over a unit and aggregates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ SyntaxUnit  │────▶│ MainAnalyzer     │────▶│ PartialResults │
//! └─────────────┘     │ (controllers +   │     └────────────────┘
//!                     │  analyzers)      │             │
//!                     └──────────────────┘             ▼
//!                                              ┌────────────────┐
//!                                              │ Aggregator     │──▶ result
//!                                              └────────────────┘
//! ```
//!
//! # Adding a New Extraction
//!
//! 1. Implement `ElementAnalyzer` for the node kinds you care about
//! 2. Pick or write an `Aggregator` and declare its `ResultOrder`
//! 3. Bundle them in a `MainAnalyzer` inside an `Extraction`
//!    (see `extract/imports.rs` for a reference implementation)

mod aggregate;
mod main_analyzer;
mod traits;

pub use aggregate::{FlattenAggregator, ListAggregator, SetAggregator};
pub use main_analyzer::{Analyzed, Collected, MainAnalyzer};
pub use traits::{
    Aggregator, ContextController, ElementAnalyzer, NoContext, PartialResult, ResultOrder,
};
