//! Boteval - collection and comparison of model evaluations.
//!
//! This library collects free-text model responses and human annotations
//! for a fixed question set, stores each submission as an immutable JSON
//! record in a remote blob store, and aggregates heterogeneous evaluation
//! documents (one per model/run, possibly scored with different
//! vocabularies) into a unified comparison table with summary statistics.
//!
//! # Overview
//!
//! Evaluation documents come from different evaluators with no agreed-on
//! schema, so the pipeline:
//! 1. Infers a schema per document (score types, metadata fields)
//! 2. Intersects the score vocabularies; only shared score types compare
//! 3. Builds a dense table keyed by the union of question ids
//! 4. Derives quartile summaries and heatmap/histogram matrices
//!
//! # Quick Start
//!
//! ```no_run
//! use boteval::{
//!     config::Config,
//!     export::{summary_csv, table_csv},
//!     pipeline::{self, CompareOutcome},
//!     store::HubStore,
//! };
//! use std::collections::BTreeSet;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     // Open the blob store holding the evaluation documents
//!     let store = HubStore::new(config.store.clone());
//!
//!     // Aggregate every document under compare/ into one report
//!     let excluded = BTreeSet::new();
//!     match pipeline::compare(&store, &config.paths.compare_dir, None, &excluded).await? {
//!         CompareOutcome::Report(report) => {
//!             println!("{}", summary_csv(&report.summary));
//!             println!("{}", table_csv(&report.table));
//!         }
//!         CompareOutcome::EmptyDocumentSet => println!("no documents selected"),
//!         CompareOutcome::NoCommonScoreTypes { .. } => println!("nothing to compare"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **BlobStore**: narrow read/write/list interface to the record store
//! - **Schema**: inferred score vocabulary and field sets per document
//! - **ComparisonTable**: dense question-id × (document, score type) table
//! - **SummaryTable**: per-(document, score type) quartile summaries
//! - **ScoreMatrix**: visualization-ready heatmap and distribution views

pub mod collate;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod prep;
pub mod schema;
pub mod stats;
pub mod store;
pub mod table;
pub mod viz;

// Re-export commonly used types
pub use config::Config;
pub use error::{BotevalError, Result};
pub use model::{AnnotationSet, EvaluationDocument, Question, Submission};
pub use pipeline::{CompareOutcome, ComparisonReport};
pub use schema::{Schema, common_score_types, extract_schema};
pub use stats::SummaryTable;
pub use store::{BlobStore, FsStore, HubStore, MemoryStore};
pub use table::ComparisonTable;
