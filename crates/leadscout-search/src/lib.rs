//! Lead search: criteria classification, two-source result fusion, and
//! placeholder enrichment, wired to its collaborators through the
//! `leadscout_core` port traits.

pub mod classifier;
pub mod engine;
pub mod enrich;
pub mod memory;

pub use classifier::{split_clauses, Classifier, KeywordTable, Resolution, RESOLUTION_ORDER};
pub use engine::{fuse_candidates, EngineOptions, SearchEngine, SearchError, SearchOutcome};
pub use enrich::{Enricher, SyntheticEnricher};
pub use memory::{MemoryHistoryStore, MemoryQuotaLedger};
