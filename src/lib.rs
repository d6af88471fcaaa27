//! growthwise - WHO child-growth assessment with guideline-grounded feeding advice
//!
//! This crate provides:
//! - LMS z-scores, exact-match reference lookup and table-driven classification
//! - Guideline ingestion, chunking and a vector index (SQLite or Qdrant)
//! - Retrieval-augmented recommendations with a deterministic rule-based fallback

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod gemini;
pub mod generate;
pub mod growth;
pub mod ingest;
pub mod parse;
pub mod progress;
pub mod rag;
pub mod recommend;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use service::GrowthGuide;
