//! Core types and field-level parsing for quake-report.
//!
//! Holds the event record model, the error type, the quote-aware field
//! tokenizer and the coercers that turn raw CSV fields into numbers,
//! timestamps and normalized region labels.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod tokenizer;
