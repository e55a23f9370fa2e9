//! Weavr - adaptive pipeline orchestration
//!
//! Weavr turns declarative data-retrieval goals into executable tool
//! pipelines and keeps them alive through failure: a compiler plans the
//! pipeline from a tool catalog, an engine runs it, an evaluator diagnoses
//! what went wrong, and a supervisor loops the three under attempt budgets
//! until the goal is met, permanently failed, or in need of user input.

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod id;
pub mod storage;
pub mod supervisor;

pub use error::{Result, WeavrError};
