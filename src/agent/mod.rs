//! Language model access for the analyzer stages.
//!
//! This module provides the model client, the available/unavailable handle
//! injected into the pipeline, and the per-category prompts.

pub mod client;
pub mod prompts;

pub use client::{LlmHandle, OllamaClient, OllamaConfig};
