//! Core pipeline for sheet2xml.
//!
//! Ties credential resolution and worksheet fetching (`sheet2xml-sheets`)
//! to the conversation transform and XML writer (e.g., `convert`).

pub mod pipeline;
pub mod transform;
pub mod xml;
