//! Shared types, error model, and configuration for sheet2xml.
//!
//! This crate is the foundation depended on by all other sheet2xml crates.
//! It provides:
//! - [`Sheet2XmlError`] — the unified error type
//! - Domain types ([`Table`], [`Record`], [`Document`], [`Conversation`], [`Response`])
//! - Configuration ([`AppConfig`], [`Settings`], [`CredentialSource`], config loading)
//! - [`fs::write_atomic`] — all-or-nothing file writes

pub mod config;
pub mod error;
pub mod fs;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ColumnNames, CredentialSource, CredentialsConfig, EndpointsConfig, GroupOrder,
    OutputConfig, Settings, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from,
};
pub use error::{Result, Sheet2XmlError};
pub use types::{Cell, Conversation, Document, Record, Response, Table};
