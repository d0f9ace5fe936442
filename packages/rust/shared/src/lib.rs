//! Shared types, error model, and configuration for omnivook.
//!
//! This crate is the foundation depended on by all other omnivook crates.
//! It provides:
//! - [`OmnivookError`] — the unified error type
//! - Domain types ([`Article`], [`SearchItem`], [`SearchPage`], [`LabelInput`])
//! - Configuration ([`AppConfig`], [`ApiConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, BuildConfig, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{OmnivookError, Result};
pub use types::{Article, LabelInput, PageInfo, SearchEdge, SearchItem, SearchPage};
