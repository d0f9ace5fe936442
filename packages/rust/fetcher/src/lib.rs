//! Article retrieval from the read-it-later service.
//!
//! This crate provides:
//! - [`ArticleService`] — the slice of the service API omnivook needs
//! - [`OmnivoreClient`] — the GraphQL implementation of that trait
//! - [`SearchFilter`] — search query construction
//! - [`search_all`] / [`materialize`] — pagination and markdown file output

mod client;
mod query;
mod retrieve;
mod service;

pub use client::OmnivoreClient;
pub use query::SearchFilter;
pub use retrieve::{ExportOptions, SEARCH_START_CURSOR, materialize, search_all};
pub use service::ArticleService;
