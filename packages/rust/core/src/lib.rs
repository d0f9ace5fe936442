//! Run orchestration for omnivook.
//!
//! This crate ties the fetcher and the builder together: it scaffolds the
//! source directory, computes the book metadata, drives the build and moves
//! the resulting ebook into place ([`pipeline::run`]).

pub mod book;
pub mod packager;
pub mod pipeline;
pub mod scaffold;
