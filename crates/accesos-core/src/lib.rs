//! Core types and the request workflow for the access-request portal.
//!
//! This crate has no HTTP or database dependencies. The workflow engine is a
//! pure function over plain data; persistence is reached only through the
//! [`store::AccessStore`] trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod directory;
pub mod error;
pub mod request;
pub mod role;
pub mod service;
pub mod status;
pub mod store;
pub mod summary;
pub mod view;
pub mod workflow;

pub use error::{Error, Result};
