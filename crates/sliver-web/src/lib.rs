//! Axum integration for Sliver.
//!
//! Mount any [`sliver_core::TemplateView`] on a router; wrap it in
//! [`sliver_core::BlockAware`] to let async requests fetch a single block.

pub mod error;
pub mod extract;
pub mod server;

pub use error::WebError;
pub use extract::PartialRequest;
pub use server::{view, AppState, SliverServer};
