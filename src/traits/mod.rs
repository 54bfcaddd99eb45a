//! Trait definitions for SonarCloud operations.
//!
//! Each model type implements the traits its endpoints support, encapsulating
//! API differences (paging envelopes, page-size limits) in the implementations.

mod get;
mod list;

pub use get::Get;
pub use list::List;
