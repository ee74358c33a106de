//! # Blogicum Core
//!
//! The domain layer of the blog.
//! Entities, the visibility and ownership rules, listing queries, pagination
//! and form validation live here, with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod query;

pub use error::DomainError;

/// Number of posts shown on every listing page.
pub const POSTS_PER_PAGE: u64 = 10;
