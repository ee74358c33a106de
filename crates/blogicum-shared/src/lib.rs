//! # Blogicum Shared
//!
//! View models and response bodies shared by the server and any client
//! that renders its pages.

pub mod dto;
pub mod response;

pub use dto::Rendered;
pub use response::ErrorResponse;
