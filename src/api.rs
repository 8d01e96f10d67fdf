//! HTTP clients for the site API
//!
//! The endpoints live on the site backend; this module only calls them.

mod admin;
mod chat;
mod error;
mod types;

pub use admin::AdminClient;
pub use chat::ChatClient;
pub use error::{ApiError, ApiErrorKind};
pub use types::*;
