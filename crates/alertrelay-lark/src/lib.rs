//! Lark open platform clients.
//!
//! - [`identity`] exchanges app credentials for a tenant token and resolves
//!   mention targets to user IDs. Failures degrade to empty results.
//! - [`bot`] renders an enriched alert as an interactive [`card`] and posts
//!   it to a custom bot webhook. Failures are returned to the caller.
//!
//! Every client takes a [`ClientConfig`] so each call site has its own
//! explicit timeout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bot;
pub mod card;
pub mod client;
pub mod error;
pub mod identity;

pub use bot::BotClient;
pub use client::{ClientConfig, DEFAULT_OPEN_API_BASE_URL};
pub use error::{LarkError, Result};
pub use identity::{IdentityResolver, TenantToken};
