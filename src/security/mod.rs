//! Security module for nirmaan-stack.
//!
//! Provides the access-control pieces the request handlers rely on:
//! - **Caller**: explicit identity of the requesting user
//! - **Permissions**: role grants and project scoping behind [`AccessPolicy`]
//! - **Secrets**: Argon2 hashing and verification of API secrets
//! - **Rate Limiting**: governor-based throttling of typing broadcasts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Security Module                        │
//! ├──────────────┬─────────────────────┬─────────────┬──────────┤
//! │    Caller    │    Permissions      │   Secrets   │  Rate    │
//! │ user / Guest │ roles + membership   │   Argon2    │ Governor │
//! └──────────────┴─────────────────────┴─────────────┴──────────┘
//! ```

pub mod caller;
pub mod permissions;
pub mod rate_limit;
pub mod secret;

pub use caller::CallerContext;
pub use permissions::{AccessError, AccessPolicy, DbAccessPolicy, Ptype};
pub use rate_limit::TypingLimiter;
