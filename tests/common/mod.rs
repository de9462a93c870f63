//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test servers and calling their API
//! as one of the seeded users.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::ApiClient;
#[allow(unused_imports)]
pub use server::TestServer;
