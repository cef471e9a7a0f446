//! Registry session: bearer-token acquisition and the shared HTTP client.

pub mod client;
pub mod token;

pub use client::RegistryClient;
pub use token::{obtain_token, validate_token, BrowserTokenProvider};
