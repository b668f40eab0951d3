//! Bearer token handling: the redacted secret wrapper and the TTL-backed token cache.

pub mod secret;
pub mod token;

pub use secret::*;
pub use token::*;
