//! Credential models and the authentication headers derived from them.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
