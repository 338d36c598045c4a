//! IPR Secrets
//!
//! Servers never echo secret values back: a response carries reference
//! handles where the request carried plaintext. This crate keeps a small
//! per-record vault of handle → plaintext in a private store so the record
//! can be reconciled against plaintext on every later read.
//!
//! # Flow
//!
//! ```text
//! write:  request + response ──┐
//!                              ├─► SecretResolver ─► response with plaintext
//! read:             response ──┘        ▲ │
//!                                       │ ▼
//!                               PrivateStore["secrets"]
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod reference;
pub mod resolver;
pub mod store;
pub mod vault;

pub use error::{SecretError, StoreError};
pub use reference::{decode_var, SecretRef, VarValue};
pub use resolver::{live_handles, ResolveStats, SecretResolver, DEFAULT_SECRETS_KEY};
pub use store::{InMemoryPrivateStore, PrivateStore};
pub use vault::SecretVault;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
