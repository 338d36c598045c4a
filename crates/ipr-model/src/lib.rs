//! IPR Model
//!
//! Record types shared by every reconciliation subsystem.
//!
//! # Core Concepts
//!
//! - [`NormalizedJson`]: JSON held as text, compared by parsed structure
//! - [`Enabled`]: tri-state enablement (plus the transient unknown state)
//! - [`IntegrationPolicy`] / [`Input`] / [`Stream`]: the current (generation 2) stored record
//! - [`InputDefaults`]: package-derived defaults, attached only for comparison
//! - [`PolicyRequest`] / [`PolicyResponse`]: the transport boundary
//! - [`FieldPath`] / [`Diagnostics`]: accumulated per-field errors
//!
//! # Example
//!
//! ```rust
//! use ipr_model::NormalizedJson;
//!
//! let a = NormalizedJson::new(r#"{"a":"b"}"#);
//! let b = NormalizedJson::new(r#"{ "a": "b" }"#);
//! assert!(a.semantically_equal(&b).unwrap());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod defaults;
mod enabled;
mod error;
mod normalized;
mod policy;
mod wire;

pub use defaults::{DefaultsMap, InputDefaults, StreamDefaults};
pub use enabled::Enabled;
pub use error::{Diagnostics, FieldError, FieldErrorKind, FieldPath};
pub use normalized::{JsonObject, NormalizedJson};
pub use policy::{Input, Inputs, IntegrationPolicy, Stream, Streams};
pub use wire::{
    InputPayload, PackageRef, PolicyRequest, PolicyResponse, SecretReference, StreamPayload,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
