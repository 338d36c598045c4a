//! IPR Equality
//!
//! Decides whether a stored integration policy and a newly observed one are
//! the same for drift detection.
//!
//! # Levels
//!
//! - **Stream**: enablement by plain equality, vars by normalized JSON
//! - **Input**: vars, plus the streams that are not explicitly disabled
//! - **Input map / policy**: the inputs that are functionally enabled after
//!   applying their defaults
//!
//! Explicitly disabled sub-records are erased from both sides before
//! comparing ("disablement erasure"), so a server that drops or echoes stale
//! disabled inputs and streams never shows up as drift.
//!
//! # Example
//!
//! ```rust,ignore
//! use ipr_equality::SemanticEq;
//!
//! if prior.semantic_eq(&observed)? {
//!     // keep the stored representation
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod input;
mod policy;
mod stream;

pub use error::EqualityError;
pub use input::{input_effectively_enabled, merged_inputs_equal};
pub use policy::{inputs_equal, policies_equal};
pub use stream::{enabled_streams, streams_equal};

use ipr_model::{Inputs, IntegrationPolicy, Stream};

/// Defaults-aware semantic equality
pub trait SemanticEq {
    /// Whether `self` and `other` are the same for drift detection
    ///
    /// # Errors
    /// Returns error if either side holds malformed JSON
    fn semantic_eq(&self, other: &Self) -> Result<bool, EqualityError>;
}

impl SemanticEq for Stream {
    fn semantic_eq(&self, other: &Self) -> Result<bool, EqualityError> {
        streams_equal(self, other, &ipr_model::FieldPath::root())
            .map_err(|e| EqualityError::Malformed(e.into()))
    }
}

impl SemanticEq for Option<Inputs> {
    fn semantic_eq(&self, other: &Self) -> Result<bool, EqualityError> {
        inputs_equal(self.as_ref(), other.as_ref())
    }
}

impl SemanticEq for IntegrationPolicy {
    fn semantic_eq(&self, other: &Self) -> Result<bool, EqualityError> {
        policies_equal(self, other)
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
