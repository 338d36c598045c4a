//! Package-derived defaults
//!
//! Rebuilt on every reconciliation pass from the package descriptor and
//! attached to inputs only while comparing. Never persisted.

use std::collections::BTreeMap;

use crate::enabled::Enabled;
use crate::normalized::NormalizedJson;

/// Defaults for every input of a package, keyed by input id
pub type DefaultsMap = BTreeMap<String, InputDefaults>;

/// Defaults for one input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDefaults {
    /// Input-level variable defaults
    pub vars: NormalizedJson,
    /// Stream defaults keyed by stream id
    pub streams: BTreeMap<String, StreamDefaults>,
}

/// Defaults for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDefaults {
    /// Default enablement
    pub enabled: Enabled,
    /// Stream-level variable defaults
    pub vars: NormalizedJson,
}

impl InputDefaults {
    /// Defaults with the given vars and no streams
    #[inline]
    #[must_use]
    pub fn with_vars(vars: NormalizedJson) -> Self {
        Self {
            vars,
            streams: BTreeMap::new(),
        }
    }

    /// Add a stream default
    #[inline]
    #[must_use]
    pub fn with_stream(mut self, id: impl Into<String>, stream: StreamDefaults) -> Self {
        self.streams.insert(id.into(), stream);
        self
    }
}
