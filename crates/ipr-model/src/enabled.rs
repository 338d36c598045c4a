//! Tri-state enablement

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Enablement of an input or stream
///
/// `Unset` defers to the server default. `Unknown` is a transient
/// "not yet computed" state; it serializes as unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Enabled {
    /// Explicitly enabled
    True,
    /// Explicitly disabled
    False,
    /// Derive from the server default
    #[default]
    Unset,
    /// Not yet known
    Unknown,
}

impl Enabled {
    /// Whether explicitly disabled
    ///
    /// Only an explicit `false` erases a sub-record from comparison; unset
    /// and unknown both keep it.
    #[inline]
    #[must_use]
    pub fn is_explicitly_disabled(self) -> bool {
        self == Self::False
    }

    /// Whether unset or unknown
    #[inline]
    #[must_use]
    pub fn is_unset(self) -> bool {
        matches!(self, Self::Unset | Self::Unknown)
    }

    /// Explicit value, if any
    #[inline]
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Unset | Self::Unknown => None,
        }
    }

    /// `self` unless unset, otherwise `fallback`
    #[inline]
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        if self.is_unset() {
            fallback
        } else {
            self
        }
    }
}

impl From<bool> for Enabled {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

impl From<Option<bool>> for Enabled {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unset, Self::from)
    }
}

impl Serialize for Enabled {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_bool().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Enabled {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_false_is_disabled() {
        assert!(Enabled::False.is_explicitly_disabled());
        assert!(!Enabled::True.is_explicitly_disabled());
        assert!(!Enabled::Unset.is_explicitly_disabled());
        assert!(!Enabled::Unknown.is_explicitly_disabled());
    }

    #[test]
    fn or_fills_unset() {
        assert_eq!(Enabled::Unset.or(Enabled::False), Enabled::False);
        assert_eq!(Enabled::Unknown.or(Enabled::True), Enabled::True);
        assert_eq!(Enabled::True.or(Enabled::False), Enabled::True);
    }

    #[test]
    fn serde_as_optional_bool() {
        assert_eq!(serde_json::to_string(&Enabled::True).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Enabled::Unknown).unwrap(), "null");
        let parsed: Enabled = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, Enabled::Unset);
        let parsed: Enabled = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, Enabled::False);
    }
}
