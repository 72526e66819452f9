//! Small newtype wrappers around `String` for the system's distinct
//! identifier kinds, so a `Fingerprint` and a `RouteId` can't be swapped
//! by accident at a call site.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(Fingerprint, "Stable identity hash of an alert's label set.");
newtype_string!(ReceiverName, "Name of a configured receiver (bundle of notifier integrations).");
newtype_string!(RouteId, "Stable identifier of a route tree node, derived from its position.");
newtype_string!(GroupKey, "Key identifying an aggregation group: the alert's labels projected onto a route's `group_by`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display_and_deref() {
        let fp = Fingerprint::new("abc123");
        assert_eq!(fp.as_str(), "abc123");
        assert_eq!(&*fp, "abc123");
        assert_eq!(fp.to_string(), "abc123");
    }
}
