// ── MAC address ──
//
// Devices are keyed and sorted by MAC. The value is kept exactly as the
// API sent it (only surrounding whitespace is dropped): ordering is plain
// byte-wise comparison, so `"A0:..."` sorts before `"b0:..."`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// MAC address as received, compared case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase colon-separated form, for matching user input against
    /// listed devices. Never used for ordering.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase().replace('-', ":")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
