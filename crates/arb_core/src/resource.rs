//! Resource vocabulary (§3 `ResourceKind`) — a closed enumeration of resource
//! kinds with integer unit semantics.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Every resource an agent may request an allocation of. Closed by design:
/// new kinds are a deliberate engine change, not scenario data.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ResourceKind {
    Compute,
    ApiCredits,
    Memory,
    Storage,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Compute,
        ResourceKind::ApiCredits,
        ResourceKind::Memory,
        ResourceKind::Storage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Compute => "COMPUTE",
            ResourceKind::ApiCredits => "API_CREDITS",
            ResourceKind::Memory => "MEMORY",
            ResourceKind::Storage => "STORAGE",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = crate::errors::CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPUTE" => Ok(ResourceKind::Compute),
            "API_CREDITS" => Ok(ResourceKind::ApiCredits),
            "MEMORY" => Ok(ResourceKind::Memory),
            "STORAGE" => Ok(ResourceKind::Storage),
            other => Err(crate::errors::CoreError::InvalidToken(other.to_string())),
        }
    }
}
