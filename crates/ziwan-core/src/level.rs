use crate::error::{Result, SpaceError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const MIB: i64 = 1024 * 1024;

/// Authorization a user must hold to create a space of a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAuth {
    /// Any signed-in user.
    Any,
    /// Only users with elevated authorization.
    Elevated,
}

/// Storage limits attached to a [`SpaceLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelQuota {
    /// Maximum total size of the pictures in a space, in bytes.
    pub max_size: i64,
    /// Maximum number of pictures in a space.
    pub max_count: i64,
    /// Authorization needed to create a space at this level.
    pub required: RequiredAuth,
}

/// The quota tier of a space.
///
/// Tiers are persisted by their integer [`value`](SpaceLevel::value). Unknown
/// values are rejected at the boundary by [`SpaceLevel::from_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceLevel {
    Common,
    Professional,
    Flagship,
}

impl SpaceLevel {
    const ALL: [SpaceLevel; 3] = [
        SpaceLevel::Common,
        SpaceLevel::Professional,
        SpaceLevel::Flagship,
    ];

    /// Every defined level, in ascending order.
    pub fn all() -> &'static [SpaceLevel] {
        &Self::ALL
    }

    /// Looks a level up by its persisted value.
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.value() == value)
    }

    pub fn value(self) -> i32 {
        match self {
            SpaceLevel::Common => 0,
            SpaceLevel::Professional => 1,
            SpaceLevel::Flagship => 2,
        }
    }

    /// Human readable tier name.
    pub fn text(self) -> &'static str {
        match self {
            SpaceLevel::Common => "common",
            SpaceLevel::Professional => "professional",
            SpaceLevel::Flagship => "flagship",
        }
    }

    pub fn quota(self) -> LevelQuota {
        match self {
            SpaceLevel::Common => LevelQuota {
                max_size: 100 * MIB,
                max_count: 100,
                required: RequiredAuth::Any,
            },
            SpaceLevel::Professional => LevelQuota {
                max_size: 1000 * MIB,
                max_count: 1000,
                required: RequiredAuth::Elevated,
            },
            SpaceLevel::Flagship => LevelQuota {
                max_size: 10000 * MIB,
                max_count: 10000,
                required: RequiredAuth::Elevated,
            },
        }
    }

    pub fn requires_elevation(self) -> bool {
        self.quota().required == RequiredAuth::Elevated
    }
}

impl Display for SpaceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

impl TryFrom<i32> for SpaceLevel {
    type Error = SpaceError;

    fn try_from(value: i32) -> Result<Self> {
        Self::from_value(value).ok_or(SpaceError::UnknownTier(value))
    }
}

/// Resolves a raw tier value into its quota definition.
pub fn resolve(value: i32) -> Result<LevelQuota> {
    SpaceLevel::try_from(value).map(SpaceLevel::quota)
}
