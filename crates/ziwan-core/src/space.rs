use crate::level::SpaceLevel;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a space, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(i64);

impl SpaceId {
    /// Returned by the coordinator when a committed insert produced no id.
    pub const UNASSIGNED: SpaceId = SpaceId(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a space belongs to a single user or is shared by a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
    Private,
    Team,
}

impl SpaceType {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(SpaceType::Private),
            1 => Some(SpaceType::Team),
            _ => None,
        }
    }

    pub fn value(self) -> i32 {
        match self {
            SpaceType::Private => 0,
            SpaceType::Team => 1,
        }
    }
}

impl Display for SpaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpaceType::Private => f.write_str("private"),
            SpaceType::Team => f.write_str("team"),
        }
    }
}

/// Role of a member inside a team space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceRole {
    Viewer,
    Editor,
    Admin,
}

impl SpaceRole {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "viewer" => Some(SpaceRole::Viewer),
            "editor" => Some(SpaceRole::Editor),
            "admin" => Some(SpaceRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpaceRole::Viewer => "viewer",
            SpaceRole::Editor => "editor",
            SpaceRole::Admin => "admin",
        }
    }
}

/// A stored space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub level: SpaceLevel,
    pub space_type: SpaceType,
    /// Maximum total size in bytes.
    pub max_size: i64,
    /// Maximum number of pictures.
    pub max_count: i64,
    /// Bytes currently used.
    pub total_size: i64,
    /// Pictures currently stored.
    pub total_count: i64,
    pub owner: UserId,
    pub created_at: Timestamp,
}

/// A fully validated space that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSpace {
    pub name: String,
    pub level: SpaceLevel,
    pub space_type: SpaceType,
    pub max_size: i64,
    pub max_count: i64,
    pub owner: UserId,
}

impl NewSpace {
    /// Materializes the stored form once the store has assigned an id.
    pub fn into_space(self, id: SpaceId, created_at: Timestamp) -> Space {
        Space {
            id,
            name: self.name,
            level: self.level,
            space_type: self.space_type,
            max_size: self.max_size,
            max_count: self.max_count,
            total_size: 0,
            total_count: 0,
            owner: self.owner,
            created_at,
        }
    }
}

/// Membership of a user in a team space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceMembership {
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub role: SpaceRole,
}

/// Parameters accepted when creating a space.
///
/// `level` and `space_type` hold raw enumerated values so that unknown values
/// can be reported as parameter errors instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSpaceRequest {
    pub name: Option<String>,
    pub level: Option<i32>,
    pub space_type: Option<i32>,
}

/// An unvalidated space record, as seen by the validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaceDraft {
    pub name: Option<String>,
    pub level: Option<i32>,
    pub space_type: Option<i32>,
    pub max_size: Option<i64>,
    pub max_count: Option<i64>,
}

impl From<CreateSpaceRequest> for SpaceDraft {
    fn from(request: CreateSpaceRequest) -> Self {
        Self {
            name: request.name,
            level: request.level,
            space_type: request.space_type,
            max_size: None,
            max_count: None,
        }
    }
}

impl SpaceDraft {
    /// Applies the quota of `level` to this draft, overriding any limits.
    pub fn assign_level(&mut self, level: SpaceLevel) {
        let quota = level.quota();
        self.level = Some(level.value());
        self.max_size = Some(quota.max_size);
        self.max_count = Some(quota.max_count);
    }
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}
