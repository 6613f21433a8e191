//! Structural and business rules for space records.

use crate::error::{Result, SpaceError};
use crate::level::SpaceLevel;
use crate::space::{is_blank, NewSpace, SpaceDraft, SpaceType, UserId};
use serde::{Deserialize, Serialize};

/// Longest accepted space name, in characters.
pub const MAX_NAME_LENGTH: usize = 20;

/// How the space name length rule is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCheck {
    /// Rejects a name only when it is blank *and* longer than
    /// [`MAX_NAME_LENGTH`]. Kept for parity with existing clients; in practice
    /// only whitespace-only names over the limit are rejected, so names of
    /// any length reach the store. The MySQL schema stores them as `TEXT`.
    #[default]
    Literal,
    /// Rejects blank names on create and over-long names on create and update.
    Strict,
}

/// Which write the record is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Validates a space draft.
pub fn validate(draft: &SpaceDraft, mode: ValidationMode, name_check: NameCheck) -> Result<()> {
    let name = draft.name.as_deref();

    match mode {
        ValidationMode::Create => {
            check_name(name, name_check, mode)?;
            if draft.level.is_none() {
                return Err(SpaceError::Param("space level is required".to_string()));
            }
        }
        ValidationMode::Update => {
            if !is_blank(name) {
                check_name(name, name_check, mode)?;
            }
        }
    }

    if let Some(level) = draft.level {
        SpaceLevel::try_from(level)
            .map_err(|_| SpaceError::Param(format!("invalid space level: {level}")))?;
    }

    if let Some(space_type) = draft.space_type {
        if SpaceType::from_value(space_type).is_none() {
            return Err(SpaceError::Param(format!("invalid space type: {space_type}")));
        }
    }

    Ok(())
}

fn check_name(name: Option<&str>, name_check: NameCheck, mode: ValidationMode) -> Result<()> {
    let blank = is_blank(name);
    let too_long = name.is_some_and(|n| n.chars().count() > MAX_NAME_LENGTH);

    let rejected = match name_check {
        NameCheck::Literal => blank && too_long,
        NameCheck::Strict => too_long || (blank && mode == ValidationMode::Create),
    };

    if !rejected {
        return Ok(());
    }
    if too_long {
        Err(SpaceError::Param(format!(
            "space name must be at most {MAX_NAME_LENGTH} characters"
        )))
    } else {
        Err(SpaceError::Param("space name must not be blank".to_string()))
    }
}

/// Fills missing limits from the draft's level, if that level resolves.
///
/// Explicit `max_size` / `max_count` values are left untouched.
pub fn fill_quota(draft: &mut SpaceDraft) {
    let Some(level) = draft.level.and_then(SpaceLevel::from_value) else {
        return;
    };
    let quota = level.quota();
    draft.max_size.get_or_insert(quota.max_size);
    draft.max_count.get_or_insert(quota.max_count);
}

/// Converts a draft that passed [`validate`] in create mode into a [`NewSpace`].
pub fn into_new_space(draft: SpaceDraft, owner: UserId) -> Result<NewSpace> {
    let level = draft
        .level
        .ok_or_else(|| SpaceError::Param("space level is required".to_string()))
        .and_then(|value| {
            SpaceLevel::try_from(value)
                .map_err(|_| SpaceError::Param(format!("invalid space level: {value}")))
        })?;
    let space_type = match draft.space_type {
        None => SpaceType::Private,
        Some(value) => SpaceType::from_value(value)
            .ok_or_else(|| SpaceError::Param(format!("invalid space type: {value}")))?,
    };
    let quota = level.quota();

    Ok(NewSpace {
        name: draft.name.unwrap_or_default(),
        level,
        space_type,
        max_size: draft.max_size.unwrap_or(quota.max_size),
        max_count: draft.max_count.unwrap_or(quota.max_count),
        owner,
    })
}
