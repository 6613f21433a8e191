use crate::error::{Result, SpaceError};
use crate::space::Space;
use crate::user::{Authorizer, User};

/// Allows access to `space` only for its owner or an elevated user.
pub fn check_access<A: Authorizer + ?Sized>(authorizer: &A, user: &User, space: &Space) -> Result<()> {
    if space.owner == user.id || authorizer.is_elevated(user) {
        return Ok(());
    }
    Err(SpaceError::Forbidden(format!(
        "user {} has no access to space {}",
        user.id, space.id
    )))
}
