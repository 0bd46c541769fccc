//! Composable authorization checks.
//!
//! Services call these instead of inlining `if principal.role != Role::Admin`
//! checks, so the forbidden message and error kind stay consistent across
//! every call site (mirrors the original's `@admin_required`/`@owner_or_admin`
//! decorators, expressed as plain functions since Rust has no decorator
//! equivalent that fits this crate's style).

use vendix_core::model::{Id, Role};
use vendix_core::{ErrorKind, Principal, VendixError, VendixResult};

/// Require `principal` to hold [`Role::Admin`].
///
/// # Errors
///
/// Returns [`ErrorKind::Forbidden`] otherwise.
pub fn require_admin(principal: &Principal) -> VendixResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(VendixError::new(ErrorKind::Forbidden, "administrator role required"))
    }
}

/// Require `principal` to either be an admin or own `owner_id`.
///
/// # Errors
///
/// Returns [`ErrorKind::Forbidden`] otherwise.
pub fn require_owner_or_admin(principal: &Principal, owner_id: Id) -> VendixResult<()> {
    if principal.owns_or_admin(owner_id) {
        Ok(())
    } else {
        Err(VendixError::new(
            ErrorKind::Forbidden,
            "caller is neither the resource owner nor an administrator",
        ))
    }
}

/// Require `principal` to hold exactly `role`.
///
/// # Errors
///
/// Returns [`ErrorKind::Forbidden`] otherwise.
pub fn require_role(principal: &Principal, role: Role) -> VendixResult<()> {
    if principal.role == role {
        Ok(())
    } else {
        Err(VendixError::new(ErrorKind::Forbidden, format!("{role} role required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, user_id: Id) -> Principal {
        Principal {
            user_id,
            role,
            jti: "t".into(),
            expires_at: 0,
        }
    }

    #[test]
    fn admin_check_rejects_customer() {
        let err = require_admin(&principal(Role::Customer, 1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[test]
    fn owner_or_admin_allows_owner() {
        assert!(require_owner_or_admin(&principal(Role::Customer, 1), 1).is_ok());
    }

    #[test]
    fn owner_or_admin_rejects_other_customer() {
        assert!(require_owner_or_admin(&principal(Role::Customer, 1), 2).is_err());
    }

    #[test]
    fn owner_or_admin_allows_admin_for_any_owner() {
        assert!(require_owner_or_admin(&principal(Role::Admin, 1), 999).is_ok());
    }
}
