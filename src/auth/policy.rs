use uuid::Uuid;

use super::claims::Identity;
use crate::error::{ApiError, ApiResult};

pub fn require_admin(identity: &Identity) -> ApiResult<()> {
    if identity.is_admin {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// `owner` is `None` when the guarded record does not exist; only admins pass then.
pub fn is_self_or_admin(identity: &Identity, owner: Option<Uuid>) -> bool {
    identity.is_admin || owner == Some(identity.id)
}

pub fn require_self_or_admin(identity: &Identity, owner: Option<Uuid>) -> ApiResult<()> {
    if is_self_or_admin(identity, owner) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Owner of a new order: admins may place it for someone else.
pub fn order_owner(identity: &Identity, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(user_id) if identity.is_admin => user_id,
        _ => identity.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn who(is_admin: bool) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: "t@x.com".into(),
            is_admin,
        }
    }

    #[test]
    fn admin_only() {
        assert!(require_admin(&who(true)).is_ok());
        assert!(matches!(require_admin(&who(false)), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn self_or_admin() {
        let user = who(false);
        let admin = who(true);
        let stranger = Uuid::new_v4();

        assert!(is_self_or_admin(&user, Some(user.id)));
        assert!(!is_self_or_admin(&user, Some(stranger)));
        assert!(is_self_or_admin(&admin, Some(stranger)));
        assert!(require_self_or_admin(&user, Some(stranger)).is_err());
    }

    #[test]
    fn missing_owner_admits_admins_only() {
        assert!(!is_self_or_admin(&who(false), None));
        assert!(is_self_or_admin(&who(true), None));
    }

    #[test]
    fn order_owner_tie_break() {
        let user = who(false);
        let admin = who(true);
        let target = Uuid::new_v4();

        assert_eq!(order_owner(&admin, Some(target)), target);
        assert_eq!(order_owner(&admin, None), admin.id);
        assert_eq!(order_owner(&user, Some(target)), user.id);
        assert_eq!(order_owner(&user, None), user.id);
    }
}
