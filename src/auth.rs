//! Auth Boundary
//!
//! The gateway in front of this service resolves credentials and forwards the
//! caller's identity as `x-user-id` / `x-user-role` headers. This core trusts
//! that pair as given; it performs authorization, not authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;
use crate::models::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The resolved (user id, role) pair for an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner-or-admin check used by the authoring endpoints.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

fn parse_identity(parts: &Parts) -> Option<AuthUser> {
    let user_id = parts
        .headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()?;
    let role = parts
        .headers
        .get(USER_ROLE_HEADER)?
        .to_str()
        .ok()?
        .parse::<Role>()
        .ok()?;
    Some(AuthUser { user_id, role })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_identity(parts)
            .ok_or_else(|| ApiError::Forbidden("Authentication required".to_string()))
    }
}

/// Identity for endpoints that also serve anonymous callers, such as the
/// course read path. Malformed identity headers degrade to anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parse_identity(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_identity_parsed_from_headers() {
        let parts = parts_with(&[(USER_ID_HEADER, "42"), (USER_ROLE_HEADER, "trainer")]);
        let auth = parse_identity(&parts).unwrap();
        assert_eq!(auth.user_id, 42);
        assert_eq!(auth.role, Role::Trainer);
    }

    #[test]
    fn test_missing_or_malformed_headers_yield_anonymous() {
        assert!(parse_identity(&parts_with(&[])).is_none());
        assert!(parse_identity(&parts_with(&[(USER_ID_HEADER, "42")])).is_none());
        let parts = parts_with(&[(USER_ID_HEADER, "42"), (USER_ROLE_HEADER, "wizard")]);
        assert!(parse_identity(&parts).is_none());
    }

    #[test]
    fn test_can_manage() {
        let trainer = AuthUser {
            user_id: 7,
            role: Role::Trainer,
        };
        assert!(trainer.can_manage(7));
        assert!(!trainer.can_manage(8));

        let admin = AuthUser {
            user_id: 1,
            role: Role::Admin,
        };
        assert!(admin.can_manage(8));
    }
}
