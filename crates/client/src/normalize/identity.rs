//! Auth payload normalization.

use serde_json::Value;

use tienda_core::{Identity, UserId};

use super::first_present;
use crate::credential::Credential;

/// Candidate keys for the role field, in priority order.
pub const ROLE_KEYS: &[&str] = &["tipo", "role"];

const ID_KEYS: &[&str] = &["_id", "id"];
const NAME_KEYS: &[&str] = &["nombre", "name", "displayName", "username", "email"];
const IDENTITY_KEYS: &[&str] = &["user", "identity"];
const TOKEN_KEY: &str = "token";

/// What a successful sign-in or sign-up hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPayload {
    /// Bearer token, when the backend issued one in the body.
    pub credential: Option<Credential>,
    pub identity: Identity,
}

/// Normalize a login/register response.
///
/// The backend answers either `{token?, user: {...}}`, `{token?, identity: {...}}`
/// or the user document itself. Returns `None` when the body is not a JSON
/// object at all.
#[must_use]
pub fn normalize_auth(payload: &Value) -> Option<AuthPayload> {
    if !payload.is_object() {
        return None;
    }

    let credential = payload
        .get(TOKEN_KEY)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Credential::new);

    let identity = normalize_identity(payload)?;

    Some(AuthPayload {
        credential,
        identity,
    })
}

/// Normalize a profile response (or the identity part of an auth response).
///
/// Unwraps `user`/`identity` envelopes when present. Returns `None` unless
/// the identity is a JSON object.
#[must_use]
pub fn normalize_identity(payload: &Value) -> Option<Identity> {
    let user = IDENTITY_KEYS
        .iter()
        .find_map(|key| payload.get(*key).filter(|v| v.is_object()))
        .unwrap_or(payload);

    if !user.is_object() {
        return None;
    }

    let id = match first_present(user, ID_KEYS) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };

    let display_name = NAME_KEYS
        .iter()
        .find_map(|key| user.get(*key).and_then(Value::as_str))
        .unwrap_or_default();

    let raw_role = first_present(user, ROLE_KEYS).and_then(Value::as_str);

    Some(Identity::new(UserId::new(id), display_name, raw_role))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tienda_core::Role;

    use super::*;

    #[test]
    fn test_auth_with_user_envelope() {
        let auth = normalize_auth(&json!({
            "token": "abc",
            "user": {"_id": "u1", "nombre": "Ana", "tipo": "admin"}
        }))
        .expect("auth");

        assert_eq!(auth.credential, Some(Credential::new("abc")));
        assert_eq!(auth.identity.id, UserId::new("u1"));
        assert_eq!(auth.identity.display_name, "Ana");
        assert_eq!(auth.identity.role, Role::Admin);
    }

    #[test]
    fn test_auth_with_bare_user() {
        let auth = normalize_auth(&json!({"id": 7, "email": "ana@example.com", "role": "customer"}))
            .expect("auth");

        assert_eq!(auth.credential, None);
        assert_eq!(auth.identity.id, UserId::new("7"));
        assert_eq!(auth.identity.display_name, "ana@example.com");
        assert_eq!(auth.identity.role, Role::Customer);
    }

    #[test]
    fn test_identity_envelope_and_missing_role() {
        let identity = normalize_identity(&json!({"identity": {"_id": "u2", "name": "Luis"}}))
            .expect("identity");
        assert_eq!(identity.role, Role::Customer);
        assert_eq!(identity.display_name, "Luis");
    }

    #[test]
    fn test_role_field_priority() {
        let identity =
            normalize_identity(&json!({"tipo": "cliente", "role": "admin"})).expect("identity");
        assert_eq!(identity.role, Role::Customer);

        let identity = normalize_identity(&json!({"role": "admin"})).expect("identity");
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn test_blank_token_is_no_credential() {
        let auth = normalize_auth(&json!({"token": "  ", "user": {"_id": "u1"}})).expect("auth");
        assert_eq!(auth.credential, None);
    }

    #[test]
    fn test_non_object_payloads_rejected() {
        assert!(normalize_auth(&json!("ok")).is_none());
        assert!(normalize_auth(&Value::Null).is_none());
        assert!(normalize_identity(&json!([{"_id": "u1"}])).is_none());
    }
}
