use std::sync::Arc;

use axum::http::HeaderMap;
use reportdb::auth::{resolve_actor, Actor, AllowAllAuthorizer, Authorizer, GrantAuthorizer};
use reportdb::config::PermissionConfig;
use tracing::warn;

/// Header carrying the name of the calling user.
pub const USER_HEADER: &str = "x-reportdb-user";

/// Actor for a request, from the user header and the configured grants.
pub fn actor_from_headers(permissions: &PermissionConfig, headers: &HeaderMap) -> Actor {
    let username = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok());
    resolve_actor(permissions, username)
}

pub fn default_authorizer() -> Arc<dyn Authorizer> {
    if local_auth_bypass_enabled() {
        warn!("REPORTDB_LOCAL_AUTH_BYPASS is set, permission checks are disabled");
        return Arc::new(AllowAllAuthorizer);
    }
    Arc::new(GrantAuthorizer)
}

fn local_auth_bypass_enabled() -> bool {
    std::env::var("REPORTDB_LOCAL_AUTH_BYPASS")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use reportdb::auth::Permission;

    #[test]
    fn header_selects_the_user_grant() {
        let config = PermissionConfig {
            anonymous: vec![],
            users: [("alice".to_string(), vec![Permission::Store])].into(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("alice"));
        let alice = actor_from_headers(&config, &headers);
        assert_eq!(alice.username(), "alice");
        assert!(alice.has_permission(Permission::Access));
        assert!(!alice.has_permission(Permission::Admin));

        let anonymous = actor_from_headers(&config, &HeaderMap::new());
        assert!(!anonymous.is_authenticated());
        assert!(!anonymous.has_permission(Permission::Access));
    }
}
