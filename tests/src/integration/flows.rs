//! # Session Flows
//!
//! Sign-in, expiry, profile and admin flows through `ReqwestTransport`
//! against the stub API.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;

    use sd_session::{
        ApiError, AuthPhase, Capability, DirectoryResource, ErrorScope, ExpiryHandler,
        GateDecision, ProfileUpdate, RegistrationForm, Role, SessionError, SessionEvent,
    };

    use crate::integration::fixtures::{service, RecordingNavigator};
    use crate::integration::stub_server::StubServer;

    fn registration(email: &str) -> RegistrationForm {
        RegistrationForm {
            full_name: "Aino Virtanen".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            city: "Tampere".into(),
        }
    }

    // =========================================================================
    // SIGN-IN
    // =========================================================================

    #[tokio::test]
    async fn test_register_then_logout() {
        let server = StubServer::start().await;
        let service = service(&server.base_url());
        let mut events = service.subscribe();

        let session = service.register(registration("a@x.org")).await.unwrap();
        assert_eq!(session.role(), Role::User);
        assert!(service.is_authenticated());
        assert!(matches!(
            events.try_recv(),
            Some(SessionEvent::Established { .. })
        ));

        service.logout();
        service.logout();
        assert!(!service.is_authenticated());
        assert_eq!(service.status().phase, AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn test_duplicate_registration_reports_server_message() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        let service = service(&server.base_url());

        let err = service.register(registration("a@x.org")).await.unwrap_err();
        assert_eq!(err.to_string(), "User already exists");
        assert_eq!(
            service.status().error.unwrap().scope,
            ErrorScope::Registration
        );
        assert!(!service.is_authenticated());
    }

    #[tokio::test]
    async fn test_user_login_scenario() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        let service = service(&server.base_url());

        let session = service.login("a@x.org", "secret1").await.unwrap();
        assert_eq!(session.role(), Role::User);
        assert!(session.bearer().is_some());

        assert!(!service.guard(Capability::Admin, "/admin/services").is_allowed());
        assert!(service.guard(Capability::Authenticated, "/profile").is_allowed());
        assert!(service.guard_path("/services").is_allowed());
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_expiry() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        let service = service(&server.base_url());
        let mut events = service.subscribe();

        let err = service.login("a@x.org", "wrong-one").await.unwrap_err();
        assert_eq!(
            err,
            SessionError::AuthFailure {
                status: 401,
                message: "Invalid email or password".to_string()
            }
        );
        assert!(events.try_recv().is_none());
        assert_eq!(service.status().error.unwrap().scope, ErrorScope::Login);
    }

    #[tokio::test]
    async fn test_denied_view_returns_after_login() {
        let server = StubServer::start().await;
        server.add_user("ops@x.org", "secret1", "admin");
        let service = service(&server.base_url());

        let decision = service.guard_path("/admin/categories");
        assert!(matches!(decision, GateDecision::Redirect { ref to, .. } if to == "/login"));

        service.login("ops@x.org", "secret1").await.unwrap();
        let destination = service.take_return_to();
        assert_eq!(destination, "/admin/categories");
        assert!(service.guard_path(&destination).is_allowed());
    }

    // =========================================================================
    // EXPIRY
    // =========================================================================

    #[tokio::test]
    async fn test_revoked_token_expires_session() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        let service = service(&server.base_url());
        let navigator = Arc::new(RecordingNavigator::default());
        let mut expiry = ExpiryHandler::new(service.subscribe(), navigator.clone());

        service.login("a@x.org", "secret1").await.unwrap();
        assert!(service
            .client()
            .list(DirectoryResource::Services, &[])
            .await
            .is_ok());

        server.revoke_all_tokens();
        let err = service
            .client()
            .list(DirectoryResource::Services, &[])
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::SessionExpired);

        assert!(!service.is_authenticated());
        assert!(!service.guard(Capability::Authenticated, "/profile").is_allowed());
        assert_eq!(expiry.drain_pending(), 1);
        assert_eq!(navigator.visited(), vec!["/login".to_string()]);

        // Anonymous requests keep working.
        assert!(service
            .client()
            .list(DirectoryResource::Services, &[])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_profile_update() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "volunteer");
        let service = service(&server.base_url());
        service.login("a@x.org", "secret1").await.unwrap();

        server.revoke_all_tokens();
        let err = service
            .update_profile(ProfileUpdate::city("Helsinki"))
            .await
            .unwrap_err();
        assert!(err.is_session_expired());
        assert!(service.current_session().is_none());
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    #[tokio::test]
    async fn test_volunteer_profile_update_keeps_role() {
        let server = StubServer::start().await;
        server.add_user("v@x.org", "secret1", "volunteer");
        let service = service(&server.base_url());
        service.login("v@x.org", "secret1").await.unwrap();

        let session = service
            .update_profile(ProfileUpdate::city("Helsinki"))
            .await
            .unwrap();
        assert_eq!(session.role(), Role::Volunteer);
        assert_eq!(session.city(), Some("Helsinki"));
        assert!(service.is_volunteer());
        assert!(!service.is_admin());
    }

    #[tokio::test]
    async fn test_refresh_profile_keeps_credential() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        let service = service(&server.base_url());
        let signed_in = service.login("a@x.org", "secret1").await.unwrap();

        let refreshed = service.refresh_profile().await.unwrap();
        assert_eq!(refreshed.bearer(), signed_in.bearer());
        assert!(refreshed.field("createdAt").is_some());
        assert!(service.is_authenticated());
    }

    #[tokio::test]
    async fn test_email_conflict_is_profile_error() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        server.add_user("b@x.org", "secret1", "user");
        let service = service(&server.base_url());
        service.login("a@x.org", "secret1").await.unwrap();

        let err = service
            .update_profile(ProfileUpdate {
                email: Some("b@x.org".into()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already in use");
        assert_eq!(service.status().error.unwrap().scope, ErrorScope::Profile);
        assert_eq!(service.current_session().unwrap().email(), "a@x.org");
    }

    // =========================================================================
    // ADMIN & DIRECTORY
    // =========================================================================

    #[tokio::test]
    async fn test_admin_only_write() {
        let server = StubServer::start().await;
        server.add_user("a@x.org", "secret1", "user");
        server.add_user("ops@x.org", "secret1", "admin");
        let service = service(&server.base_url());

        service.login("a@x.org", "secret1").await.unwrap();
        let err = service
            .client()
            .create(DirectoryResource::Categories, json!({"name": "Transport"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not authorized as an admin");
        assert!(service.is_authenticated());

        service.logout();
        service.login("ops@x.org", "secret1").await.unwrap();
        let created = service
            .client()
            .create(DirectoryResource::Categories, json!({"name": "Transport"}))
            .await
            .unwrap();
        assert_eq!(created["name"], "Transport");

        let categories = service
            .client()
            .list(DirectoryResource::Categories, &[])
            .await
            .unwrap();
        assert_eq!(categories.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_list_filters_reach_server() {
        let server = StubServer::start().await;
        let service = service(&server.base_url());

        let services = service
            .client()
            .list(DirectoryResource::Services, &[("category", "c2")])
            .await
            .unwrap();
        assert_eq!(services, json!([{"_id": "s2", "name": "Hospital transport", "category": "c2"}]));

        let health = service.client().health_check().await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let server = StubServer::start().await;
        let base_url = server.base_url();
        drop(server);
        tokio::task::yield_now().await;

        let service = service(&base_url);
        let err = service.login("a@x.org", "secret1").await.unwrap_err();
        assert!(matches!(err, SessionError::Network { .. }));
        assert_eq!(service.status().phase, AuthPhase::Anonymous);
    }
}
