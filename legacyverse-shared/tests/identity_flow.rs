//! End-to-end identity flows against the in-memory store

use chrono::Duration;
use legacyverse_shared::auth::middleware::AuthContext;
use legacyverse_shared::clock::ManualClock;
use legacyverse_shared::identity::input::{
    ChangePasswordInput, ForgotPasswordInput, LoginInput, RefreshInput, RegisterInput,
    ResetPasswordInput,
};
use legacyverse_shared::identity::{AuthSession, IdentityError, IdentityService, IdentitySettings};
use legacyverse_shared::notify::{reset_token_from_url, Notification, RecordingNotifier};
use legacyverse_shared::store::memory::MemoryStore;
use std::sync::Arc;

const SECRET: &str = "integration-test-secret-that-is-long-enough";
const PASSWORD: &str = "river-stone-42";

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    clock: ManualClock,
    service: IdentityService,
}

fn harness_with(settings: IdentitySettings, notifier: RecordingNotifier) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let clock = ManualClock::starting_now();
    let service = IdentityService::new(
        store.clone(),
        notifier.clone(),
        Arc::new(clock.clone()),
        settings,
    );

    Harness {
        store,
        notifier,
        clock,
        service,
    }
}

fn harness() -> Harness {
    harness_with(IdentitySettings::new(SECRET), RecordingNotifier::new())
}

impl Harness {
    async fn register(&self, fullname: &str, email: &str) -> AuthSession {
        self.service
            .register(RegisterInput {
                fullname: fullname.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                confirm_password: PASSWORD.to_string(),
            })
            .await
            .expect("registration should succeed")
    }

    fn caller(&self, session: &AuthSession) -> AuthContext {
        let claims = self
            .service
            .tokens()
            .verify_access(&session.access)
            .expect("access token should verify");
        AuthContext::from_claims(&claims)
    }

    async fn request_reset(&self, email: &str) -> String {
        self.service
            .forgot_password(ForgotPasswordInput {
                email: email.to_string(),
            })
            .await
            .expect("forgot password should succeed");

        match self.notifier.last_for(email).await {
            Some(Notification::PasswordReset { reset_url, .. }) => reset_token_from_url(&reset_url)
                .expect("reset link should carry a token")
                .to_string(),
            other => panic!("expected a reset notification, got {:?}", other),
        }
    }

    async fn reset(&self, token: &str, password: &str) -> Result<(), IdentityError> {
        self.service
            .reset_password(ResetPasswordInput {
                token: token.to_string(),
                new_password: password.to_string(),
                confirm_password: password.to_string(),
            })
            .await
    }

    async fn refresh(&self, refresh: &str) -> Result<String, IdentityError> {
        self.service
            .refresh(RefreshInput {
                refresh: refresh.to_string(),
            })
            .await
    }
}

#[tokio::test]
async fn test_usernames_derived_from_full_name() {
    let h = harness();

    let first = h.register("John Doe", "john@example.com").await;
    let second = h.register("John Doe", "john.doe@example.com").await;
    let third = h.register("John Doe", "jd@example.com").await;

    assert_eq!(first.user.username, "johndoe");
    assert_eq!(second.user.username, "johndoe1");
    assert_eq!(third.user.username, "johndoe2");
}

#[tokio::test]
async fn test_placeholder_username_for_symbol_only_name() {
    let h = harness();

    let session = h.register("???", "anon@example.com").await;

    assert_eq!(session.user.username.len(), 8);
    assert!(session.user.username.starts_with("user"));
}

#[tokio::test]
async fn test_duplicate_email_rejected_without_side_effects() {
    let h = harness();
    h.register("Jane Doe", "jane@example.com").await;

    let err = h
        .service
        .register(RegisterInput {
            fullname: "Another Jane".to_string(),
            email: "JANE@example.com".to_string(),
            password: PASSWORD.to_string(),
            confirm_password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();

    match err {
        IdentityError::Validation(details) => assert_eq!(details[0].field, "email"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.store.user_count().await, 1);
    assert_eq!(h.store.profile_count().await, 1);
}

#[tokio::test]
async fn test_login_issues_working_pair() {
    let h = harness();
    let registered = h.register("Jane Doe", "jane@example.com").await;

    let session = h
        .service
        .login(LoginInput {
            email: " Jane@Example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.user.id, registered.user.id);
    assert!(h.refresh(&session.refresh).await.is_ok());
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let caller = h.caller(&session);

    h.service
        .logout(
            &caller,
            RefreshInput {
                refresh: session.refresh.clone(),
            },
        )
        .await
        .unwrap();

    let err = h.refresh(&session.refresh).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidToken));

    // Already revoked is still a successful logout
    h.service
        .logout(
            &caller,
            RefreshInput {
                refresh: session.refresh.clone(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_token_single_use() {
    let h = harness();
    h.register("Jane Doe", "jane@example.com").await;
    let token = h.request_reset("jane@example.com").await;

    h.reset(&token, "new-river-stone-7").await.unwrap();

    let err = h.reset(&token, "another-river-9").await.unwrap_err();
    assert!(matches!(err, IdentityError::TokenAlreadyUsed));
}

#[tokio::test]
async fn test_reset_token_expires_after_an_hour() {
    let h = harness();
    h.register("Jane Doe", "jane@example.com").await;
    let token = h.request_reset("jane@example.com").await;

    h.clock.advance(Duration::minutes(61));

    let err = h.reset(&token, "new-river-stone-7").await.unwrap_err();
    assert!(matches!(err, IdentityError::TokenExpired));
}

#[tokio::test]
async fn test_unknown_reset_token() {
    let h = harness();

    let err = h.reset("0123456789abcdefABCDEF0123456789", "new-river-stone-7").await.unwrap_err();
    assert!(matches!(err, IdentityError::TokenNotFound));
}

#[tokio::test]
async fn test_second_reset_request_supersedes_first() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let first = h.request_reset("jane@example.com").await;
    let second = h.request_reset("jane@example.com").await;

    let grants = h.store.reset_tokens_for(session.user.id).await;
    assert_eq!(grants.len(), 2);
    assert!(grants[0].is_used);
    assert!(!grants[1].is_used);

    let err = h.reset(&first, "new-river-stone-7").await.unwrap_err();
    assert!(matches!(err, IdentityError::TokenAlreadyUsed));
    h.reset(&second, "new-river-stone-7").await.unwrap();

    let grants = h.store.reset_tokens_for(session.user.id).await;
    assert!(grants.iter().all(|g| g.is_used));
}

#[tokio::test]
async fn test_reset_revokes_sessions_and_changes_password() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let token = h.request_reset("jane@example.com").await;

    h.reset(&token, "new-river-stone-7").await.unwrap();

    let err = h.refresh(&session.refresh).await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidToken));

    let old = h
        .service
        .login(LoginInput {
            email: "jane@example.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .await;
    assert!(matches!(old, Err(IdentityError::Authentication)));

    let new = h
        .service
        .login(LoginInput {
            email: "jane@example.com".to_string(),
            password: "new-river-stone-7".to_string(),
        })
        .await;
    assert!(new.is_ok());
}

#[tokio::test]
async fn test_forgot_password_unknown_email_is_silent() {
    let h = harness();

    let outcome = h
        .service
        .forgot_password(ForgotPasswordInput {
            email: "ghost@example.com".to_string(),
        })
        .await
        .unwrap();

    assert!(outcome.token.is_none());
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_forgot_password_exposes_token_when_enabled() {
    let mut settings = IdentitySettings::new(SECRET);
    settings.expose_reset_token = true;
    let h = harness_with(settings, RecordingNotifier::new());
    h.register("Jane Doe", "jane@example.com").await;

    let outcome = h
        .service
        .forgot_password(ForgotPasswordInput {
            email: "jane@example.com".to_string(),
        })
        .await
        .unwrap();

    let token = outcome.token.expect("token should be exposed");
    h.reset(&token, "new-river-stone-7").await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reset_token_consumers() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let token = h.service.tokens().issue_reset_token(session.user.id).await.unwrap();

    let service = Arc::new(h.service);
    let a = {
        let service = service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.tokens().consume_reset_token(&token).await })
    };
    let b = {
        let service = service.clone();
        let token = token.clone();
        tokio::spawn(async move { service.tokens().consume_reset_token(&token).await })
    };

    let outcomes = [a.await.unwrap(), b.await.unwrap()];
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    let already_used = outcomes
        .iter()
        .filter(|o| matches!(o, Err(IdentityError::TokenAlreadyUsed)))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(already_used, 1);
}

#[tokio::test]
async fn test_change_password_revokes_sessions_by_default() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let caller = h.caller(&session);

    h.service
        .change_password(
            &caller,
            ChangePasswordInput {
                old_password: PASSWORD.to_string(),
                new_password: "new-river-stone-7".to_string(),
                confirm_password: "new-river-stone-7".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        h.refresh(&session.refresh).await,
        Err(IdentityError::InvalidToken)
    ));
    assert!(matches!(
        h.notifier.last_for("jane@example.com").await,
        Some(Notification::PasswordChanged { .. })
    ));
}

#[tokio::test]
async fn test_change_password_keeps_sessions_when_disabled() {
    let mut settings = IdentitySettings::new(SECRET);
    settings.revoke_sessions_on_password_change = false;
    let h = harness_with(settings, RecordingNotifier::new());
    let session = h.register("Jane Doe", "jane@example.com").await;
    let caller = h.caller(&session);

    h.service
        .change_password(
            &caller,
            ChangePasswordInput {
                old_password: PASSWORD.to_string(),
                new_password: "new-river-stone-7".to_string(),
                confirm_password: "new-river-stone-7".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(h.refresh(&session.refresh).await.is_ok());
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let h = harness();
    let session = h.register("Jane Doe", "jane@example.com").await;
    let caller = h.caller(&session);

    let err = h
        .service
        .change_password(
            &caller,
            ChangePasswordInput {
                old_password: "not-my-password".to_string(),
                new_password: "new-river-stone-7".to_string(),
                confirm_password: "new-river-stone-7".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::Authentication));
    assert!(h.refresh(&session.refresh).await.is_ok());
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_register() {
    let h = harness_with(IdentitySettings::new(SECRET), RecordingNotifier::failing());

    let session = h.register("Jane Doe", "jane@example.com").await;

    assert_eq!(session.user.username, "janedoe");
    assert_eq!(h.store.user_count().await, 1);
}
