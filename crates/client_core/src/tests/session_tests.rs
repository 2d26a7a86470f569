use super::*;
use shared::domain::{AppUserId, Role};

struct StaticProbe {
    outcome: Result<Option<AppUser>, ApiFailure>,
}

#[async_trait]
impl SessionProbe for StaticProbe {
    async fn current_user(&self) -> Result<Option<AppUser>, ApiFailure> {
        self.outcome.clone()
    }
}

fn admin() -> AppUser {
    AppUser {
        id: AppUserId::from("u-1"),
        username: "octocat".into(),
        avatar_url: None,
        role: Role::Admin,
    }
}

#[tokio::test]
async fn confirm_yields_context_for_signed_in_user() {
    let gate = SessionGate::new(Arc::new(StaticProbe {
        outcome: Ok(Some(admin())),
    }));
    assert_eq!(gate.state().await, SessionState::Unknown);

    let ctx = gate.confirm().await.expect("authenticated");
    assert_eq!(ctx.user().username, "octocat");
    assert_eq!(gate.state().await, SessionState::Authenticated(admin()));

    gate.forget().await;
    assert_eq!(gate.state().await, SessionState::Anonymous);
}

#[tokio::test]
async fn anonymous_session_is_refused() {
    let gate = SessionGate::new(Arc::new(MissingSessionProbe));
    assert_eq!(gate.confirm().await, Err(ControllerError::Unauthenticated));
    assert_eq!(gate.state().await, SessionState::Anonymous);
}

#[tokio::test]
async fn probe_failure_keeps_previous_state() {
    let gate = SessionGate::new(Arc::new(StaticProbe {
        outcome: Err(ApiFailure::Network("connection refused".into())),
    }));
    assert_eq!(gate.confirm().await, Err(ControllerError::Unauthenticated));
    assert_eq!(gate.state().await, SessionState::Unknown);
}

#[test]
fn redirect_targets_use_the_api_origin() {
    let login = login_url("http://localhost:8080/api", DEFAULT_LOGIN_PROVIDER).expect("login");
    assert_eq!(
        login.as_str(),
        "http://localhost:8080/oauth2/authorization/github"
    );
    let logout = logout_url("https://isp.example.com/api/").expect("logout");
    assert_eq!(logout.as_str(), "https://isp.example.com/logout");
    assert!(matches!(
        login_url("not a url", "github"),
        Err(ApiFailure::InvalidUrl(_))
    ));
}
