use super::*;
use crate::auth::{AuthSignal, Identity};
use crate::navigation::Route;
use crate::sync::test_support::{MockBackend, MockCredentials};
use crate::sync::{CredentialError, SyncedUser};

const LIMIT: Duration = Duration::from_secs(5);

type TestController = SessionController<MockCredentials, MockBackend>;

fn controller() -> (TestController, Arc<MockCredentials>, Arc<MockBackend>) {
    let credentials = MockCredentials::new();
    let backend = MockBackend::new();
    let controller = SessionController::new(Arc::clone(&credentials), Arc::clone(&backend), LIMIT);
    (controller, credentials, backend)
}

fn alice(session: &str) -> AuthState {
    AuthState::Authenticated(Identity::new("user_alice", session).with_first_name("Alice"))
}

// =========================================================================
// sync_edge
// =========================================================================

#[test]
fn sync_edge_fires_only_into_authenticated() {
    assert_eq!(sync_edge(&AuthState::Unknown, &alice("s1")), SyncEdge::SignedIn);
    assert_eq!(sync_edge(&AuthState::Unauthenticated, &alice("s1")), SyncEdge::SignedIn);
    assert_eq!(sync_edge(&AuthState::Unknown, &AuthState::Unauthenticated), SyncEdge::None);
    assert_eq!(sync_edge(&alice("s1"), &AuthState::Unauthenticated), SyncEdge::SignedOut);
    assert_eq!(sync_edge(&AuthState::Unauthenticated, &AuthState::Unauthenticated), SyncEdge::None);
}

#[test]
fn sync_edge_treats_new_session_as_sign_in() {
    assert_eq!(sync_edge(&alice("s1"), &alice("s1")), SyncEdge::None);
    assert_eq!(sync_edge(&alice("s1"), &alice("s2")), SyncEdge::SignedIn);

    let renamed = AuthState::Authenticated(Identity::new("user_alice", "s1").with_first_name("Al"));
    assert_eq!(sync_edge(&alice("s1"), &renamed), SyncEdge::None);
}

// =========================================================================
// Navigation
// =========================================================================

#[tokio::test]
async fn starts_pending_at_root() {
    let (c, _, _) = controller();
    assert_eq!(c.view(), RouteSelection::Pending);
    assert_eq!(c.location(), "/");
    assert_eq!(*c.sync_status(), SyncStatus::Idle);
    assert_eq!(c.generation().value(), 0);
}

#[tokio::test]
async fn navigate_while_unknown_keeps_requested_path() {
    let (mut c, _, backend) = controller();
    assert_eq!(c.navigate("/dashboard"), RouteSelection::Pending);
    assert_eq!(c.location(), "/dashboard");
    assert_eq!(c.view(), RouteSelection::Pending);
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn redirects_follow_replace_semantics() {
    let (mut c, _, _) = controller();
    c.observe_auth(AuthState::Unauthenticated);

    assert_eq!(c.navigate("/quizzes/7"), RouteSelection::RedirectTo(Route::Login));
    assert_eq!(c.location(), "/login");
    assert_eq!(c.view(), RouteSelection::LoginView);

    assert_eq!(c.navigate("/login"), RouteSelection::LoginView);
    assert_eq!(c.location(), "/login");
}

#[tokio::test]
async fn unchanged_state_is_a_no_op() {
    let (mut c, credentials, _) = controller();
    c.observe_auth(alice("s1"));
    let before = c.snapshot();
    let generation = c.generation();

    for _ in 0..3 {
        assert_eq!(c.observe_auth(alice("s1")), RouteSelection::DashboardView);
    }

    assert_eq!(c.snapshot(), before);
    assert_eq!(c.generation(), generation);
    c.next_report().await.unwrap();
    assert_eq!(credentials.issued(), 1);
}

// =========================================================================
// Sync triggering
// =========================================================================

#[tokio::test]
async fn sign_in_renders_dashboard_before_sync_completes() {
    let (mut c, _, backend) = controller();
    let gate = backend.hold("tok-1");
    c.observe_auth(AuthState::Unauthenticated);

    let selection = c.observe_auth(alice("s1"));

    assert_eq!(selection, RouteSelection::RedirectTo(Route::Dashboard));
    assert_eq!(c.view(), RouteSelection::DashboardView);
    assert_eq!(c.location(), "/dashboard");
    assert!(matches!(c.sync_status(), SyncStatus::InFlight { .. }));

    gate.notify_one();
    let report = c.next_report().await.unwrap();
    assert!(matches!(c.apply_report(report), ReportDisposition::Applied(SyncStatus::Acknowledged { .. })));
}

#[tokio::test]
async fn sign_out_does_not_sync() {
    let (mut c, credentials, backend) = controller();
    c.observe_auth(AuthState::Unauthenticated);
    c.observe_auth(alice("s1"));
    let report = c.next_report().await.unwrap();
    c.apply_report(report);

    c.observe_auth(AuthState::Unauthenticated);

    assert_eq!(*c.sync_status(), SyncStatus::Idle);
    assert_eq!(c.view(), RouteSelection::LoginView);
    tokio::task::yield_now().await;
    assert_eq!(credentials.issued(), 1);
    assert_eq!(backend.seen(), vec!["tok-1"]);
}

#[tokio::test]
async fn each_sign_in_edge_syncs_once() {
    let (mut c, credentials, backend) = controller();
    c.observe_auth(AuthState::Unauthenticated);

    for session in ["s1", "s2", "s3"] {
        c.observe_auth(alice(session));
        c.observe_auth(alice(session));
        let report = c.next_report().await.unwrap();
        assert!(matches!(c.apply_report(report), ReportDisposition::Applied(_)));
        c.observe_auth(AuthState::Unauthenticated);
    }

    assert_eq!(credentials.issued(), 3);
    assert_eq!(backend.seen(), vec!["tok-1", "tok-2", "tok-3"]);
}

#[tokio::test]
async fn credential_failure_leaves_navigation_alone() {
    let (mut c, credentials, backend) = controller();
    credentials.fail_next(CredentialError::Unavailable("provider offline".into()));
    c.observe_auth(alice("s1"));

    let report = c.next_report().await.unwrap();
    let disposition = c.apply_report(report);

    match disposition {
        ReportDisposition::Applied(SyncStatus::Failed { reason, .. }) => {
            assert!(reason.contains("provider offline"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(c.view(), RouteSelection::DashboardView);
    assert!(backend.seen().is_empty());
}

// =========================================================================
// Supersession
// =========================================================================

#[tokio::test]
async fn rapid_resign_in_discards_first_attempt() {
    let (mut c, _, backend) = controller();
    let first_gate = backend.hold("tok-1");
    c.observe_auth(AuthState::Unauthenticated);

    c.observe_auth(alice("s1"));
    let first = c.generation();
    c.observe_auth(AuthState::Unauthenticated);
    c.observe_auth(alice("s2"));
    let second = c.generation();

    let report = c.next_report().await.unwrap();
    assert_eq!(report.generation, second);
    let applied = c.apply_report(report);
    assert_eq!(
        applied,
        ReportDisposition::Applied(SyncStatus::Acknowledged {
            generation: second,
            user: Some(SyncedUser { id: 1, clerk_id: "tok-2".into() }),
        })
    );

    first_gate.notify_one();
    let late = c.next_report().await.unwrap();
    assert_eq!(c.apply_report(late), ReportDisposition::Discarded { generation: first });
    assert!(matches!(c.sync_status(), SyncStatus::Acknowledged { generation, .. } if *generation == second));
    assert_eq!(backend.seen(), vec!["tok-1", "tok-2"]);
}

#[tokio::test]
async fn coalesced_session_switch_supersedes_attempt() {
    let (mut c, _, backend) = controller();
    let first_gate = backend.hold("tok-1");

    c.observe_auth(alice("s1"));
    let first = c.generation();
    c.observe_auth(alice("s2"));

    let report = c.next_report().await.unwrap();
    assert!(matches!(c.apply_report(report), ReportDisposition::Applied(_)));

    first_gate.notify_one();
    let late = c.next_report().await.unwrap();
    assert_eq!(c.apply_report(late), ReportDisposition::Discarded { generation: first });
}

#[tokio::test]
async fn sign_out_discards_in_flight_result() {
    let (mut c, _, backend) = controller();
    let gate = backend.hold("tok-1");
    c.observe_auth(alice("s1"));
    let attempt = c.generation();

    c.observe_auth(AuthState::Unauthenticated);
    gate.notify_one();

    let late = c.next_report().await.unwrap();
    assert_eq!(c.apply_report(late), ReportDisposition::Discarded { generation: attempt });
    assert_eq!(*c.sync_status(), SyncStatus::Idle);
    assert_eq!(c.view(), RouteSelection::LoginView);
}

// =========================================================================
// End-to-end scenario
// =========================================================================

#[tokio::test]
async fn bootstrap_sign_in_and_failed_sync_scenario() {
    let (mut c, _, backend) = controller();
    backend.fail("tok-1");

    assert_eq!(c.navigate("/dashboard"), RouteSelection::Pending);
    assert!(backend.seen().is_empty());

    assert_eq!(c.observe_auth(AuthState::Unauthenticated), RouteSelection::RedirectTo(Route::Login));
    assert_eq!(c.view(), RouteSelection::LoginView);
    tokio::task::yield_now().await;
    assert!(backend.seen().is_empty());

    c.observe_auth(alice("s1"));
    assert_eq!(c.view(), RouteSelection::DashboardView);

    let report = c.next_report().await.unwrap();
    assert_eq!(backend.seen(), vec!["tok-1"]);
    let disposition = c.apply_report(report);

    assert!(matches!(disposition, ReportDisposition::Applied(SyncStatus::Failed { .. })));
    assert_eq!(c.view(), RouteSelection::DashboardView);
    assert_eq!(c.location(), "/dashboard");
}

// =========================================================================
// Event loop
// =========================================================================

async fn wait_for<F>(rx: &mut watch::Receiver<ViewUpdate>, predicate: F) -> ViewUpdate
where
    F: Fn(&ViewUpdate) -> bool,
{
    let update = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|u| predicate(u)))
        .await
        .expect("timed out waiting for view update")
        .expect("controller stopped");
    update.clone()
}

#[tokio::test]
async fn run_loop_drives_signal_navigation_and_sync() {
    let (c, _, backend) = controller();
    let signal = AuthSignal::new();
    let (nav_tx, nav_rx) = mpsc::channel(4);
    let (updates_tx, mut updates_rx) = watch::channel(c.snapshot());
    let driver = tokio::spawn(c.run(signal.subscribe(), nav_rx, updates_tx));

    nav_tx.send("/dashboard".to_owned()).await.unwrap();
    let update = wait_for(&mut updates_rx, |u| u.location == "/dashboard").await;
    assert_eq!(update.view, RouteSelection::Pending);

    signal.sign_out();
    let update = wait_for(&mut updates_rx, |u| u.view == RouteSelection::LoginView).await;
    assert_eq!(update.location, "/login");

    signal.sign_in(Identity::new("user_alice", "s1")).unwrap();
    let update = wait_for(&mut updates_rx, |u| matches!(u.sync, SyncStatus::Acknowledged { .. })).await;
    assert_eq!(update.view, RouteSelection::DashboardView);
    assert_eq!(backend.seen(), vec!["tok-1"]);

    drop(signal);
    tokio::time::timeout(Duration::from_secs(2), driver)
        .await
        .expect("controller did not stop")
        .unwrap();
}
