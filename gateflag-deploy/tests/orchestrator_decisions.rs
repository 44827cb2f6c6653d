//! Decision-table behaviour of the stack orchestrator against the in-memory
//! control plane.

use std::sync::Arc;
use std::time::Duration;

use gateflag_core::{OutputSet, ParameterSet, StackIdentity, StackNamer, StackStatus, WaitSettings};
use gateflag_deploy::fakes::{FakeOp, FakeStep, MemoryControlPlane};
use gateflag_deploy::{DeleteFailure, DeployFailure, StackOrchestrator};
use rstest::rstest;

const GLOBAL: &str = "Gateflag-global";
const TEAM01: &str = "Gateflag-team-Team01";

fn orchestrator(fake: &Arc<MemoryControlPlane>) -> StackOrchestrator {
    let wait = WaitSettings { poll_interval_secs: 5, max_wait_secs: 120 };
    StackOrchestrator::new(fake.clone(), StackNamer::new("Gateflag"), &wait)
}

fn params() -> ParameterSet {
    [("EnvironmentName", "Gateflag")].into_iter().collect()
}

#[tokio::test(start_paused = true)]
async fn absent_stack_is_created_once() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.set_outputs(GLOBAL, [("FlagServerHost", "https://flaggy.example")].into_iter().collect());

    let outputs = orchestrator(&fake)
        .deploy(&StackIdentity::Global, "{}", &params())
        .await
        .expect("deploy");

    assert_eq!(outputs.get("FlagServerHost"), Some("https://flaggy.example"));
    assert_eq!(outputs.len(), 1);
    assert_eq!(fake.mutations(), [(FakeOp::Create, GLOBAL.to_string())]);
}

#[tokio::test(start_paused = true)]
async fn healthy_stack_is_updated_once() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed_with(GLOBAL, StackStatus::CreateComplete, "old", params());

    orchestrator(&fake)
        .deploy(&StackIdentity::Global, "new", &params())
        .await
        .expect("deploy");

    assert_eq!(fake.mutations(), [(FakeOp::Update, GLOBAL.to_string())]);
    assert_eq!(fake.status_of(GLOBAL), Some(StackStatus::UpdateComplete));
    assert_eq!(fake.template_of(GLOBAL).as_deref(), Some("new"));
}

#[tokio::test(start_paused = true)]
async fn unchanged_update_is_success_with_current_outputs() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed_with(GLOBAL, StackStatus::UpdateComplete, "same", params());
    fake.set_outputs(GLOBAL, [("FlagServerHost", "https://flaggy.example")].into_iter().collect());

    let outputs = orchestrator(&fake)
        .deploy(&StackIdentity::Global, "same", &params())
        .await
        .expect("no-op update is success");

    assert_eq!(outputs.get("FlagServerHost"), Some("https://flaggy.example"));
    assert_eq!(fake.status_of(GLOBAL), Some(StackStatus::UpdateComplete));
}

#[rstest]
#[case::create(StackStatus::CreateInProgress)]
#[case::update(StackStatus::UpdateInProgress)]
#[case::cleanup(StackStatus::UpdateRollbackCompleteCleanupInProgress)]
#[case::deleting(StackStatus::DeleteInProgress)]
#[case::review(StackStatus::ReviewInProgress)]
#[tokio::test(start_paused = true)]
async fn busy_stack_is_refused_without_mutation(#[case] status: StackStatus) {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, status.clone());

    let failure = orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .unwrap_err();

    assert_eq!(failure, DeployFailure::Busy { stack: TEAM01.into(), status });
    assert!(fake.mutations().is_empty());
}

#[rstest]
#[case::rollback_complete(StackStatus::RollbackComplete)]
#[case::create_failed(StackStatus::CreateFailed)]
#[case::update_rollback_failed(StackStatus::UpdateRollbackFailed)]
#[case::unknown(StackStatus::Unknown("SOMETHING_NEW".into()))]
#[tokio::test(start_paused = true)]
async fn failed_stack_is_deleted_then_created(#[case] status: StackStatus) {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, status);

    orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .expect("replace");

    assert_eq!(
        fake.mutations(),
        [
            (FakeOp::Delete, TEAM01.to_string()),
            (FakeOp::Create, TEAM01.to_string()),
        ]
    );
    assert_eq!(fake.status_of(TEAM01), Some(StackStatus::CreateComplete));
}

#[tokio::test(start_paused = true)]
async fn replacement_that_rolls_back_is_terminal() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::RollbackComplete);
    fake.script(
        FakeOp::Create,
        TEAM01,
        [StackStatus::CreateInProgress, StackStatus::RollbackInProgress, StackStatus::RollbackComplete],
    );

    let failure = orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .unwrap_err();

    assert!(matches!(
        failure,
        DeployFailure::Terminal { status: StackStatus::RollbackComplete, .. }
    ));
    assert_eq!(
        fake.mutations(),
        [
            (FakeOp::Delete, TEAM01.to_string()),
            (FakeOp::Create, TEAM01.to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_delete_during_replace_creates_nothing() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::CreateFailed);
    fake.script(FakeOp::Delete, TEAM01, [StackStatus::DeleteInProgress, StackStatus::DeleteFailed]);

    let failure = orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .unwrap_err();

    match failure {
        DeployFailure::Replace(DeleteFailure::Terminal { status, .. }) => {
            assert_eq!(status, StackStatus::DeleteFailed)
        }
        other => panic!("expected replace failure, got {other:?}"),
    }
    assert_eq!(fake.count(FakeOp::Create, TEAM01), 0);
    assert_eq!(fake.mutations(), [(FakeOp::Delete, TEAM01.to_string())]);
}

#[tokio::test(start_paused = true)]
async fn create_that_rolls_back_reports_status_and_reason() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.script(
        FakeOp::Create,
        TEAM01,
        [StackStatus::CreateInProgress, StackStatus::RollbackInProgress, StackStatus::RollbackComplete],
    );
    fake.set_reason(TEAM01, "The image id '[ami-0015ec7d1ef8504ee]' does not exist");

    let failure = orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .unwrap_err();

    match failure {
        DeployFailure::Terminal { status, reason, .. } => {
            assert_eq!(status.as_str(), "ROLLBACK_COMPLETE");
            assert!(reason.unwrap_or_default().contains("ami-0015ec7d1ef8504ee"));
        }
        other => panic!("expected terminal failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_outputs_is_an_empty_success() {
    let fake = Arc::new(MemoryControlPlane::new());
    let outputs = orchestrator(&fake)
        .deploy(&StackIdentity::team("Team01"), "{}", &params())
        .await
        .expect("deploy");
    assert_eq!(outputs, OutputSet::empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_is_rechecked_once_before_failing() {
    let fake = Arc::new(MemoryControlPlane::new());
    // 120s deadline at 5s polls: 25 observations inside the window.
    let mut steps: Vec<FakeStep> = std::iter::repeat(FakeStep::Status(StackStatus::CreateInProgress))
        .take(25)
        .collect();
    steps.push(FakeStep::Status(StackStatus::CreateComplete));
    fake.script(FakeOp::Create, GLOBAL, steps);

    let outputs = orchestrator(&fake)
        .deploy(&StackIdentity::Global, "{}", &params())
        .await
        .expect("re-check sees CREATE_COMPLETE");
    assert!(outputs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stack_still_busy_after_recheck_times_out() {
    let fake = Arc::new(MemoryControlPlane::new());
    let steps = std::iter::repeat(FakeStep::Status(StackStatus::CreateInProgress)).take(100);
    fake.script(FakeOp::Create, GLOBAL, steps);

    let failure = orchestrator(&fake)
        .deploy(&StackIdentity::Global, "{}", &params())
        .await
        .unwrap_err();

    assert_eq!(
        failure,
        DeployFailure::TimedOut {
            stack: GLOBAL.into(),
            last_status: Some(StackStatus::CreateInProgress),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn caller_deadline_overrides_configured_wait() {
    let fake = Arc::new(MemoryControlPlane::new());
    let steps = std::iter::repeat(FakeStep::Status(StackStatus::CreateInProgress)).take(100);
    fake.script(FakeOp::Create, GLOBAL, steps);

    let failure = orchestrator(&fake)
        .with_max_wait(Duration::from_secs(10))
        .deploy(&StackIdentity::Global, "{}", &params())
        .await
        .unwrap_err();

    assert!(matches!(failure, DeployFailure::TimedOut { .. }));
    // Initial observe, polls at 0s, 5s and 10s, then the single re-check.
    assert_eq!(fake.count(FakeOp::Describe, GLOBAL), 5);
}

#[tokio::test(start_paused = true)]
async fn delete_of_absent_stack_makes_no_call() {
    let fake = Arc::new(MemoryControlPlane::new());
    orchestrator(&fake)
        .delete(&StackIdentity::team("Team01"))
        .await
        .expect("idempotent");
    assert!(fake.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_waits_until_gone() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::CreateComplete);
    fake.script(FakeOp::Delete, TEAM01, [FakeStep::from(StackStatus::DeleteInProgress), FakeStep::Gone]);

    orchestrator(&fake)
        .delete(&StackIdentity::team("Team01"))
        .await
        .expect("delete");

    assert_eq!(fake.mutations(), [(FakeOp::Delete, TEAM01.to_string())]);
    assert_eq!(fake.status_of(TEAM01), None);
}

#[tokio::test(start_paused = true)]
async fn delete_already_in_progress_is_awaited_not_reissued() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::DeleteInProgress);
    fake.queue(TEAM01, [FakeStep::from(StackStatus::DeleteInProgress), FakeStep::Gone]);

    orchestrator(&fake)
        .delete(&StackIdentity::team("Team01"))
        .await
        .expect("delete");
    assert!(fake.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn busy_stack_is_not_deleted() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::UpdateInProgress);

    let failure = orchestrator(&fake)
        .delete(&StackIdentity::team("Team01"))
        .await
        .unwrap_err();
    assert!(matches!(failure, DeleteFailure::Busy { .. }));
    assert!(fake.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_failed_is_terminal() {
    let fake = Arc::new(MemoryControlPlane::new());
    fake.seed(TEAM01, StackStatus::CreateComplete);
    fake.script(FakeOp::Delete, TEAM01, [StackStatus::DeleteInProgress, StackStatus::DeleteFailed]);

    let failure = orchestrator(&fake)
        .delete(&StackIdentity::team("Team01"))
        .await
        .unwrap_err();
    match failure {
        DeleteFailure::Terminal { status, .. } => assert_eq!(status, StackStatus::DeleteFailed),
        other => panic!("expected terminal failure, got {other:?}"),
    }
}
