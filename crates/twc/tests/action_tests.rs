//! Integration tests for operator actions

mod common;

use common::*;
use serde_json::json;
use twc::{ActionName, ActionOutcome, ActionParams, ContainerState, HookEvent, PeerState};
use twc_core::UnitStatus;

fn params(pairs: &[(&str, &str)]) -> ActionParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn action(outcome: twc::EventOutcome) -> ActionOutcome {
    outcome.action.expect("action should not be deferred")
}

// ─── Workflow and activity lists ───────────────────────────────────────────

#[tokio::test]
async fn test_add_remove_list_workflows() {
    let harness = Harness::new();
    let mut charm = harness.charm(ready_model());

    let added = action(
        charm
            .run_action(
                ActionName::AddWorkflows,
                &params(&[("workflows", "GreetingWorkflow, OrderWorkflow,GreetingWorkflow")]),
            )
            .await
            .unwrap(),
    );
    assert!(added.is_success());
    assert_eq!(
        added.result("supported-workflows"),
        Some(&json!(["GreetingWorkflow", "OrderWorkflow"]))
    );
    assert_eq!(
        harness.worker_env().await["TWC_SUPPORTED_WORKFLOWS"],
        "GreetingWorkflow,OrderWorkflow"
    );

    let removed = action(
        charm
            .run_action(
                ActionName::RemoveWorkflows,
                &params(&[("workflows", "GreetingWorkflow,Unknown")]),
            )
            .await
            .unwrap(),
    );
    assert_eq!(
        removed.result("supported-workflows"),
        Some(&json!(["OrderWorkflow"]))
    );

    let listed = action(
        charm
            .run_action(ActionName::ListWorkflows, &ActionParams::new())
            .await
            .unwrap(),
    );
    assert_eq!(listed.result("result"), Some(&json!("command succeeded")));
    assert_eq!(
        listed.result("supported-workflows"),
        Some(&json!(["OrderWorkflow"]))
    );
    assert_eq!(
        harness.worker_env().await["TEMPORAL_SUPPORTED_WORKFLOWS"],
        "OrderWorkflow"
    );
}

#[tokio::test]
async fn test_removing_last_activity_drops_variable() {
    let harness = Harness::new();
    let mut charm = harness.charm(ready_model());

    charm
        .run_action(ActionName::AddActivities, &params(&[("activities", "compose_greeting")]))
        .await
        .unwrap();
    assert!(harness
        .worker_env()
        .await
        .contains_key("TWC_SUPPORTED_ACTIVITIES"));

    charm
        .run_action(
            ActionName::RemoveActivities,
            &params(&[("activities", "compose_greeting")]),
        )
        .await
        .unwrap();
    assert!(!harness
        .worker_env()
        .await
        .contains_key("TWC_SUPPORTED_ACTIVITIES"));
}

#[tokio::test]
async fn test_list_actions_fail_on_non_leader() {
    let harness = Harness::new();
    let mut model = ready_model();
    model.peer = PeerState::new(Some(Default::default()), false);
    let mut charm = harness.charm(model);

    let outcome = action(
        charm
            .run_action(ActionName::AddWorkflows, &params(&[("workflows", "A")]))
            .await
            .unwrap(),
    );
    assert_eq!(
        outcome.failure.as_deref(),
        Some("action cannot be performed on non-leader unit")
    );

    // Reading works on every unit
    let listed = action(
        charm
            .run_action(ActionName::ListActivities, &ActionParams::new())
            .await
            .unwrap(),
    );
    assert!(listed.is_success());
    assert_eq!(listed.result("supported-activities"), Some(&json!([])));
}

#[tokio::test]
async fn test_list_actions_defer_without_peer_relation() {
    let harness = Harness::new();
    let mut model = ready_model();
    model.peer = PeerState::new(None, true);

    let outcome = harness
        .charm(model)
        .run_action(ActionName::AddWorkflows, &params(&[("workflows", "A")]))
        .await
        .unwrap();

    assert!(outcome.deferred);
    assert!(outcome.action.is_none());
    assert_eq!(outcome.status, UnitStatus::waiting("waiting for peer relation"));
}

#[tokio::test]
async fn test_missing_list_parameter() {
    let harness = Harness::new();

    let outcome = action(
        harness
            .charm(ready_model())
            .run_action(ActionName::AddActivities, &ActionParams::new())
            .await
            .unwrap(),
    );

    assert_eq!(
        outcome.failure.as_deref(),
        Some("`activities` is a required parameter")
    );
}

// ─── Dependencies ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_add_dependencies_installs_and_rejects() {
    let harness = Harness::new();
    let mut charm = harness.charm(ready_model());

    let outcome = action(
        charm
            .run_action(
                ActionName::AddDependencies,
                &params(&[("dependencies", "requests==2.31.0,bad;rm -rf,numpy")]),
            )
            .await
            .unwrap(),
    );

    assert!(outcome.is_success());
    assert_eq!(
        outcome.result("installed-dependencies"),
        Some(&json!(["requests==2.31.0", "numpy"]))
    );
    assert_eq!(
        outcome.result("rejected-dependencies"),
        Some(&json!(["bad;rm -rf"]))
    );
    assert_eq!(
        harness.container.state().await.executed,
        vec!["pip install requests==2.31.0", "pip install numpy"]
    );

    // A new pin replaces the old one
    let upgraded = action(
        charm
            .run_action(
                ActionName::AddDependencies,
                &params(&[("dependencies", "Requests==2.32.0")]),
            )
            .await
            .unwrap(),
    );
    assert_eq!(
        upgraded.result("installed-dependencies"),
        Some(&json!(["numpy", "Requests==2.32.0"]))
    );

    let listed = action(
        charm
            .run_action(ActionName::ListDependencies, &ActionParams::new())
            .await
            .unwrap(),
    );
    assert_eq!(
        listed.result("installed-dependencies"),
        Some(&json!(["numpy", "Requests==2.32.0"]))
    );
}

#[tokio::test]
async fn test_pip_errors_reject_dependency() {
    let mut state = ContainerState::default();
    state.exec_errors.insert(
        "pip install missing-package".to_string(),
        "ERROR: No matching distribution found for missing-package".to_string(),
    );
    state.exec_errors.insert(
        "pip install noisy".to_string(),
        "WARNING: Running pip as the 'root' user".to_string(),
    );
    let harness = Harness::new().with_container(state);

    let outcome = action(
        harness
            .charm(ready_model())
            .run_action(
                ActionName::AddDependencies,
                &params(&[("dependencies", "missing-package,noisy")]),
            )
            .await
            .unwrap(),
    );

    assert_eq!(outcome.result("installed-dependencies"), Some(&json!(["noisy"])));
    assert_eq!(
        outcome.result("rejected-dependencies"),
        Some(&json!(["missing-package"]))
    );
}

#[tokio::test]
async fn test_remove_dependencies() {
    let harness = Harness::new();
    let mut charm = harness.charm(ready_model());
    charm
        .run_action(ActionName::AddDependencies, &params(&[("dependencies", "numpy,pandas")]))
        .await
        .unwrap();

    let outcome = action(
        charm
            .run_action(
                ActionName::RemoveDependencies,
                &params(&[("dependencies", "pandas,scipy")]),
            )
            .await
            .unwrap(),
    );

    assert_eq!(outcome.result("installed-dependencies"), Some(&json!(["numpy"])));
    assert_eq!(outcome.result("removed-dependencies"), Some(&json!(["pandas"])));
    assert_eq!(outcome.result("rejected-dependencies"), Some(&json!(["scipy"])));
    assert!(harness
        .container
        .state()
        .await
        .executed
        .contains(&"pip uninstall -y pandas".to_string()));
}

#[tokio::test]
async fn test_dependencies_defer_without_pebble() {
    let harness = Harness::new().with_container(ContainerState {
        connectable: false,
        ..ContainerState::default()
    });

    let outcome = harness
        .charm(ready_model())
        .run_action(ActionName::AddDependencies, &params(&[("dependencies", "numpy")]))
        .await
        .unwrap();

    assert!(outcome.deferred);
    assert_eq!(outcome.status, UnitStatus::waiting("waiting for pebble api"));
}

// ─── Vault secrets ─────────────────────────────────────────────────────────

fn vault_model() -> twc::Model {
    let mut model = ready_model();
    model.vault = Some(vault_relation());
    model
}

#[tokio::test]
async fn test_add_then_get_vault_secret() {
    let vault = MockVault::new().with_secret("app", "existing", "kept");
    let harness = Harness::with_store(Harness::vault_store()).with_vault(vault.clone());
    let mut charm = harness.charm(vault_model());

    let added = action(
        charm
            .run_action(
                ActionName::AddVaultSecret,
                &params(&[("path", "app"), ("key", "token"), ("value", "t0k3n")]),
            )
            .await
            .unwrap(),
    );
    assert_eq!(added.result("result"), Some(&json!("secret successfully created")));
    assert_eq!(vault.get("app", "token").as_deref(), Some("t0k3n"));
    assert_eq!(vault.get("app", "existing").as_deref(), Some("kept"));

    let fetched = action(
        charm
            .run_action(
                ActionName::GetVaultSecret,
                &params(&[("path", "app"), ("key", "token")]),
            )
            .await
            .unwrap(),
    );
    assert_eq!(fetched.result("result"), Some(&json!("t0k3n")));
}

#[tokio::test]
async fn test_get_missing_vault_secret() {
    let harness = Harness::with_store(Harness::vault_store());

    let outcome = action(
        harness
            .charm(vault_model())
            .run_action(
                ActionName::GetVaultSecret,
                &params(&[("path", "app"), ("key", "absent")]),
            )
            .await
            .unwrap(),
    );

    let failure = outcome.failure.unwrap();
    assert!(
        failure.starts_with("Unable to read vault secret `absent` at path `app`"),
        "got: {}",
        failure
    );
}

#[tokio::test]
async fn test_vault_actions_require_relation() {
    let harness = Harness::new();

    let outcome = action(
        harness
            .charm(ready_model())
            .run_action(
                ActionName::GetVaultSecret,
                &params(&[("path", "app"), ("key", "token")]),
            )
            .await
            .unwrap(),
    );

    assert_eq!(outcome.failure.as_deref(), Some("No vault relation found"));
}

#[tokio::test]
async fn test_vault_action_parameters_required() {
    let harness = Harness::with_store(Harness::vault_store());

    let outcome = action(
        harness
            .charm(vault_model())
            .run_action(
                ActionName::AddVaultSecret,
                &params(&[("path", "app"), ("key", "token"), ("value", "")]),
            )
            .await
            .unwrap(),
    );

    assert_eq!(
        outcome.failure.as_deref(),
        Some("`path`, `key` and `value` are required parameters")
    );
}

#[tokio::test]
async fn test_vault_login_failure() {
    let harness = Harness::with_store(Harness::vault_store()).with_vault(MockVault::refusing());

    let outcome = action(
        harness
            .charm(vault_model())
            .run_action(
                ActionName::AddVaultSecret,
                &params(&[("path", "app"), ("key", "token"), ("value", "v")]),
            )
            .await
            .unwrap(),
    );

    assert_eq!(
        outcome.failure.as_deref(),
        Some("Unable to initialize vault client. Remove relation and retry.")
    );
}

// ─── Restart ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restart_running_worker() {
    let harness = Harness::new();
    let mut charm = harness.charm(ready_model());
    charm.handle(HookEvent::ConfigChanged).await.unwrap();

    let outcome = charm
        .run_action(ActionName::Restart, &ActionParams::new())
        .await
        .unwrap();

    assert_eq!(
        outcome.action.unwrap().result("result"),
        Some(&json!("worker successfully restarted"))
    );
    assert_eq!(outcome.status, UnitStatus::active(ACTIVE_MESSAGE));
    assert_eq!(harness.container.state().await.restarts, vec!["temporal-worker"]);
}

#[tokio::test]
async fn test_restart_before_first_plan_fails() {
    let harness = Harness::new();

    let outcome = action(
        harness
            .charm(ready_model())
            .run_action(ActionName::Restart, &ActionParams::new())
            .await
            .unwrap(),
    );

    assert!(!outcome.is_success());
    assert!(harness.container.state().await.restarts.is_empty());
}

#[tokio::test]
async fn test_restart_defers_without_pebble() {
    let harness = Harness::new().with_container(ContainerState {
        connectable: false,
        ..ContainerState::default()
    });

    let outcome = harness
        .charm(ready_model())
        .run_action(ActionName::Restart, &ActionParams::new())
        .await
        .unwrap();

    assert!(outcome.deferred);
    assert!(outcome.action.is_none());
}
