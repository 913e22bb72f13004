//! StateRegistry integration tests.

mod fixtures;

use fixtures::fast_config;
use fixtures::init_tracing;
use fixtures::MockLog;
use fixtures::MockStateMachine;
use fixtures::MockTransport;
use maplit::btreemap;
use repstate::Event;
use repstate::LeaderInternalState;
use repstate::LifecycleWorker;
use repstate::Role;
use repstate::StateGeneration;
use repstate::StateHandle;
use repstate::StateRegistry;

fn spawn_instance(id: u64, role: Role) -> StateHandle {
    LifecycleWorker::spawn(
        id,
        fast_config(),
        role,
        StateGeneration::INITIAL,
        MockLog::default(),
        MockStateMachine::default(),
        MockTransport::with_outcomes([Ok(5)]),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_registry_tracks_instances() -> anyhow::Result<()> {
    init_tracing();

    let registry = StateRegistry::new();
    assert!(registry.is_empty());

    registry.insert(spawn_instance(1, Role::Leader));
    registry.insert(spawn_instance(2, Role::Follower));

    assert_eq!(2, registry.len());
    assert!(registry.contains(1));
    assert!(!registry.contains(3));

    let dump = format!("{:?}", registry);
    assert!(dump.contains("StateRegistry"), "dump: {}", dump);

    assert_eq!(Some(StateGeneration::INITIAL), registry.generation_of(1));
    assert_eq!(None, registry.generation_of(3));

    let roles: std::collections::BTreeMap<u64, Role> = registry
        .all_statuses()
        .into_iter()
        .map(|(id, st)| (id, st.role()))
        .collect();
    assert_eq!(
        btreemap! {1 => Role::Leader, 2 => Role::Follower},
        roles
    );

    for id in [1, 2] {
        registry.remove(id).unwrap().shutdown().await;
    }
    assert!(registry.is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_registry_observes_lifecycle_progress() -> anyhow::Result<()> {
    init_tracing();

    let registry = StateRegistry::new();

    let handle = spawn_instance(7, Role::Leader);
    handle.submit(Event::LeadershipEstablished {
        generation: StateGeneration::new(1),
    })?;
    registry.insert(handle);

    fixtures::poll_until("registry observes the finished bootstrap", || {
        registry
            .status_of(7)
            .and_then(|st| st.as_leader().map(|l| l.manager_state.state))
            == Some(LeaderInternalState::ServiceAvailable)
    })
    .await?;

    assert_eq!(Some(StateGeneration::new(1)), registry.generation_of(7));

    registry.remove(7).unwrap().shutdown().await;
    Ok(())
}
