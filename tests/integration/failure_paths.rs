//! Failure-path tests: every failure mode must surface as an explicit
//! error, leave the task in a Failed status, and touch worker
//! reputations only when execution itself was at fault.

use std::sync::Arc;

use serde_json::json;

use quorum::{EngineConfig, Error, Priority, Role, Subtask, SubtaskId, TaskStatus};

use crate::fixtures::{
    engine_with_config, engine_with_roles, EchoExecutor, FailOnTagExecutor, SlowExecutor,
};

#[tokio::test]
async fn test_unknown_task_type_fails_fast() {
    let (mut orchestrator, workers) =
        engine_with_roles(&[Role::Analyst], Arc::new(EchoExecutor::new()));
    let task_id = orchestrator
        .create_task(
            "made_up_type",
            "no builder registered",
            vec![Role::Analyst],
            json!({}),
            Priority::Medium,
        )
        .unwrap();

    let result = orchestrator.execute(task_id).await;
    assert!(matches!(result, Err(Error::UnknownTaskType(t)) if t == "made_up_type"));

    let task = orchestrator.task(&task_id).unwrap();
    assert!(matches!(task.status, TaskStatus::Failed { .. }));
    assert!(task.subtasks.is_empty());
    // Allocation never ran, reputation untouched.
    assert_eq!(orchestrator.worker(&workers[0]).unwrap().performance(), 50.0);
}

#[tokio::test]
async fn test_unfillable_role_fails_the_allocation() {
    let (mut orchestrator, _) =
        engine_with_roles(&[Role::Analyst], Arc::new(EchoExecutor::new()));
    let task_id = orchestrator
        .create_task(
            "pair",
            "nobody researches here",
            vec![Role::Analyst, Role::Researcher],
            json!({}),
            Priority::Medium,
        )
        .unwrap();

    let result = orchestrator.execute(task_id).await;
    assert!(matches!(
        result,
        Err(Error::NoEligibleWorker(Role::Researcher))
    ));

    let task = orchestrator.task(&task_id).unwrap();
    assert!(matches!(task.status, TaskStatus::Failed { .. }));
    assert!(task.assigned_workers.is_empty());
}

#[tokio::test]
async fn test_cyclic_decomposition_fails_before_dispatch() {
    let (mut orchestrator, workers) = engine_with_roles(
        &[Role::Analyst, Role::Analyst],
        Arc::new(EchoExecutor::new()),
    );
    orchestrator.register_decomposition(
        "tangled",
        Box::new(|task_id| {
            let a = SubtaskId::derive(task_id, "a");
            let b = SubtaskId::derive(task_id, "b");
            vec![
                Subtask::with_deps(a.clone(), Role::Analyst, vec![b.clone()], "waits on b"),
                Subtask::with_deps(b, Role::Analyst, vec![a], "waits on a"),
            ]
        }),
    );

    let task_id = orchestrator
        .create_task(
            "tangled",
            "mutual deadlock",
            vec![Role::Analyst, Role::Analyst],
            json!({}),
            Priority::Medium,
        )
        .unwrap();

    let result = orchestrator.execute(task_id).await;
    match result {
        Err(Error::CyclicDependency { stuck }) => assert_eq!(stuck.len(), 2),
        other => panic!("Expected CyclicDependency, got {:?}", other.err()),
    }

    let task = orchestrator.task(&task_id).unwrap();
    assert!(matches!(task.status, TaskStatus::Failed { .. }));
    // No subtask ran, so no result was published and nobody was blamed.
    assert!(task.subtask_results.is_empty());
    let board = orchestrator.blackboard();
    assert_eq!(board.metric("subtasks_completed"), 0);
    for worker_id in &workers {
        assert_eq!(orchestrator.worker(worker_id).unwrap().performance(), 50.0);
    }
}

#[tokio::test]
async fn test_mid_graph_failure_stops_downstream_work() {
    // pipeline: research -> analysis -> execution; analysis fails.
    let (mut orchestrator, workers) = engine_with_roles(
        &[Role::Researcher, Role::Analyst, Role::Executor],
        Arc::new(FailOnTagExecutor {
            tag: "analysis".to_string(),
        }),
    );
    let task_id = orchestrator
        .create_task(
            "pipeline",
            "fails in the middle",
            vec![Role::Researcher, Role::Analyst, Role::Executor],
            json!({}),
            Priority::Medium,
        )
        .unwrap();

    let result = orchestrator.execute(task_id).await;
    match result {
        Err(Error::ExecutorFailure { subtask, .. }) => {
            assert!(subtask.ends_with("analysis"));
        }
        other => panic!("Expected ExecutorFailure, got {:?}", other.err()),
    }

    let task = orchestrator.task(&task_id).unwrap();
    assert!(matches!(task.status, TaskStatus::Failed { .. }));
    // The execution stage never got a result.
    let execution_id = SubtaskId::derive(&task.id, "execution");
    assert!(orchestrator
        .blackboard()
        .get_knowledge(execution_id.as_str())
        .is_none());
    // Execution-stage failure penalizes the assigned team.
    for worker_id in &workers {
        assert_eq!(orchestrator.worker(worker_id).unwrap().performance(), 45.0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_and_fails_the_task() {
    let (mut orchestrator, workers) = engine_with_config(
        EngineConfig {
            deadline_secs: 2,
            ..Default::default()
        },
        &[Role::Analyst, Role::Researcher],
        Arc::new(SlowExecutor),
    );
    let task_id = orchestrator
        .create_task(
            "pair",
            "never finishes in time",
            vec![Role::Analyst, Role::Researcher],
            json!({}),
            Priority::Medium,
        )
        .unwrap();

    let result = orchestrator.execute(task_id).await;
    assert!(matches!(result, Err(Error::Timeout(_))));

    let task = orchestrator.task(&task_id).unwrap();
    assert!(matches!(task.status, TaskStatus::Failed { .. }));
    // Timeout counts as an execution failure for the assigned team.
    for worker_id in &workers {
        assert_eq!(orchestrator.worker(worker_id).unwrap().performance(), 45.0);
    }
}

#[tokio::test]
async fn test_reputation_reflects_outcomes() {
    // A failing run drops every assigned worker to 45.
    let (mut orchestrator, workers) = engine_with_roles(
        &[Role::Researcher, Role::Analyst, Role::Executor],
        Arc::new(FailOnTagExecutor {
            tag: "execution".to_string(),
        }),
    );
    let failing = orchestrator
        .create_task(
            "pipeline",
            "fails at the end",
            vec![Role::Researcher, Role::Analyst, Role::Executor],
            json!({}),
            Priority::Medium,
        )
        .unwrap();
    let _ = orchestrator.execute(failing).await;
    for worker_id in &workers {
        assert_eq!(orchestrator.worker(worker_id).unwrap().performance(), 45.0);
    }

    // A fresh pool earning two clean runs climbs to 54.
    let (mut orchestrator, workers) = engine_with_roles(
        &[Role::Analyst, Role::Researcher],
        Arc::new(EchoExecutor::new()),
    );
    for _ in 0..2 {
        let task_id = orchestrator
            .create_task(
                "pair",
                "clean run",
                vec![Role::Analyst, Role::Researcher],
                json!({}),
                Priority::Medium,
            )
            .unwrap();
        orchestrator.execute(task_id).await.unwrap();
    }
    for worker_id in &workers {
        assert_eq!(orchestrator.worker(worker_id).unwrap().performance(), 54.0);
    }
}

#[tokio::test]
async fn test_failed_task_counts_in_intelligence() {
    let (mut orchestrator, _) =
        engine_with_roles(&[Role::Analyst], Arc::new(EchoExecutor::new()));
    let task_id = orchestrator
        .create_task(
            "unregistered",
            "will fail",
            vec![Role::Analyst],
            json!({}),
            Priority::Medium,
        )
        .unwrap();
    let _ = orchestrator.execute(task_id).await;

    let intelligence = orchestrator.system_intelligence();
    assert_eq!(intelligence.total_tasks, 1);
    assert_eq!(intelligence.failed, 1);
    assert_eq!(intelligence.success_rate, 0.0);
    assert_eq!(orchestrator.blackboard().metric("tasks_failed"), 1);
}
