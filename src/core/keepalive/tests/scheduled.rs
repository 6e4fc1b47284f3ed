use super::support::{Harness, Script, keepalive_task};
use crate::core::keepalive::{RunOutcome, SkipReason};
use crate::core::store::types::ExecutionStatus;

fn skip_reason(outcome: &RunOutcome) -> Option<SkipReason> {
    match outcome {
        RunOutcome::Skipped { reason } => Some(*reason),
        RunOutcome::Executed { .. } => None,
    }
}

#[tokio::test]
async fn zhipu_rotates_through_pool_in_order() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["k1","k2","k3"]"#).await;
    h.enable("zhipu_keepalive").await;

    for _ in 0..4 {
        let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
        assert_eq!(outcome.status_label(), "success");
    }

    assert_eq!(h.zhipu.seen(), vec!["k1", "k2", "k3", "k1"]);
    let task = h.task("zhipu_keepalive").await;
    assert_eq!(task.total_executions, 4);
    assert_eq!(task.success_executions, 4);
    assert_eq!(task.failed_executions, 0);
    assert_eq!(task.last_execution_status, Some(ExecutionStatus::Success));
    assert_eq!(h.log_count().await, 4);
}

#[tokio::test]
async fn empty_pool_skips_without_log_or_counter_change() {
    let h = Harness::new().await;
    h.enable("doubao_keepalive").await;

    let outcome = h.orchestrator.run_scheduled("doubao_keepalive").await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::NoCredentials));
    assert_eq!(h.log_count().await, 0);
    assert_eq!(h.task("doubao_keepalive").await.total_executions, 0);
    assert!(h.doubao.seen().is_empty());
}

#[tokio::test]
async fn unparsable_pool_is_treated_as_empty() {
    let h = Harness::new().await;
    h.set_keys("doubao", "k1,k2").await;
    h.enable("doubao_keepalive").await;

    let outcome = h.orchestrator.run_scheduled("doubao_keepalive").await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::NoCredentials));
    assert_eq!(h.task("doubao_keepalive").await.total_executions, 0);
}

#[tokio::test]
async fn disabled_task_is_skipped_silently() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["k1"]"#).await;

    let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::TaskDisabled));
    assert_eq!(h.log_count().await, 0);
    assert_eq!(h.task("zhipu_keepalive").await.total_executions, 0);
    assert!(h.zhipu.seen().is_empty());
}

#[tokio::test]
async fn config_override_can_force_disable_a_task() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["k1"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.config.set_override("task.zhipu_keepalive.enabled", "false");

    let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::TaskDisabled));

    h.config.clear_override("task.zhipu_keepalive.enabled");
    let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
    assert_eq!(outcome.status_label(), "success");
}

#[tokio::test]
async fn missing_task_is_skipped() {
    let h = Harness::new().await;
    let outcome = h.orchestrator.run_scheduled("nobody_keepalive").await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::TaskMissing));
}

#[tokio::test]
async fn adapter_failure_is_counted_as_failed_run() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["bad-key-123456"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.zhipu.set_script(Script::Fail);

    let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
    let log = outcome.log().unwrap();
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert!(log.id.is_some());

    let task = h.task("zhipu_keepalive").await;
    assert_eq!((task.total_executions, task.failed_executions), (1, 1));
    assert_eq!(task.last_execution_status, Some(ExecutionStatus::Failed));
}

#[tokio::test]
async fn adapter_panic_is_contained_and_recorded_as_failure() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["k1-abcdefgh"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.zhipu.set_script(Script::Panic);

    let outcome = h.orchestrator.run_scheduled("zhipu_keepalive").await;
    let log = outcome.log().unwrap();
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert!(log.error_message.as_deref().unwrap().contains("adapter aborted"));
    assert_eq!(log.content.api_key_masked, "sk-****efgh");
    assert_eq!(h.task("zhipu_keepalive").await.failed_executions, 1);
}

#[tokio::test]
async fn unsupported_platform_records_failure_on_scheduled_path() {
    let h = Harness::new().await;
    h.orchestrator
        .tasks()
        .create(keepalive_task(Some("ghost_keepalive"), Some("ghost")))
        .await
        .unwrap();
    h.set_keys("ghost", r#"["g1"]"#).await;

    let outcome = h.orchestrator.run_scheduled("ghost_keepalive").await;
    let log = outcome.log().unwrap();
    assert_eq!(log.status, ExecutionStatus::Failed);
    assert!(
        log.error_message
            .as_deref()
            .unwrap()
            .contains("unsupported platform: ghost")
    );
    let task = h.task("ghost_keepalive").await;
    assert_eq!((task.total_executions, task.failed_executions), (1, 1));
}

#[tokio::test]
async fn extra_task_rotates_independently_and_logs_under_its_own_code() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["k1","k2"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.orchestrator
        .tasks()
        .create(keepalive_task(Some("zhipu_backup"), Some("zhipu")))
        .await
        .unwrap();

    h.orchestrator.run_scheduled("zhipu_keepalive").await;
    let outcome = h.orchestrator.run_scheduled("zhipu_backup").await;
    h.orchestrator.run_scheduled("zhipu_keepalive").await;

    assert_eq!(outcome.log().unwrap().task_code, "zhipu_backup");
    assert_eq!(h.zhipu.seen(), vec!["k1", "k1", "k2"]);
    assert_eq!(h.task("zhipu_backup").await.total_executions, 1);
    assert_eq!(h.task("zhipu_keepalive").await.total_executions, 2);
}

#[tokio::test]
async fn generated_code_without_platform_has_no_credentials() {
    let h = Harness::new().await;
    let task = h
        .orchestrator
        .tasks()
        .create(keepalive_task(None, None))
        .await
        .unwrap();
    assert!(task.task_code.starts_with("task_keepalive_"));

    let outcome = h.orchestrator.run_scheduled(&task.task_code).await;
    assert_eq!(skip_reason(&outcome), Some(SkipReason::NoCredentials));
}
