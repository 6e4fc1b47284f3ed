use chrono::Local;

use super::support::{Harness, Script};

#[tokio::test]
async fn keepalive_stats_break_down_today_by_platform() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["z1"]"#).await;
    h.set_keys("doubao", r#"["d1"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.enable("doubao_keepalive").await;

    h.orchestrator.run_scheduled("zhipu_keepalive").await;
    h.orchestrator.run_scheduled("zhipu_keepalive").await;
    h.doubao.set_script(Script::Fail);
    h.orchestrator.run_scheduled("doubao_keepalive").await;

    let stats = h.orchestrator.keepalive_stats(Local::now()).await.unwrap();
    assert_eq!(stats.today_total, 3);
    assert_eq!(stats.today_success, 2);
    assert_eq!(stats.today_failed, 1);
    let zhipu = &stats.platforms["zhipu"];
    assert_eq!((zhipu.count, zhipu.success, zhipu.failed), (2, 2, 0));
    assert!(zhipu.enabled);
    assert_eq!(stats.platforms["doubao"].failed, 1);
}

#[tokio::test]
async fn task_stats_count_every_run_today_not_just_last_per_task() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["z1"]"#).await;
    h.enable("zhipu_keepalive").await;
    for _ in 0..3 {
        h.orchestrator.run_scheduled("zhipu_keepalive").await;
    }

    let report = h.orchestrator.task_stats(Local::now()).await.unwrap();
    assert_eq!(report.today_total, 3);
    assert_eq!(report.tasks.tasks_run_today, 1);
    assert_eq!(report.tasks.total_tasks, 2);
    assert_eq!(report.tasks.enabled_tasks, 1);
    assert_eq!(report.tasks.success_rate, 100.0);
}

#[tokio::test]
async fn snapshots_report_keys_and_enablement() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["z1","z2"]"#).await;
    h.enable("zhipu_keepalive").await;

    let snapshots = h.orchestrator.platform_snapshots(Local::now()).await.unwrap();
    let zhipu = snapshots.iter().find(|s| s.code == "zhipu").unwrap();
    assert!(zhipu.task_enabled);
    assert!(zhipu.has_keys);
    assert_eq!(zhipu.key_count, 2);
    let doubao = snapshots.iter().find(|s| s.code == "doubao").unwrap();
    assert!(!doubao.task_enabled);
    assert!(!doubao.has_keys);
}

#[tokio::test]
async fn config_override_disables_task_in_stats_and_snapshots() {
    let h = Harness::new().await;
    h.set_keys("zhipu", r#"["z1"]"#).await;
    h.enable("zhipu_keepalive").await;
    h.config.set_override("task.zhipu_keepalive.enabled", "false");

    let stats = h.orchestrator.keepalive_stats(Local::now()).await.unwrap();
    assert!(!stats.platforms["zhipu"].enabled);
    let snapshots = h.orchestrator.platform_snapshots(Local::now()).await.unwrap();
    let zhipu = snapshots.iter().find(|s| s.code == "zhipu").unwrap();
    assert!(!zhipu.task_enabled);
    assert!(h.task("zhipu_keepalive").await.enabled);
}
