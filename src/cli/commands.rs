use anyhow::Result;
use console::style;
use tokio::sync::broadcast;

use super::CliOptions;
use super::serve::bootstrap;
use crate::core::tasks::success_rate;
use crate::core::terminal::{print_success, print_warn};
use crate::logging;

fn command_logging() {
    let (log_tx, _) = broadcast::channel::<String>(16);
    logging::init_tracing(log_tx, logging::COMMAND_LOG_FILTER, false);
}

pub(crate) async fn run_trigger(options: &CliOptions, platform: &str) -> Result<()> {
    command_logging();
    let runtime = bootstrap(options).await?;
    let log = runtime.orchestrator.trigger_platform(platform).await?;
    let line = format!("{} ({}ms)", log.title, log.duration_ms);
    if log.is_success() {
        print_success(&line);
    } else {
        print_warn(&line);
        if let Some(error) = &log.error_message {
            println!("    {}", style(error).dim());
        }
    }
    Ok(())
}

pub(crate) async fn run_trigger_all(options: &CliOptions) -> Result<()> {
    command_logging();
    let runtime = bootstrap(options).await?;
    let reports = runtime.orchestrator.trigger_all().await?;
    if reports.is_empty() {
        print_warn("No enabled keepalive tasks.");
        return Ok(());
    }
    for report in &reports {
        let status = match report.status {
            "success" => style(report.status).green(),
            "failed" => style(report.status).red(),
            other => style(other).yellow(),
        };
        println!("  {:<28} {}", report.task_code, status);
    }
    Ok(())
}

pub(crate) async fn run_tasks(options: &CliOptions) -> Result<()> {
    command_logging();
    let runtime = bootstrap(options).await?;
    let tasks = runtime.orchestrator.tasks().list_all().await?;
    println!(
        "{}",
        style(format!(
            "{:<28} {:<14} {:<8} {:<16} {:>6} {:>6} {:>6} {:>7}",
            "TASK", "TYPE", "ENABLED", "CRON", "TOTAL", "OK", "FAIL", "RATE"
        ))
        .bold()
    );
    for task in &tasks {
        println!(
            "{:<28} {:<14} {:<8} {:<16} {:>6} {:>6} {:>6} {:>6.1}%",
            task.task_code,
            task.task_type.as_str(),
            if task.enabled { "yes" } else { "no" },
            task.cron_expression,
            task.total_executions,
            task.success_executions,
            task.failed_executions,
            success_rate(task.success_executions, task.failed_executions),
        );
    }
    Ok(())
}
