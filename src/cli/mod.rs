mod commands;
mod serve;

use anyhow::{Context, Result, bail};
use console::style;
use std::path::PathBuf;

use crate::core::terminal::{self, GuideSection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Serve,
    Trigger(String),
    TriggerAll,
    Tasks,
    Help,
}

/// Flags shared by every command; unset values fall back to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
}

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Service")
        .command("serve", "Run the scheduler and the admin API (default)")
        .print();

    GuideSection::new("One-shot")
        .command("trigger <platform>", "Run one keepalive call for a platform now")
        .command("trigger-all", "Run every enabled keepalive task once")
        .command("tasks", "Show scheduled tasks and their counters")
        .print();

    GuideSection::new("Options")
        .command("--config <path>", "Settings file (default: <data dir>/config.toml)")
        .command("--db <path>", "SQLite database (default: <data dir>/keepalive.db)")
        .command("--api-host <host>", "Admin API bind address")
        .command("--api-port <port>", "Admin API port")
        .text("RUST_LOG controls verbosity; LLM_KEEPALIVE__AI__ZHIPU__KEYS style variables override runtime config.")
        .print();

    println!(
        "\n {} {} [command] [options]\n",
        style("Usage:").bold(),
        style("llm-keepalive").green()
    );
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

/// Parses `argv` without the program name.
pub(crate) fn parse_args(args: &[String]) -> Result<(Command, CliOptions)> {
    let mut command: Option<Command> = None;
    let mut options = CliOptions::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                options.config = Some(PathBuf::from(flag_value(args, i, "--config")?));
                i += 2;
            }
            "--db" => {
                options.db = Some(PathBuf::from(flag_value(args, i, "--db")?));
                i += 2;
            }
            "--api-host" => {
                options.api_host = Some(flag_value(args, i, "--api-host")?.to_string());
                i += 2;
            }
            "--api-port" => {
                let raw = flag_value(args, i, "--api-port")?;
                let port = raw
                    .parse()
                    .with_context(|| format!("invalid --api-port value: {}", raw))?;
                options.api_port = Some(port);
                i += 2;
            }
            "help" | "--help" | "-h" => {
                command = Some(Command::Help);
                i += 1;
            }
            word if command.is_none() => {
                command = Some(match word {
                    "serve" => Command::Serve,
                    "trigger-all" => Command::TriggerAll,
                    "tasks" => Command::Tasks,
                    "trigger" => {
                        let platform = args
                            .get(i + 1)
                            .filter(|p| !p.starts_with("--"))
                            .context("trigger requires a platform code, e.g. `trigger zhipu`")?;
                        i += 1;
                        Command::Trigger(platform.clone())
                    }
                    other => bail!("Unknown command: {}", other),
                });
                i += 1;
            }
            other => bail!("Unexpected argument: {}", other),
        }
    }
    Ok((command.unwrap_or(Command::Serve), options))
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, options) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            print_help();
            return Err(e);
        }
    };

    match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Serve => serve::run_serve(&options).await,
        Command::Trigger(platform) => commands::run_trigger(&options, &platform).await,
        Command::TriggerAll => commands::run_trigger_all(&options).await,
        Command::Tasks => commands::run_tasks(&options).await,
    }
}
