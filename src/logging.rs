use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Filter for the long-running service when `RUST_LOG` is unset.
pub const SERVE_LOG_FILTER: &str = "info";
/// Filter for one-shot commands when `RUST_LOG` is unset.
pub const COMMAND_LOG_FILTER: &str = "warn";

/// Tees formatted log lines to stdout and to the `/api/logs` broadcast.
#[derive(Clone)]
pub(crate) struct SseMakeWriter {
    pub sender: broadcast::Sender<String>,
    pub suppress_stdout: bool,
}

impl<'a> MakeWriter<'a> for SseMakeWriter {
    type Writer = SseWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SseWriter {
            sender: self.sender.clone(),
            suppress_stdout: self.suppress_stdout,
        }
    }
}

pub(crate) struct SseWriter {
    sender: broadcast::Sender<String>,
    suppress_stdout: bool,
}

impl std::io::Write for SseWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).trim_end().to_string();
        // No receivers is fine.
        let _ = self.sender.send(msg);
        if !self.suppress_stdout {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.suppress_stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

/// Installs the global subscriber. Returns false when one was already set.
pub(crate) fn init_tracing(
    log_tx: broadcast::Sender<String>,
    default_filter: &str,
    suppress_stdout: bool,
) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(SseMakeWriter {
            sender: log_tx,
            suppress_stdout,
        })
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writer_broadcasts_trimmed_lines() {
        let (tx, mut rx) = broadcast::channel(4);
        let make = SseMakeWriter {
            sender: tx,
            suppress_stdout: true,
        };
        let mut writer = make.make_writer();
        writer.write_all(b"keepalive ran\n").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "keepalive ran");
    }

    #[test]
    fn writer_without_receivers_does_not_fail() {
        let (tx, rx) = broadcast::channel::<String>(4);
        drop(rx);
        let make = SseMakeWriter {
            sender: tx,
            suppress_stdout: true,
        };
        assert_eq!(make.make_writer().write(b"dropped").unwrap(), 7);
    }
}
