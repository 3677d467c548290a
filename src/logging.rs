use color_eyre::Result;
use dirs::data_dir;
use std::env;
use std::path::PathBuf;
use strip_ansi_escapes::Writer;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::{Layer, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE: &str = "error.log";

/// Directory holding the log file.
/// Falls back to the working directory when there is no user data dir.
fn log_dir() -> Result<PathBuf> {
    let base = match data_dir() {
        Some(dir) => dir,
        None => env::current_dir()?,
    };

    Ok(base.join(env!("CARGO_PKG_NAME")))
}

struct MakeFileWriter {
    file_writer: NonBlocking,
}

impl MakeFileWriter {
    const fn new(file_writer: NonBlocking) -> Self {
        Self { file_writer }
    }
}

impl<'a> MakeWriter<'a> for MakeFileWriter {
    type Writer = Writer<NonBlocking>;

    fn make_writer(&'a self) -> Self::Writer {
        Writer::new(self.file_writer.clone())
    }
}

/// Installs the global tracing subscriber.
///
/// Logs go to stderr, since stdout carries the host protocol,
/// and warnings are also appended to a log file in the user data dir.
/// The returned guard must be held until exit to flush the file writer.
pub fn install_tracing(debug: bool) -> Result<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    let file_filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;

    let appender = tracing_appender::rolling::never(log_dir()?, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .with(
            Layer::default()
                .with_writer(MakeFileWriter::new(file_writer))
                .with_ansi(false)
                .with_filter(file_filter_layer),
        )
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_is_namespaced() {
        let dir = log_dir().unwrap();
        assert!(dir.ends_with("battery-bridge"));
    }
}
