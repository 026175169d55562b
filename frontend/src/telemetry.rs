//! Logging setup. In the browser every event goes to the developer console.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber. Calling it again is an error, not a panic.
pub fn init_logging(filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(filter)?;

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(console::ConsoleMakeWriter)
            .with_ansi(false)
            .without_time()
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io;

    use tracing_subscriber::fmt::MakeWriter;

    pub struct ConsoleMakeWriter;

    /// Buffers one formatted event and logs it when dropped.
    pub struct ConsoleWriter {
        buffer: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.buffer);
            let line = line.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&line.into());
            }
        }
    }

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter { buffer: Vec::new() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_filter() {
        assert!(matches!(init_logging("voting_frontend=loud"), Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn second_install_is_an_error() {
        let first = init_logging("warn");
        let second = init_logging("warn");
        // Another test may have installed it first; either way only one wins.
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TelemetryError::Install(_))));
    }
}
