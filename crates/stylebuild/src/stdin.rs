//! Stdin draining for watch mode.
//!
//! Copyright (c) 2026 stylebuild contributors
//!
//! A parent process that launches us with `--watch` keeps our stdin open for
//! as long as it wants the watcher alive. When it closes the pipe (or dies)
//! we exit.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

const READ_BUFFER_SIZE: usize = 512;

/// Pause between reads while the parent keeps writing.
pub const DRAIN_PAUSE: Duration = Duration::from_millis(4);

#[derive(Debug)]
pub enum DrainOutcome {
    /// The writer closed the stream
    Eof,
    Failed(io::Error),
}

impl DrainOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            DrainOutcome::Eof => 0,
            DrainOutcome::Failed(_) => 1,
        }
    }
}

/// Read and discard `reader` until it ends or fails.
pub fn drain<R: Read>(mut reader: R, pause: Duration) -> DrainOutcome {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return DrainOutcome::Eof,
            Ok(_) => thread::sleep(pause),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return DrainOutcome::Failed(e),
        }
    }
}

/// Drain stdin on a background thread and exit the process when it ends.
pub fn spawn_stdin_drain() -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-drain".to_string())
        .spawn(|| {
            let outcome = drain(io::stdin().lock(), DRAIN_PAUSE);
            match &outcome {
                DrainOutcome::Eof => debug!("Stdin closed, exiting"),
                DrainOutcome::Failed(e) => error!(error = %e, "Failed to read stdin"),
            }
            std::process::exit(outcome.exit_code());
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader {
        reads_before_failure: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.reads_before_failure == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
            }
            self.reads_before_failure -= 1;
            buf[0] = b'x';
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            Ok(0)
        }
    }

    #[test]
    fn test_eof_exits_cleanly() {
        let input = vec![b'a'; 2000];
        let outcome = drain(input.as_slice(), Duration::ZERO);
        assert!(matches!(outcome, DrainOutcome::Eof));
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_read_error_fails() {
        let outcome = drain(
            FailingReader {
                reads_before_failure: 3,
            },
            Duration::ZERO,
        );
        assert!(matches!(outcome, DrainOutcome::Failed(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let outcome = drain(InterruptedOnce { interrupted: false }, Duration::ZERO);
        assert!(matches!(outcome, DrainOutcome::Eof));
    }
}
