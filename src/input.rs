//! Line streaming that stays responsive to a stop flag.
//!
//! A blocking read on stdin cannot be interrupted from a signal handler, so
//! the reader runs on its own thread and the caller polls a channel between
//! checks of the flag. A reader still blocked when the caller gives up is
//! left behind; it ends with the process.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::warn;

pub struct LineFeed {
    rx: Receiver<String>,
}

impl LineFeed {
    /// Start reading `reader` line by line on a background thread.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("line-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            if tx.send(l).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "input read failed");
                            break;
                        }
                    }
                }
            })?;
        Ok(Self { rx })
    }

    /// Next line; `None` at end of input or once `stop` is set, checked every `poll`.
    pub fn next_line(&self, stop: &AtomicBool, poll: Duration) -> Option<String> {
        loop {
            if stop.load(Ordering::Relaxed) {
                return None;
            }
            match self.rx.recv_timeout(poll) {
                Ok(line) => return Some(line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}
