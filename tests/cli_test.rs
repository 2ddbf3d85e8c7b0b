//! Binary behavior: stdin streaming stop flag, arguments, shutdown path.

use cyberguard::input::LineFeed;
use cyberguard::store::SecureStore;
use std::io::{BufReader, Cursor, Read};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reader that blocks until its sender is dropped, like an idle terminal.
struct IdleInput(mpsc::Receiver<u8>);

impl Read for IdleInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.recv() {
            Ok(b) if !buf.is_empty() => {
                buf[0] = b;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[test]
fn line_feed_yields_lines_then_ends() {
    let stop = AtomicBool::new(false);
    let feed = LineFeed::spawn(Cursor::new("first line\n\nsecond line\n")).unwrap();
    let poll = Duration::from_millis(20);
    assert_eq!(feed.next_line(&stop, poll).as_deref(), Some("first line"));
    assert_eq!(feed.next_line(&stop, poll).as_deref(), Some(""));
    assert_eq!(feed.next_line(&stop, poll).as_deref(), Some("second line"));
    assert_eq!(feed.next_line(&stop, poll), None);
}

#[test]
fn line_feed_stops_while_input_is_idle() {
    let (keep_open, rx) = mpsc::channel::<u8>();
    let feed = LineFeed::spawn(BufReader::new(IdleInput(rx))).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&stop);
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        flag.store(true, Ordering::Relaxed);
    });

    let started = Instant::now();
    assert_eq!(feed.next_line(&stop, Duration::from_millis(20)), None);
    assert!(started.elapsed() < Duration::from_secs(2));
    drop(keep_open);
}

fn cyberguard(dir: &tempfile::TempDir, db: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cyberguard"));
    cmd.env("CYBERGUARD_CONFIG_PATH", dir.path().join("absent.json"))
        .env("CYBERGUARD_DATABASE", db)
        .env("CYBERGUARD_STORE_SECRET", "cli-secret")
        .env("CYBERGUARD_ALERTS_ENABLED", "false")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn text_argument_prints_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let out = cyberguard(&dir, &dir.path().join("logs.db"))
        .arg("login admin export database delete")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let line = stdout.lines().next().unwrap();
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["prediction"], "malicious");
    assert!(json["log_id"].is_string());
}

#[test]
fn statistics_failure_still_shuts_down_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("logs.db");
    drop(SecureStore::open(&db, b"cli-secret").unwrap());
    // A blob in the tier column makes the grouped count unreadable.
    rusqlite::Connection::open(&db)
        .unwrap()
        .execute_batch(
            "INSERT INTO logs (event_enc, sequence, prediction, score, ts, user_email) \
             VALUES ('x', 'x', X'00', 0.5, 0, NULL);",
        )
        .unwrap();

    let out = cyberguard(&dir, &db).arg("--stats").output().unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("statistics unavailable"));
    assert!(stderr.contains("CyberGuard stopping"));
}
