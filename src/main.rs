//! CyberGuard entrypoint: analyzes event text, log/CSV files or directories
//! given as arguments, or a stream of lines on stdin, and prints one JSON
//! document per result on stdout.
//!
//! Usage: cyberguard [--user EMAIL] [--stats] [--check-alerts] [TEXT | FILE | DIR]...

use cyberguard::{
    alerts::AlertDispatcher,
    config::AppConfig,
    input::LineFeed,
    logging::{AnalysisLine, StructuredLogger},
    pipeline::Pipeline,
    store::StoreMode,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

static STOP: AtomicBool = AtomicBool::new(false);
const STDIN_POLL: Duration = Duration::from_millis(200);

struct Args {
    user: Option<String>,
    stats: bool,
    check_alerts: bool,
    inputs: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        user: None,
        stats: false,
        check_alerts: false,
        inputs: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--user" => args.user = it.next(),
            "--stats" => args.stats = true,
            "--check-alerts" => args.check_alerts = true,
            _ => args.inputs.push(arg),
        }
    }
    args
}

fn mode_str(mode: StoreMode) -> &'static str {
    match mode {
        StoreMode::Online => "online",
        StoreMode::Degraded => "degraded",
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    let stdout = std::io::stdout();
    StructuredLogger::emit_json(value, &mut stdout.lock());
}

fn analyze_path(pipeline: &Pipeline, path: &Path, user: Option<&str>) {
    let files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    for file in files {
        match pipeline.analyze_file(&file, user) {
            Ok(report) => {
                info!(
                    file = %file.display(),
                    analyzed = report.total_logs,
                    dropped = report.dropped,
                    "file analyzed"
                );
                print_json(&report);
            }
            Err(e) => warn!(file = %file.display(), error = %e, "file skipped"),
        }
    }
}

fn analyze_stdin(pipeline: &Pipeline, user: Option<&str>) {
    let _ = ctrlc::set_handler(|| STOP.store(true, Ordering::Relaxed));
    let mode = mode_str(pipeline.store().mode());
    let feed = match LineFeed::spawn(std::io::BufReader::new(std::io::stdin())) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "could not start stdin reader");
            return;
        }
    };
    while let Some(line) = feed.next_line(&STOP, STDIN_POLL) {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(a) = pipeline.analyze_text(&line, user) {
            print_json(&AnalysisLine {
                ts: chrono::Utc::now().to_rfc3339(),
                tier: a.result.tier.as_str(),
                score: a.result.score,
                record_id: a.log_id.as_deref(),
                user_email: user,
                store_mode: mode,
                error: a.persistence_error.as_deref(),
            });
        }
    }
    if STOP.load(Ordering::Relaxed) {
        info!("interrupted; stopping stdin analysis");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("CYBERGUARD_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = AppConfig::from_env(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    let pipeline = Pipeline::from_config(&config);
    info!(
        store_mode = mode_str(pipeline.store().mode()),
        prior = pipeline.classifier().prior_name(),
        alerts = pipeline.alerts().is_active(),
        "CyberGuard starting"
    );

    let args = parse_args();
    let user = args.user.as_deref();

    if args.check_alerts {
        match AlertDispatcher::test_connection(&config.alerts) {
            Ok(()) => info!(
                transport = ?config.alerts.transport,
                "alert transport reachable and credentials accepted"
            ),
            Err(e) => warn!(error = %e, "alert configuration unusable"),
        }
    }

    if args.inputs.is_empty() && !args.stats && !args.check_alerts {
        analyze_stdin(&pipeline, user);
    }
    for input in &args.inputs {
        let path = Path::new(input);
        if path.exists() {
            analyze_path(&pipeline, path, user);
        } else {
            match pipeline.analyze_text(input, user) {
                Ok(analysis) => print_json(&analysis),
                Err(e) => warn!(error = %e, "input rejected"),
            }
        }
    }

    if args.stats {
        match pipeline.store().statistics(user) {
            Ok(stats) => {
                if stats.approximate {
                    warn!("statistics include baseline demonstration records (degraded mode)");
                }
                print_json(&stats);
            }
            Err(e) => warn!(error = %e, "statistics unavailable"),
        }
    }

    pipeline.shutdown();
    info!("CyberGuard stopping");
    Ok(())
}
