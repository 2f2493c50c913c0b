//! Request coalescing under concurrent load.

use std::path::PathBuf;

use futures_util::future::join_all;
use health_checker::checks::ScriptCheck;
use health_checker::config::HealthCheckerConfig;
use reqwest::StatusCode;

mod common;

/// A script check that appends one line to `log` per execution, then sleeps.
fn counting_config(log: &PathBuf, singleflight: bool) -> HealthCheckerConfig {
    let mut config = HealthCheckerConfig::default();
    config.listener.singleflight = singleflight;
    config.script.push(
        ScriptCheck::new("counter", "sh").with_args([
            "-c".to_string(),
            format!("echo run >> {} && sleep 1", log.display()),
        ]),
    );
    config
}

fn temp_log() -> PathBuf {
    std::env::temp_dir().join(format!("health-checker-runs-{}.log", uuid::Uuid::new_v4()))
}

fn count_runs(log: &PathBuf) -> usize {
    std::fs::read_to_string(log)
        .map(|contents| contents.lines().count())
        .unwrap_or(0)
}

async fn fire_concurrent(addr: std::net::SocketAddr, n: usize) -> Vec<StatusCode> {
    let client = common::client();
    let requests = (0..n).map(|_| {
        let client = client.clone();
        async move {
            client
                .get(format!("http://{}/", addr))
                .send()
                .await
                .unwrap()
                .status()
        }
    });
    join_all(requests).await
}

#[tokio::test]
async fn test_singleflight_shares_one_run() {
    let log = temp_log();
    let (addr, _shutdown) = common::spawn_server(counting_config(&log, true)).await;

    let statuses = fire_concurrent(addr, 5).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::OK));
    assert_eq!(count_runs(&log), 1);
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn test_without_singleflight_every_request_runs() {
    let log = temp_log();
    let (addr, _shutdown) = common::spawn_server(counting_config(&log, false)).await;

    let statuses = fire_concurrent(addr, 5).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::OK));
    assert_eq!(count_runs(&log), 5);
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn test_next_burst_starts_fresh_run() {
    let log = temp_log();
    let (addr, _shutdown) = common::spawn_server(counting_config(&log, true)).await;

    fire_concurrent(addr, 3).await;
    fire_concurrent(addr, 3).await;

    assert_eq!(count_runs(&log), 2);
    let _ = std::fs::remove_file(&log);
}
