//! Config CLI subcommands: show, defaults.
//!
//! These commands read configuration directly from environment variables
//! without requiring an IPC connection to a running server.

use crate::config::{self, EffectiveConfig, DEFAULT_SOCKET_PATH};

/// Print effective config as key-value pairs to stdout.
pub fn run_show() {
    let cfg = config::load().effective_config();
    print!("{}", render_config(&cfg));
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("SYSUPDATE_MOCK_SOCKET_PATH={}", DEFAULT_SOCKET_PATH);
    println!("SYSUPDATE_MOCK_TICK_MS=100");
    println!("SYSUPDATE_MOCK_PROGRESS_STEP=5");
    println!("SYSUPDATE_MOCK_SHUTDOWN_TIMEOUT=5");
    println!("SYSUPDATE_MOCK_IPC_FRAME_LIMIT=1048576");
    println!("SYSUPDATE_MOCK_MAX_CONNECTIONS=32");
    println!("SYSUPDATE_MOCK_LOG=info");
    println!("SYSUPDATE_MOCK_LOG_FORMAT=pretty");
}

fn render_config(cfg: &EffectiveConfig) -> String {
    [
        format!("SYSUPDATE_MOCK_SOCKET_PATH={}", cfg.socket_path),
        format!("SYSUPDATE_MOCK_TICK_MS={}", cfg.tick_ms),
        format!("SYSUPDATE_MOCK_PROGRESS_STEP={}", cfg.progress_step),
        format!("SYSUPDATE_MOCK_SHUTDOWN_TIMEOUT={}", cfg.shutdown_timeout_secs),
        format!("SYSUPDATE_MOCK_IPC_FRAME_LIMIT={}", cfg.ipc_frame_limit),
        format!("SYSUPDATE_MOCK_MAX_CONNECTIONS={}", cfg.max_connections),
        format!("SYSUPDATE_MOCK_LOG={}", cfg.log_level),
        format!("SYSUPDATE_MOCK_LOG_FORMAT={}", cfg.log_format),
    ]
    .iter()
    .map(|line| format!("{}\n", line))
    .collect()
}
