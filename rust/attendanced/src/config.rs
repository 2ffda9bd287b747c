use crate::model::parse_date_param;
use crate::sync::{ReqwestTransport, SyncClient};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "attendanced", version, about = "Attendance tracking sidecar")]
pub struct Cli {
    /// Spreadsheet web-app URL serving and accepting the roster.
    #[arg(long, env = "ATTENDANCE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// HTTP timeout for load and save, in seconds.
    #[arg(long, env = "ATTENDANCE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Date being checked when the session starts (YYYY-MM-DD). Defaults to today, UTC.
    #[arg(long, env = "ATTENDANCE_ACTIVE_DATE", value_parser = parse_date_param)]
    pub active_date: Option<NaiveDate>,

    /// Log level on stderr; RUST_LOG overrides it.
    #[arg(long, env = "ATTENDANCE_LOG", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    raw.trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level {:?}", raw))
}

impl Cli {
    pub fn active_date(&self) -> NaiveDate {
        self.active_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn sync_client(&self) -> anyhow::Result<Option<SyncClient>> {
        let Some(endpoint) = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            return Ok(None);
        };
        let transport = ReqwestTransport::new(endpoint, Duration::from_secs(self.timeout_secs))?;
        Ok(Some(SyncClient::new(Arc::new(transport))))
    }
}

/// Logs go to stderr; stdout belongs to the IPC channel.
pub fn init_logging(level: LevelFilter) {
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(Target::Stderr)
        .init();
}
