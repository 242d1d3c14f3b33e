//! Configuration for the signal engine, loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Upstream source
//! - `SOURCE_BASE_URL`: Market-data source base URL (default: `http://localhost:8080`)
//! - `SOURCE_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 5)
//! - `SOURCE_READ_TIMEOUT_SECS`: Read timeout (default: 10)
//!
//! ## Ingestion
//! - `INGEST_RETRY_CAP`: Attempts per tick before abandoning (default: 10)
//! - `INGEST_DEDUP_TTL_SECS`: Dedup hash marker TTL (default: 14400)
//! - `INGEST_QUALITY_CUTOFF`: Time-of-day after which incomplete ticks are
//!   rejected, `HH:MM:SS` (default: `10:00:00`)
//!
//! ## Compaction
//! - `COMPACTION_CUTOFF`: Session boundary for the open/close book bracket,
//!   `HH:MM:SS`, inclusive on the before side (default: `12:30:00`)
//! - `HISTORY_WINDOW_DAYS`: Rolling chart-cache window (default: 365)
//!
//! ## Scheduling
//! - `INGEST_SWEEP_INTERVAL_SECS`: Full ingestion sweep cadence (default: 60)
//! - `BOOTSTRAP_SWEEP_INTERVAL_SECS`: Daily-baseline sweep cadence (default: 3600)
//! - `STATUS_RECHECK_INTERVAL_SECS`: Disallowed-symbol recheck cadence (default: 900)
//! - `COMPACTION_INTERVAL_SECS`: Compaction cadence (default: 86400)
//! - `BOOTSTRAP_LEASE_TTL_SECS`: Single-instance lease TTL for the bootstrap
//!   sweep (default: 600)
//!
//! ## Distribution
//! - `SIGNAL_CHANNEL_CAPACITY`: Broadcast channel capacity (default: 1024)
//! - `TICKET_TTL_SECS`: Entitlement ticket lifetime (default: 120)
//!
//! ## Discovery
//! - `DISCOVERY_EXCLUDE_PREFIXES`: Comma-separated symbol-name prefixes to
//!   skip when crawling listings (default: empty)

use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable held a value that failed to parse.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// The variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Root settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Upstream source connection settings.
    pub source: SourceSettings,
    /// Ingestion behavior settings.
    pub ingest: IngestSettings,
    /// End-of-day compaction settings.
    pub compaction: CompactionSettings,
    /// Periodic job cadences.
    pub schedule: ScheduleSettings,
    /// Fan-out and ticket settings.
    pub distribution: DistributionSettings,
    /// Symbol discovery settings.
    pub discovery: DiscoverySettings,
}

/// Upstream market-data source settings.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Base URL of the source.
    pub base_url: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Response read timeout.
    pub read_timeout: Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Attempts per tick before the tick is abandoned.
    pub retry_cap: u32,
    /// TTL for the per-symbol dedup hash marker.
    pub dedup_ttl: Duration,
    /// After this time of day, ticks with empty required fields are rejected.
    pub quality_cutoff: NaiveTime,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            retry_cap: 10,
            dedup_ttl: Duration::from_secs(4 * 60 * 60),
            quality_cutoff: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        }
    }
}

/// End-of-day compaction settings.
#[derive(Debug, Clone)]
pub struct CompactionSettings {
    /// Session boundary; snapshots at or before it form the opening
    /// partition, later ones the closing partition.
    pub cutoff: NaiveTime,
    /// Rolling window for the per-symbol price/volume chart cache.
    pub history_window_days: i64,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            cutoff: NaiveTime::from_hms_opt(12, 30, 0).unwrap_or_default(),
            history_window_days: 365,
        }
    }
}

/// Periodic job cadences.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    /// Full ingestion sweep cadence.
    pub ingest_sweep_interval: Duration,
    /// Daily-baseline sweep cadence.
    pub bootstrap_sweep_interval: Duration,
    /// Disallowed-symbol recheck cadence.
    pub status_recheck_interval: Duration,
    /// End-of-day compaction cadence.
    pub compaction_interval: Duration,
    /// Single-instance lease TTL for the bootstrap sweep.
    pub bootstrap_lease_ttl: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            ingest_sweep_interval: Duration::from_secs(60),
            bootstrap_sweep_interval: Duration::from_secs(3600),
            status_recheck_interval: Duration::from_secs(900),
            compaction_interval: Duration::from_secs(86_400),
            bootstrap_lease_ttl: Duration::from_secs(600),
        }
    }
}

/// Fan-out and ticket settings.
#[derive(Debug, Clone)]
pub struct DistributionSettings {
    /// Broadcast channel capacity for both signal groups.
    pub channel_capacity: usize,
    /// Entitlement ticket lifetime.
    pub ticket_ttl: Duration,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            ticket_ttl: Duration::from_secs(120),
        }
    }
}

/// Symbol discovery settings.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySettings {
    /// Symbol-name prefixes excluded from the listing crawl.
    pub exclude_prefixes: Vec<String>,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            source: SourceSettings {
                base_url: env_string("SOURCE_BASE_URL", "http://localhost:8080"),
                connect_timeout: env_duration("SOURCE_CONNECT_TIMEOUT_SECS", 5)?,
                read_timeout: env_duration("SOURCE_READ_TIMEOUT_SECS", 10)?,
            },
            ingest: IngestSettings {
                retry_cap: env_parse("INGEST_RETRY_CAP", 10)?,
                dedup_ttl: env_duration("INGEST_DEDUP_TTL_SECS", 4 * 60 * 60)?,
                quality_cutoff: env_time("INGEST_QUALITY_CUTOFF", "10:00:00")?,
            },
            compaction: CompactionSettings {
                cutoff: env_time("COMPACTION_CUTOFF", "12:30:00")?,
                history_window_days: env_parse("HISTORY_WINDOW_DAYS", 365)?,
            },
            schedule: ScheduleSettings {
                ingest_sweep_interval: env_duration("INGEST_SWEEP_INTERVAL_SECS", 60)?,
                bootstrap_sweep_interval: env_duration("BOOTSTRAP_SWEEP_INTERVAL_SECS", 3600)?,
                status_recheck_interval: env_duration("STATUS_RECHECK_INTERVAL_SECS", 900)?,
                compaction_interval: env_duration("COMPACTION_INTERVAL_SECS", 86_400)?,
                bootstrap_lease_ttl: env_duration("BOOTSTRAP_LEASE_TTL_SECS", 600)?,
            },
            distribution: DistributionSettings {
                channel_capacity: env_parse("SIGNAL_CHANNEL_CAPACITY", 1024)?,
                ticket_ttl: env_duration("TICKET_TTL_SECS", 120)?,
            },
            discovery: DiscoverySettings {
                exclude_prefixes: env_list("DISCOVERY_EXCLUDE_PREFIXES"),
            },
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            ingest: IngestSettings::default(),
            compaction: CompactionSettings::default(),
            schedule: ScheduleSettings::default(),
            distribution: DistributionSettings::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

fn env_string(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_duration(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(env_parse(name, default_secs)?))
}

fn env_time(name: &'static str, default: &str) -> Result<NaiveTime, ConfigError> {
    let raw = env_string(name, default);
    NaiveTime::parse_from_str(&raw, "%H:%M:%S")
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
}

fn env_list(name: &'static str) -> Vec<String> {
    std::env::var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
