//! Configuration management for Passcode Gate.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use passcode_common::UserRecord;
use passcode_common::constants::{
    self, DEFAULT_LISTEN_ADDR, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_REDIS_URL,
};

use crate::otp::OtpPolicy;

/// Where OTP state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local; state is lost on restart and not shared between replicas
    Memory,
}

/// How codes are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    /// Log only (development)
    #[default]
    Log,
    /// Push mail jobs onto a Redis list
    Outbox,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// State backend
    #[serde(default)]
    pub store: StoreBackend,

    /// Delivery backend
    #[serde(default)]
    pub notifier: NotifierBackend,

    /// Redis list the outbox sender pushes to
    #[serde(default = "default_outbox_queue")]
    pub outbox_queue: String,

    /// Default deadline for one request/verify call
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// OTP policy
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Known users for the password reset flow
    #[serde(default)]
    pub directory: Vec<UserRecord>,
}

/// OTP durations (seconds) and thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl_secs: u64,

    #[serde(default = "default_attempts_ttl")]
    pub attempts_ttl_secs: u64,

    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    #[serde(default = "default_request_window")]
    pub request_window_secs: u64,

    #[serde(default = "default_account_lock")]
    pub account_lock_secs: u64,

    #[serde(default = "default_spam_lock")]
    pub spam_lock_secs: u64,

    /// Requests per window before the spam lock
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Wrong codes tolerated before the account lock
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            otp_ttl_secs: default_otp_ttl(),
            attempts_ttl_secs: default_attempts_ttl(),
            cooldown_secs: default_cooldown(),
            request_window_secs: default_request_window(),
            account_lock_secs: default_account_lock(),
            spam_lock_secs: default_spam_lock(),
            max_requests: default_max_requests(),
            max_failed_attempts: default_max_failed_attempts(),
        }
    }
}

impl From<&PolicyConfig> for OtpPolicy {
    fn from(cfg: &PolicyConfig) -> Self {
        Self {
            otp_ttl: Duration::from_secs(cfg.otp_ttl_secs),
            attempts_ttl: Duration::from_secs(cfg.attempts_ttl_secs),
            cooldown: Duration::from_secs(cfg.cooldown_secs),
            request_window: Duration::from_secs(cfg.request_window_secs),
            account_lock: Duration::from_secs(cfg.account_lock_secs),
            spam_lock: Duration::from_secs(cfg.spam_lock_secs),
            max_requests: cfg.max_requests,
            max_failed_attempts: cfg.max_failed_attempts,
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_outbox_queue() -> String { constants::redis_keys::MAIL_OUTBOX.to_string() }
fn default_operation_timeout_ms() -> u64 { DEFAULT_OPERATION_TIMEOUT_MS }
fn default_otp_ttl() -> u64 { constants::OTP_TTL_SECS } // 5 minutes
fn default_attempts_ttl() -> u64 { constants::ATTEMPTS_TTL_SECS }
fn default_cooldown() -> u64 { constants::COOLDOWN_SECS } // 1 minute
fn default_request_window() -> u64 { constants::REQUEST_WINDOW_SECS } // 1 hour
fn default_account_lock() -> u64 { constants::ACCOUNT_LOCK_SECS } // 30 minutes
fn default_spam_lock() -> u64 { constants::SPAM_LOCK_SECS } // 1 hour
fn default_max_requests() -> u64 { constants::MAX_OTP_REQUESTS }
fn default_max_failed_attempts() -> u64 { constants::MAX_FAILED_ATTEMPTS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(store) = args.store {
            config.store = store;
        }
        if let Some(notifier) = args.notifier {
            config.notifier = notifier;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            anyhow::bail!("operation_timeout_ms must be greater than zero");
        }
        if self.policy.max_requests == 0 {
            anyhow::bail!("policy.max_requests must be greater than zero");
        }
        if self.notifier == NotifierBackend::Outbox && self.outbox_queue.trim().is_empty() {
            anyhow::bail!("outbox_queue is required for the outbox notifier");
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy::from(&self.policy)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            store: StoreBackend::default(),
            notifier: NotifierBackend::default(),
            outbox_queue: default_outbox_queue(),
            operation_timeout_ms: default_operation_timeout_ms(),
            policy: PolicyConfig::default(),
            directory: Vec::new(),
        }
    }
}
