//! Application state and shared resources.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::accounts::{AccountFlows, IdentityDirectory, InMemoryDirectory};
use crate::config::{AppConfig, NotifierBackend, StoreBackend};
use crate::notify::{LogNotifier, Notifier, OutboxNotifier};
use crate::otp::OtpService;
use crate::store::{InMemoryStore, KvStore, RedisStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Request/verify operations
    pub otp: Arc<OtpService>,

    /// Registration and password reset
    pub accounts: Arc<AccountFlows>,
}

impl AppState {
    /// Create application state, connecting to Redis when configured
    pub async fn new(config: AppConfig) -> Result<Self> {
        let redis = match (config.store, config.notifier) {
            (StoreBackend::Memory, NotifierBackend::Log) => None,
            _ => Some(
                RedisStore::connect(&config.redis_url)
                    .await
                    .context("Failed to connect to Redis")?,
            ),
        };

        let store: Arc<dyn KvStore> = match (config.store, &redis) {
            (StoreBackend::Redis, Some(redis)) => Arc::new(redis.clone()),
            _ => {
                tracing::warn!("Using in-memory store; OTP state is not shared or persisted");
                Arc::new(InMemoryStore::new())
            }
        };

        let notifier: Arc<dyn Notifier> = match (config.notifier, &redis) {
            (NotifierBackend::Outbox, Some(redis)) => {
                Arc::new(OutboxNotifier::new(redis.connection(), config.outbox_queue.clone()))
            }
            _ => Arc::new(LogNotifier),
        };

        Ok(Self::from_parts(config, store, notifier))
    }

    /// Assemble state around already-built collaborators
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn KvStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let otp = Arc::new(OtpService::new(
            store,
            notifier,
            config.otp_policy(),
            config.operation_timeout(),
        ));

        let directory = InMemoryDirectory::new(config.directory.clone());
        tracing::info!(users = directory.len(), "Identity directory loaded");
        let directory: Arc<dyn IdentityDirectory> = Arc::new(directory);
        let accounts = Arc::new(AccountFlows::new(directory, otp.clone()));

        Self {
            config,
            otp,
            accounts,
        }
    }
}
