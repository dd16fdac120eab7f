//! Identity directory lookups.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use passcode_common::{Identity, OtpError, UserRecord};

/// Read access to the user directory owned by another service
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_email(&self, identity: &Identity) -> Result<Option<UserRecord>, OtpError>;
}

/// Directory seeded from configuration
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Identity, UserRecord>>,
}

impl InMemoryDirectory {
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let mut users = HashMap::new();
        for record in records {
            match Identity::parse(&record.email) {
                Ok(identity) => {
                    users.insert(identity, record);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping directory entry with invalid email");
                }
            }
        }

        Self {
            users: RwLock::new(users),
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_by_email(&self, identity: &Identity) -> Result<Option<UserRecord>, OtpError> {
        let users = self
            .users
            .read()
            .map_err(|_| OtpError::StoreUnavailable("directory lock poisoned".to_string()))?;
        Ok(users.get(identity).cloned())
    }
}
