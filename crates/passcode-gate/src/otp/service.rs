//! The two OTP operations exposed to callers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use passcode_common::{Identity, OtpCode, OtpError};

use super::{OtpIssuer, OtpPolicy, OtpVerifier, RequestTracker, RestrictionChecker};
use crate::notify::Notifier;
use crate::store::KvStore;

/// Sequences the OTP components and bounds each call with a deadline
pub struct OtpService {
    checker: RestrictionChecker,
    tracker: RequestTracker,
    issuer: OtpIssuer,
    verifier: OtpVerifier,
    store: Arc<dyn KvStore>,
    default_timeout: Duration,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn KvStore>,
        notifier: Arc<dyn Notifier>,
        policy: OtpPolicy,
        default_timeout: Duration,
    ) -> Self {
        Self {
            checker: RestrictionChecker::new(store.clone(), policy.clone()),
            tracker: RequestTracker::new(store.clone(), policy.clone()),
            issuer: OtpIssuer::new(store.clone(), notifier, policy.clone()),
            verifier: OtpVerifier::new(store.clone(), policy),
            store,
            default_timeout,
        }
    }

    /// Issue and deliver a new code, within the default deadline
    pub async fn request_otp(
        &self,
        email: &str,
        display_name: &str,
        template: &str,
    ) -> Result<(), OtpError> {
        self.request_otp_within(email, display_name, template, self.default_timeout)
            .await
    }

    /// Restriction check → request tracking → issuance, stopping at the first failure
    pub async fn request_otp_within(
        &self,
        email: &str,
        display_name: &str,
        template: &str,
        deadline: Duration,
    ) -> Result<(), OtpError> {
        let identity = Identity::parse(email)?;
        if display_name.trim().is_empty() {
            return Err(OtpError::InvalidInput("Name is required".to_string()));
        }
        if template.trim().is_empty() {
            return Err(OtpError::InvalidInput("Template is required".to_string()));
        }

        with_deadline("request_otp", deadline, async {
            self.checker.check(&identity).await?;
            self.tracker.track(&identity).await?;
            self.issuer.issue(&identity, display_name.trim(), template).await
        })
        .await
    }

    /// Check a submitted code, within the default deadline
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<(), OtpError> {
        self.verify_otp_within(email, code, self.default_timeout).await
    }

    pub async fn verify_otp_within(
        &self,
        email: &str,
        code: &str,
        deadline: Duration,
    ) -> Result<(), OtpError> {
        let identity = Identity::parse(email)?;
        let code = OtpCode::parse(code)?;

        with_deadline("verify_otp", deadline, self.verifier.verify(&identity, &code)).await
    }

    /// Store connectivity, for readiness probes
    pub async fn ping(&self) -> Result<(), OtpError> {
        with_deadline("ping", self.default_timeout, async {
            self.store.ping().await.map_err(OtpError::from)
        })
        .await
    }
}

/// Abort `fut` once `deadline` lapses. Writes already made stay; their TTLs
/// bound how long they matter.
async fn with_deadline<T, F>(operation: &str, deadline: Duration, fut: F) -> Result<T, OtpError>
where
    F: Future<Output = Result<T, OtpError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = operation,
                deadline_ms = deadline.as_millis() as u64,
                "OTP operation deadline exceeded"
            );
            Err(OtpError::Unavailable(format!(
                "{operation} did not finish within {}ms",
                deadline.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::otp::OtpKeys;
    use crate::otp::testing::{
        BrokenStore, FailingNotifier, RecordingNotifier, StalledStore, YieldingStore,
    };
    use crate::store::InMemoryStore;

    const EMAIL: &str = "jane@example.com";
    const TEMPLATE: &str = "user-activation-mail";

    struct Fixture {
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
        service: Arc<OtpService>,
        keys: OtpKeys,
    }

    fn setup() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(OtpService::new(
            store.clone(),
            notifier.clone(),
            OtpPolicy::default(),
            Duration::from_secs(5),
        ));
        let keys = OtpKeys::new(&Identity::parse(EMAIL).unwrap());
        Fixture {
            store,
            notifier,
            service,
            keys,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_creates_state() {
        let f = setup();

        assert_ok!(f.service.request_otp(EMAIL, "Jane", TEMPLATE).await);

        assert!(f.store.get(&f.keys.otp).await.unwrap().is_some());
        assert!(f.store.get(&f.keys.cooldown).await.unwrap().is_some());
        assert_eq!(f.store.get(&f.keys.request_count).await.unwrap(), Some("1".to_string()));
        assert_eq!(f.notifier.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_during_cooldown() {
        let f = setup();
        f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap();

        assert!(matches!(
            f.service.request_otp(EMAIL, "Jane", TEMPLATE).await,
            Err(OtpError::CooldownActive { .. })
        ));
        // Refused before tracking, the counter is untouched
        assert_eq!(f.store.get(&f.keys.request_count).await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_window_escalates_to_spam_lock() {
        let f = setup();

        f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;

        f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap();
        assert_eq!(f.store.get(&f.keys.request_count).await.unwrap(), Some("2".to_string()));
        tokio::time::advance(Duration::from_secs(60)).await;

        assert!(matches!(
            f.service.request_otp(EMAIL, "Jane", TEMPLATE).await,
            Err(OtpError::RequestThrottled { .. })
        ));
        assert!(f.store.get(&f.keys.spam_lock).await.unwrap().is_some());
        assert_eq!(f.notifier.count(), 2);

        // Still throttled while the spam lock lives
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(matches!(
            f.service.request_otp(EMAIL, "Jane", TEMPLATE).await,
            Err(OtpError::RequestThrottled { .. })
        ));

        // Both the lock and the window have lapsed after an hour
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_ok!(f.service.request_otp(EMAIL, "Jane", TEMPLATE).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_then_verify() {
        let f = setup();
        f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap();
        let code = f.notifier.last_code().unwrap();

        // Identity matching is case-insensitive
        assert_ok!(f.service.verify_otp("JANE@example.com", &code).await);
        assert_eq!(
            f.service.verify_otp(EMAIL, &code).await,
            Err(OtpError::ExpiredOrInvalid)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_blocks_new_requests() {
        let f = setup();
        f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap();
        let code = f.notifier.last_code().unwrap();
        let wrong = if code == "1000" { "1001" } else { "1000" };

        assert_eq!(
            f.service.verify_otp(EMAIL, wrong).await,
            Err(OtpError::IncorrectOtp { remaining: 1 })
        );
        assert_eq!(
            f.service.verify_otp(EMAIL, wrong).await,
            Err(OtpError::IncorrectOtp { remaining: 0 })
        );
        assert!(matches!(
            f.service.verify_otp(EMAIL, wrong).await,
            Err(OtpError::AccountLocked { .. })
        ));

        assert!(matches!(
            f.service.verify_otp(EMAIL, &code).await,
            Err(OtpError::AccountLocked { .. })
        ));

        // The account lock outranks the cooldown still running
        tokio::time::advance(Duration::from_secs(30)).await;
        let err = f.service.request_otp(EMAIL, "Jane", TEMPLATE).await.unwrap_err();
        assert_eq!(
            err,
            OtpError::AccountLocked {
                retry_after: Duration::from_secs(1770)
            }
        );
        assert_eq!(
            err.to_string(),
            "Account locked due to multiple failed attempts! Try again after 30 minutes"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_count_once_each() {
        let store = Arc::new(YieldingStore::default());
        let service = Arc::new(OtpService::new(
            store.clone(),
            Arc::new(RecordingNotifier::default()),
            OtpPolicy::default(),
            Duration::from_secs(5),
        ));
        let keys = OtpKeys::new(&Identity::parse(EMAIL).unwrap());
        store
            .set_ex(&keys.request_count, "1", Duration::from_secs(3600))
            .await
            .unwrap();

        let spawn_request = || {
            let service = service.clone();
            tokio::spawn(async move { service.request_otp(EMAIL, "Jane", TEMPLATE).await })
        };
        let (a, b) = tokio::join!(spawn_request(), spawn_request());
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(OtpError::RequestThrottled { .. }))));
        assert_eq!(store.get(&keys.request_count).await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let f = setup();

        assert!(matches!(
            f.service.request_otp("not-an-email", "Jane", TEMPLATE).await,
            Err(OtpError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.request_otp(EMAIL, "  ", TEMPLATE).await,
            Err(OtpError::InvalidInput(_))
        ));
        assert!(matches!(
            f.service.verify_otp(EMAIL, "12").await,
            Err(OtpError::InvalidInput(_))
        ));

        // Malformed codes do not consume attempts
        assert_eq!(f.store.get(&f.keys.attempts).await.unwrap(), None);
        assert_eq!(f.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_propagates() {
        let store = Arc::new(InMemoryStore::new());
        let service = OtpService::new(
            store.clone(),
            Arc::new(FailingNotifier),
            OtpPolicy::default(),
            Duration::from_secs(5),
        );

        let err = assert_err!(service.request_otp(EMAIL, "Jane", TEMPLATE).await);
        assert!(matches!(err, OtpError::NotificationFailed(_)));
        assert!(err.is_retryable());

        let keys = OtpKeys::new(&Identity::parse(EMAIL).unwrap());
        assert_eq!(store.get(&keys.otp).await.unwrap(), None);
        assert_eq!(store.get(&keys.cooldown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_outage_surfaces() {
        let service = OtpService::new(
            Arc::new(BrokenStore),
            Arc::new(RecordingNotifier::default()),
            OtpPolicy::default(),
            Duration::from_secs(5),
        );

        assert!(matches!(
            service.request_otp(EMAIL, "Jane", TEMPLATE).await,
            Err(OtpError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.verify_otp(EMAIL, "1234").await,
            Err(OtpError::StoreUnavailable(_))
        ));
        assert!(service.ping().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_surfaces_unavailable() {
        let service = OtpService::new(
            Arc::new(StalledStore),
            Arc::new(RecordingNotifier::default()),
            OtpPolicy::default(),
            Duration::from_secs(5),
        );

        assert!(matches!(
            service.request_otp(EMAIL, "Jane", TEMPLATE).await,
            Err(OtpError::Unavailable(_))
        ));
        assert!(matches!(
            service
                .verify_otp_within(EMAIL, "1234", Duration::from_millis(250))
                .await,
            Err(OtpError::Unavailable(_))
        ));
    }
}
