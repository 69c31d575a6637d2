//! Two-step OTP gate in front of role-scoped content.
//!
//! A [`SessionGate`] starts in [`GateState::AwaitingPhone`], moves to
//! [`GateState::AwaitingOtp`] once a full phone number is submitted and to
//! [`GateState::Authenticated`] once a full OTP is submitted. The OTP step
//! persists a [`SessionRecord`] through the injected [`SessionStore`]; on
//! mount a still-valid record skips the challenge entirely.
//!
//! Wrong-length input never errors: the submit trigger is simply disabled and
//! the submission is reported as [`SubmitOutcome::Ignored`]. While a
//! submission is waiting out the simulated round-trip both triggers stay
//! disabled, so a double submit cannot race the first one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::{
    clock::Clock,
    config::GateConfig,
    error::Result,
    role::Role,
    storage::{SessionRecord, SessionStore},
};

/// Where the gate is in the challenge flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    AwaitingPhone,
    AwaitingOtp,
    Authenticated,
}

/// Result of pressing a submit trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Trigger was disabled; nothing changed.
    Ignored,
    /// The gate moved to the contained state.
    Advanced(GateState),
}

/// What the page should render right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    Challenge(ChallengeView),
    Protected {
        title: String,
        role_label: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeView {
    pub title: String,
    pub step: GateState,
    pub input: String,
    /// Shown under the OTP field, e.g. `OTP sent to +91 9876543210`.
    pub hint: Option<String>,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub can_change_number: bool,
}

#[derive(Debug, Default)]
struct GateInner {
    state: GateState,
    phone: String,
    otp: String,
    pending: bool,
    // bumped on every reset; a submission started before a reset is stale
    epoch: u64,
}

impl GateInner {
    fn reset(&mut self) {
        self.state = GateState::AwaitingPhone;
        self.phone.clear();
        self.otp.clear();
        self.epoch += 1;
    }
}

pub struct SessionGate {
    role: Role,
    title: String,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: GateConfig,
    inner: Mutex<GateInner>,
}

/// Releases the pending flag when the submission finishes or is dropped.
struct PendingGuard<'a> {
    gate: &'a SessionGate,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.gate.inner().pending = false;
    }
}

impl SessionGate {
    /// Create the gate and run the read-time expiry check against `store`.
    pub async fn mount(
        role: Role,
        title: impl Into<String>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: GateConfig,
    ) -> Result<Self> {
        let gate = Self {
            role,
            title: title.into(),
            store,
            clock,
            config,
            inner: Mutex::new(GateInner::default()),
        };
        gate.check_session().await?;
        Ok(gate)
    }

    fn inner(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> GateState {
        self.inner().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == GateState::Authenticated
    }

    /// True while a submission is waiting on its round-trip.
    pub fn is_pending(&self) -> bool {
        self.inner().pending
    }

    pub fn phone(&self) -> String {
        self.inner().phone.clone()
    }

    pub fn otp(&self) -> String {
        self.inner().otp.clone()
    }

    /// Replace the phone input, keeping only the first ten digits.
    pub fn input_phone(&self, raw: &str) {
        self.inner().phone = digits(raw, self.config.phone_digits);
    }

    /// Replace the OTP input, keeping only the first six digits.
    pub fn input_otp(&self, raw: &str) {
        self.inner().otp = digits(raw, self.config.otp_digits);
    }

    pub fn can_submit_phone(&self) -> bool {
        let inner = self.inner();
        inner.state == GateState::AwaitingPhone
            && !inner.pending
            && inner.phone.len() == self.config.phone_digits
    }

    pub fn can_submit_otp(&self) -> bool {
        let inner = self.inner();
        inner.state == GateState::AwaitingOtp
            && !inner.pending
            && inner.otp.len() == self.config.otp_digits
    }

    /// Send the OTP to the entered number.
    pub async fn submit_phone(&self) -> Result<SubmitOutcome> {
        let phone = {
            let mut inner = self.inner();
            if inner.state != GateState::AwaitingPhone
                || inner.pending
                || inner.phone.len() != self.config.phone_digits
            {
                debug!(role = %self.role, "phone submission ignored");
                return Ok(SubmitOutcome::Ignored);
            }
            inner.pending = true;
            inner.phone.clone()
        };
        let _pending = PendingGuard { gate: self };

        info!(role = %self.role, phone = %mask(&phone), "sending OTP");
        tokio::time::sleep(self.config.challenge_latency).await;

        {
            let mut inner = self.inner();
            if inner.state != GateState::AwaitingPhone {
                return Ok(SubmitOutcome::Ignored);
            }
            inner.state = GateState::AwaitingOtp;
        }
        info!(role = %self.role, "awaiting OTP");
        Ok(SubmitOutcome::Advanced(GateState::AwaitingOtp))
    }

    /// Verify the entered OTP and persist the session for this role.
    pub async fn submit_otp(&self) -> Result<SubmitOutcome> {
        let (phone, epoch) = {
            let mut inner = self.inner();
            if inner.state != GateState::AwaitingOtp
                || inner.pending
                || inner.otp.len() != self.config.otp_digits
            {
                debug!(role = %self.role, "OTP submission ignored");
                return Ok(SubmitOutcome::Ignored);
            }
            inner.pending = true;
            (inner.phone.clone(), inner.epoch)
        };
        let _pending = PendingGuard { gate: self };
        let issued_at = self.clock.now_millis();

        info!(role = %self.role, phone = %mask(&phone), "verifying OTP");
        tokio::time::sleep(self.config.challenge_latency).await;

        if !self.still_current(epoch) {
            return Ok(SubmitOutcome::Ignored);
        }
        self.store
            .put(self.role, SessionRecord::new(phone, self.role, issued_at))
            .await?;

        let established = {
            let mut inner = self.inner();
            let current = inner.epoch == epoch && inner.state == GateState::AwaitingOtp;
            if current {
                inner.state = GateState::Authenticated;
            }
            current
        };
        if !established {
            debug!(role = %self.role, "gate reset during verification, discarding session");
            self.store.clear(self.role).await?;
            return Ok(SubmitOutcome::Ignored);
        }
        info!(role = %self.role, issued_at, "session established");
        Ok(SubmitOutcome::Advanced(GateState::Authenticated))
    }

    fn still_current(&self, epoch: u64) -> bool {
        let inner = self.inner();
        inner.epoch == epoch && inner.state == GateState::AwaitingOtp
    }

    /// Go back to the phone step, discarding the OTP. The number stays
    /// filled in for editing.
    pub fn change_number(&self) -> SubmitOutcome {
        let mut inner = self.inner();
        if inner.state != GateState::AwaitingOtp || inner.pending {
            return SubmitOutcome::Ignored;
        }
        inner.state = GateState::AwaitingPhone;
        inner.otp.clear();
        debug!(role = %self.role, "changing number");
        SubmitOutcome::Advanced(GateState::AwaitingPhone)
    }

    /// Drop the persisted session for this role and restart the challenge.
    ///
    /// The gate resets before the store is cleared, so an OTP check still in
    /// flight sees the reset and cannot re-establish the session.
    pub async fn logout(&self) -> Result<()> {
        self.inner().reset();
        self.store.clear(self.role).await?;
        info!(role = %self.role, "logged out");
        Ok(())
    }

    /// Re-read the persisted record, purging it if expired.
    ///
    /// Returns whether a valid session exists. A gate that was authenticated
    /// falls back to the phone step when its record is gone or stale.
    pub async fn check_session(&self) -> Result<bool> {
        let now = self.clock.now_millis();
        let valid = match self.store.get(self.role).await? {
            Some(record) if record.is_valid_at(now, self.config.session_ttl_millis()) => true,
            Some(record) => {
                info!(
                    role = %self.role,
                    issued_at = record.issued_at,
                    "session expired, purging"
                );
                self.store.clear(self.role).await?;
                false
            }
            None => false,
        };

        let mut inner = self.inner();
        if valid {
            inner.state = GateState::Authenticated;
        } else if inner.state == GateState::Authenticated {
            inner.reset();
        }
        Ok(valid)
    }

    /// Hand back `content` only once the gate is open.
    pub fn protect<T>(&self, content: T) -> Option<T> {
        self.is_authenticated().then_some(content)
    }

    pub fn view(&self) -> GateView {
        let inner = self.inner();
        match inner.state {
            GateState::Authenticated => GateView::Protected {
                title: self.title.clone(),
                role_label: self.role.label(),
            },
            GateState::AwaitingPhone => GateView::Challenge(ChallengeView {
                title: format!("{} - OTP Authentication", self.title),
                step: GateState::AwaitingPhone,
                input: inner.phone.clone(),
                hint: None,
                submit_label: if inner.pending {
                    "Sending OTP..."
                } else {
                    "Send OTP"
                },
                submit_enabled: !inner.pending
                    && inner.phone.len() == self.config.phone_digits,
                can_change_number: false,
            }),
            GateState::AwaitingOtp => GateView::Challenge(ChallengeView {
                title: format!("{} - OTP Authentication", self.title),
                step: GateState::AwaitingOtp,
                input: inner.otp.clone(),
                hint: Some(format!("OTP sent to +91 {}", inner.phone)),
                submit_label: if inner.pending {
                    "Verifying..."
                } else {
                    "Verify OTP"
                },
                submit_enabled: !inner.pending && inner.otp.len() == self.config.otp_digits,
                can_change_number: !inner.pending,
            }),
        }
    }
}

fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

fn mask(phone: &str) -> String {
    let visible = phone.len().saturating_sub(4);
    format!("{}{}", "*".repeat(visible), &phone[visible..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::InMemorySessionStore;
    use std::time::Duration;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);
    const START: i64 = 1_700_000_000_000;

    struct Fixture {
        store: Arc<InMemorySessionStore>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemorySessionStore::new()),
                clock: Arc::new(ManualClock::new(START)),
            }
        }

        async fn gate(&self, role: Role, latency: Duration) -> SessionGate {
            SessionGate::mount(
                role,
                "Police Portal",
                self.store.clone(),
                self.clock.clone(),
                GateConfig::default().with_challenge_latency(latency),
            )
            .await
            .unwrap()
        }
    }

    #[test]
    fn input_strips_non_digits_and_truncates() {
        assert_eq!(digits("+91 98765-43210", 10), "9198765432");
        assert_eq!(digits("12a3b4", 6), "1234");
        assert_eq!(digits("", 6), "");
    }

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask("9876543210"), "******3210");
        assert_eq!(mask("12"), "12");
    }

    #[tokio::test]
    async fn starts_awaiting_phone_without_a_record() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::ZERO).await;
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(gate.protect("dashboard").is_none());
    }

    #[tokio::test]
    async fn wrong_length_phone_is_a_no_op() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::ZERO).await;

        for raw in ["", "12345", "987654321"] {
            gate.input_phone(raw);
            assert!(!gate.can_submit_phone());
            assert_eq!(gate.submit_phone().await.unwrap(), SubmitOutcome::Ignored);
            assert_eq!(gate.state(), GateState::AwaitingPhone);
        }

        // eleven digits are truncated to ten, so this one goes through
        gate.input_phone("98765432101");
        assert_eq!(gate.phone(), "9876543210");
        assert_eq!(
            gate.submit_phone().await.unwrap(),
            SubmitOutcome::Advanced(GateState::AwaitingOtp)
        );
    }

    #[tokio::test]
    async fn full_flow_persists_session_at_submission_time() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Collector, Duration::ZERO).await;

        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        assert_eq!(gate.state(), GateState::AwaitingOtp);

        gate.input_otp("12345");
        assert_eq!(gate.submit_otp().await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(gate.state(), GateState::AwaitingOtp);

        gate.input_otp("123456");
        assert_eq!(
            gate.submit_otp().await.unwrap(),
            SubmitOutcome::Advanced(GateState::Authenticated)
        );
        assert_eq!(gate.protect(7), Some(7));

        let record = fx.store.get(Role::Collector).await.unwrap().unwrap();
        assert_eq!(record.identifier, "9876543210");
        assert_eq!(record.role, Role::Collector);
        assert_eq!(record.issued_at, START);
        assert!(fx.store.get(Role::Police).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mount_restores_a_fresh_session() {
        let fx = Fixture::new();
        fx.store
            .put(
                Role::Central,
                SessionRecord::new("9999999999", Role::Central, START),
            )
            .await
            .unwrap();
        fx.clock.advance(DAY - Duration::from_millis(1));

        let gate = fx.gate(Role::Central, Duration::ZERO).await;
        assert_eq!(gate.state(), GateState::Authenticated);
    }

    #[tokio::test]
    async fn mount_purges_an_expired_session() {
        let fx = Fixture::new();
        fx.store
            .put(
                Role::Central,
                SessionRecord::new("9999999999", Role::Central, START),
            )
            .await
            .unwrap();
        fx.clock.advance(DAY);

        let gate = fx.gate(Role::Central, Duration::ZERO).await;
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(fx.store.get(Role::Central).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn check_session_drops_an_authenticated_gate_after_expiry() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Beneficiary, Duration::ZERO).await;
        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        gate.input_otp("654321");
        gate.submit_otp().await.unwrap();
        assert!(gate.is_authenticated());

        fx.clock.advance(DAY + Duration::from_secs(1));
        assert!(!gate.check_session().await.unwrap());
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(gate.phone().is_empty());
        assert!(fx.store.get(Role::Beneficiary).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_clears_the_record_from_any_state() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::ZERO).await;
        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        gate.input_otp("111111");
        gate.submit_otp().await.unwrap();

        gate.logout().await.unwrap();
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(fx.store.get(Role::Police).await.unwrap().is_none());
        assert!(gate.phone().is_empty() && gate.otp().is_empty());

        // logging out while unauthenticated is harmless
        gate.logout().await.unwrap();
        assert_eq!(gate.state(), GateState::AwaitingPhone);
    }

    #[tokio::test]
    async fn change_number_discards_otp_and_keeps_number() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::ZERO).await;

        assert_eq!(gate.change_number(), SubmitOutcome::Ignored);

        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        gate.input_otp("123");
        assert_eq!(
            gate.change_number(),
            SubmitOutcome::Advanced(GateState::AwaitingPhone)
        );
        assert_eq!(gate.phone(), "9876543210");
        assert!(gate.otp().is_empty());
        assert!(gate.can_submit_phone());
    }

    /// Delegates to an in-memory store after a delay on `put`.
    struct SlowPutStore {
        inner: InMemorySessionStore,
        put_delay: Duration,
    }

    #[async_trait::async_trait]
    impl SessionStore for SlowPutStore {
        async fn get(&self, role: Role) -> Result<Option<SessionRecord>> {
            self.inner.get(role).await
        }

        async fn put(&self, role: Role, record: SessionRecord) -> Result<()> {
            tokio::time::sleep(self.put_delay).await;
            self.inner.put(role, record).await
        }

        async fn clear(&self, role: Role) -> Result<()> {
            self.inner.clear(role).await
        }
    }

    #[tokio::test]
    async fn logout_during_slow_save_wins() {
        let store = Arc::new(SlowPutStore {
            inner: InMemorySessionStore::new(),
            put_delay: Duration::from_millis(40),
        });
        let gate = SessionGate::mount(
            Role::Police,
            "Police Portal",
            store.clone(),
            Arc::new(ManualClock::new(0)),
            GateConfig::default().with_challenge_latency(Duration::from_millis(10)),
        )
        .await
        .unwrap();
        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        gate.input_otp("123456");

        let (outcome, logout) = tokio::join!(gate.submit_otp(), async {
            tokio::time::sleep(Duration::from_millis(25)).await;
            gate.logout().await
        });
        logout.unwrap();

        assert_eq!(outcome.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(store.get(Role::Police).await.unwrap().is_none());
        assert!(!gate.is_pending());
    }

    #[tokio::test]
    async fn second_submission_while_pending_is_ignored() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::from_millis(30)).await;
        gate.input_phone("9876543210");

        let (first, second) = tokio::join!(gate.submit_phone(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert!(gate.is_pending());
            assert!(!gate.can_submit_phone());
            gate.submit_phone().await
        });

        assert_eq!(
            first.unwrap(),
            SubmitOutcome::Advanced(GateState::AwaitingOtp)
        );
        assert_eq!(second.unwrap(), SubmitOutcome::Ignored);
        assert!(!gate.is_pending());
    }

    #[tokio::test]
    async fn dropped_submission_releases_the_trigger() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::from_secs(60)).await;
        gate.input_phone("9876543210");

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), gate.submit_phone()).await;
        assert!(timed_out.is_err());
        assert!(!gate.is_pending());
        assert_eq!(gate.state(), GateState::AwaitingPhone);
        assert!(gate.can_submit_phone());
    }

    #[tokio::test]
    async fn view_tracks_the_challenge_step() {
        let fx = Fixture::new();
        let gate = fx.gate(Role::Police, Duration::ZERO).await;

        gate.input_phone("98765");
        match gate.view() {
            GateView::Challenge(view) => {
                assert_eq!(view.step, GateState::AwaitingPhone);
                assert_eq!(view.submit_label, "Send OTP");
                assert!(!view.submit_enabled);
                assert_eq!(view.title, "Police Portal - OTP Authentication");
            }
            other => panic!("unexpected view {other:?}"),
        }

        gate.input_phone("9876543210");
        gate.submit_phone().await.unwrap();
        match gate.view() {
            GateView::Challenge(view) => {
                assert_eq!(view.step, GateState::AwaitingOtp);
                assert_eq!(view.hint.as_deref(), Some("OTP sent to +91 9876543210"));
                assert_eq!(view.submit_label, "Verify OTP");
                assert!(view.can_change_number);
            }
            other => panic!("unexpected view {other:?}"),
        }

        gate.input_otp("123456");
        gate.submit_otp().await.unwrap();
        assert_eq!(
            gate.view(),
            GateView::Protected {
                title: "Police Portal".to_string(),
                role_label: "Police Officer",
            }
        );
    }
}
