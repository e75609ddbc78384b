//! The donation flow driver
//!
//! Runs the whole protocol as one ordered sequence: session check, login,
//! amount entry, step advances with bounded retries, submit, confirmation.
//! Fatal errors ([`TitheError::AuthenticationFailed`] and browser failures)
//! abort the run; step-advance trouble is absorbed and the driver continues
//! speculatively, since the step position is re-verified before submission.

use crate::page::{ControlActivation, DonationPage};
use crate::retry::Sleeper;
use crate::selectors;
use std::time::Duration;
use tithe_core::{
    Confirmation, Credentials, DonationAmount, FlowConfig, FormStep, LoginOutcome, Result,
    SessionState, TitheError,
};
use tracing::{debug, info, warn};

/// How often the two-outcome races re-probe the page
const RACE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Drives one donation run over a [`DonationPage`].
pub struct DonationDriver<P, S> {
    page: P,
    sleeper: S,
    credentials: Credentials,
    config: FlowConfig,
}

impl<P: DonationPage, S: Sleeper> DonationDriver<P, S> {
    pub fn new(page: P, sleeper: S, credentials: Credentials, config: FlowConfig) -> Self {
        Self {
            page,
            sleeper,
            credentials,
            config,
        }
    }

    /// Hand the page back, e.g. to release the underlying browser session.
    pub fn into_page(self) -> P {
        self.page
    }

    /// Run the donation protocol end to end.
    ///
    /// The caller owns session cleanup; this method only drives the page.
    pub async fn run(&self, amount: &DonationAmount) -> Result<tithe_core::RunReport> {
        // 1. Session check on the authenticated landing page
        self.page.navigate(selectors::AUTHORIZE_URL).await?;

        let session = if self.page.element_exists(selectors::PROFILE_MARKER).await {
            info!("Existing session detected, skipping login");
            SessionState::PreAuthenticated
        } else {
            info!("No existing session, performing login");
            SessionState::Anonymous
        };

        // 2. Login (anonymous sessions only)
        let login = match session {
            SessionState::PreAuthenticated => None,
            SessionState::Anonymous => Some(self.login().await?),
        };

        // 3. Donation entry page
        self.page.navigate(selectors::DONATION_START_URL).await?;

        // 4. Amount
        self.page
            .wait_for_element(selectors::AMOUNT_INPUT, self.config.control_timeout)
            .await?;
        self.page
            .type_text(selectors::AMOUNT_INPUT, amount.as_str())
            .await?;
        info!("Entered donation amount: {}", amount);

        // 5. Step 1 -> step 2. Non-fatal on failure: the position is
        // re-verified by the step-2 loop before anything irreversible.
        match self.page.activate_control(selectors::NEXT_STEP).await {
            Ok(ControlActivation::DirectInvoke) => info!("Advanced past {}", FormStep::Amount),
            Ok(ControlActivation::GeometryClick) => {
                info!("Advanced past {} via coordinate click", FormStep::Amount)
            }
            Err(e) => {
                let uncertain =
                    TitheError::StepAdvanceUncertain(format!("step 1 advance failed: {}", e));
                warn!("{}", uncertain);
            }
        }

        // 6. Step 2 -> step 3, the retry-heavy stage
        let reached_review = self.drive_to_review().await?;

        // 7. Submit, only when step 3 was actually reached
        if reached_review {
            self.submit().await;
        } else {
            warn!("Never reached {}, skipping submission", FormStep::Review);
        }

        // 8. Terminal confirmation race runs regardless
        let confirmation = self.confirm().await?;

        Ok(tithe_core::RunReport {
            session,
            login,
            reached_review,
            confirmation,
        })
    }

    /// Submit credentials through both Okta screens, then race the error
    /// panel against a positive session signal.
    async fn login(&self) -> Result<LoginOutcome> {
        self.page
            .wait_for_element(selectors::USERNAME_INPUT, self.config.control_timeout)
            .await?;
        self.page
            .type_text(selectors::USERNAME_INPUT, &self.credentials.username)
            .await?;
        self.page.click(selectors::LOGIN_SUBMIT).await?;

        self.page
            .wait_for_element(selectors::PASSWORD_INPUT, self.config.control_timeout)
            .await?;
        self.page
            .type_text(selectors::PASSWORD_INPUT, &self.credentials.password)
            .await?;
        self.page.click(selectors::LOGIN_SUBMIT).await?;

        match self.race_login_signals().await? {
            LoginOutcome::Failed(message) => {
                // Fatal for the run; the caller releases the session.
                Err(TitheError::AuthenticationFailed(message))
            }
            LoginOutcome::Established => {
                info!("Login established, proceeding to the donation page");
                Ok(LoginOutcome::Established)
            }
            LoginOutcome::Unknown => {
                warn!("No login signal within timeout; proceeding with unknown session state");
                Ok(LoginOutcome::Unknown)
            }
        }
    }

    /// Two-outcome wait: Okta error panel vs. navigation away from the
    /// identity provider. Neither within the timeout is an explicit Unknown,
    /// never treated as success.
    async fn race_login_signals(&self) -> Result<LoginOutcome> {
        for _ in 0..Self::ticks(self.config.login_error_timeout) {
            if self.page.element_exists(selectors::LOGIN_ERROR_PANEL).await {
                let message = self
                    .page
                    .text_content(selectors::LOGIN_ERROR_TEXT)
                    .await
                    .unwrap_or_else(|_| "unable to sign in".to_string());
                return Ok(LoginOutcome::Failed(message));
            }

            let url = self.page.current_url().await?;
            if !url.is_empty() && !url.contains(selectors::IDENTITY_HOST) {
                return Ok(LoginOutcome::Established);
            }

            self.sleeper.sleep(RACE_POLL_INTERVAL).await;
        }
        Ok(LoginOutcome::Unknown)
    }

    /// Outer poll loop for the step-2-to-3 advance.
    ///
    /// At most `step_poll_iterations` iterations; each re-reads the location
    /// and, while still on the bank-account step, makes one programmatic
    /// click attempt followed by the blind-retry fallback. Exhaustion is
    /// non-fatal.
    async fn drive_to_review(&self) -> Result<bool> {
        for iteration in 1..=self.config.step_poll_iterations {
            let url = self.page.current_url().await?;
            match FormStep::from_url(&url) {
                Some(step) if step >= FormStep::Review => {
                    info!("Reached {}", step);
                    return Ok(true);
                }
                Some(FormStep::BankAccount) => {
                    debug!(
                        "Still on {} (iteration {}/{})",
                        FormStep::BankAccount,
                        iteration,
                        self.config.step_poll_iterations
                    );
                    self.attempt_next_step().await;
                }
                other => {
                    debug!("Waiting for step change, currently at {:?}", other);
                }
            }
            self.sleeper.sleep(self.config.step_poll_delay).await;
        }

        // One last look before giving up; the final click may have landed.
        let url = self.page.current_url().await?;
        let reached = matches!(FormStep::from_url(&url), Some(step) if step >= FormStep::Review);
        if !reached {
            warn!(
                "Failed to reach {} after {} iterations",
                FormStep::Review,
                self.config.step_poll_iterations
            );
        }
        Ok(reached)
    }

    /// One advance attempt on the bank-account step: wait for the control to
    /// render visible and invoke its handler programmatically (it may be
    /// occluded); on failure fall back to blind raw clicks with backoff.
    async fn attempt_next_step(&self) {
        match self.programmatic_next().await {
            Ok(()) => info!("Invoked next-step control programmatically"),
            Err(e) => {
                warn!("Programmatic next-step attempt failed: {}", e);
                self.blind_retry_next().await;
            }
        }
    }

    async fn programmatic_next(&self) -> Result<()> {
        self.page
            .wait_for_element(selectors::NEXT_STEP_VISIBLE, self.config.control_timeout)
            .await?;
        self.page.invoke_click(selectors::NEXT_STEP).await
    }

    /// Blind raw-click retries, whether or not each click visibly succeeds.
    async fn blind_retry_next(&self) {
        let policy = self.config.blind_retry.clone();
        for attempt in 1..=policy.max_attempts {
            match self.page.click(selectors::NEXT_STEP).await {
                Ok(()) => {
                    info!("Blind retry {}/{}: clicked next step", attempt, policy.max_attempts)
                }
                Err(e) => {
                    warn!(
                        "Blind retry {}/{} failed: {}",
                        attempt, policy.max_attempts, e
                    );
                    return;
                }
            }
            self.sleeper.sleep(policy.delay_for(attempt)).await;
        }
    }

    /// Final submit on the review step. Failures here are absorbed; the
    /// confirmation race is the arbiter of what actually happened.
    async fn submit(&self) {
        info!("Waiting for submit control");
        let result = async {
            self.page
                .wait_for_element(selectors::SUBMIT, self.config.control_timeout)
                .await?;
            self.page.click(selectors::SUBMIT).await
        }
        .await;

        match result {
            Ok(()) => info!("Clicked submit"),
            Err(e) => {
                let uncertain = TitheError::StepAdvanceUncertain(format!("submit failed: {}", e));
                warn!("{}", uncertain);
            }
        }
    }

    /// Two-outcome wait for completion: exact thank-you URL, or the
    /// confirmation marker element. Timeout is a soft outcome, not an error.
    async fn confirm(&self) -> Result<Confirmation> {
        for _ in 0..Self::ticks(self.config.confirm_timeout) {
            let url = self.page.current_url().await?;
            if url == selectors::THANK_YOU_URL
                || self.page.element_exists(selectors::CONFIRMATION_MARKER).await
            {
                info!("Donation confirmed");
                return Ok(Confirmation::Confirmed);
            }
            self.sleeper.sleep(RACE_POLL_INTERVAL).await;
        }

        warn!("Donation confirmation not detected; it may still have been submitted, verify manually");
        Ok(Confirmation::Unconfirmed)
    }

    fn ticks(timeout: Duration) -> u32 {
        (timeout.as_millis() / RACE_POLL_INTERVAL.as_millis()).max(1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Everything the fake page observed and how it behaves.
    #[derive(Default)]
    struct FakeState {
        url: String,
        present: HashSet<String>,
        error_text: Option<String>,
        // Behavior knobs
        login_redirects: bool,
        next_advances: bool,
        submit_advances: bool,
        direct_next_fails: bool,
        geometry_next_fails: bool,
        next_visible_wait_fails: bool,
        // Recorded interactions
        navigations: Vec<String>,
        typed: Vec<(String, String)>,
        clicks: Vec<String>,
        center_clicks: Vec<String>,
        invokes: Vec<String>,
        login_submit_clicks: u32,
    }

    #[derive(Clone)]
    struct FakePage {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakePage {
        fn new(state: FakeState) -> Self {
            Self {
                state: Arc::new(Mutex::new(state)),
            }
        }

        fn advance_url(state: &mut FakeState) {
            state.url = match FormStep::from_url(&state.url) {
                Some(FormStep::Amount) => state.url.replace("step1", "step2"),
                Some(FormStep::BankAccount) => state.url.replace("step2", "step3"),
                _ => state.url.clone(),
            };
        }

        fn apply_click(state: &mut FakeState, selector: &str) {
            if selector == selectors::LOGIN_SUBMIT {
                state.login_submit_clicks += 1;
                // Second submit is the password screen; a well-behaved IdP
                // redirects to the landing page.
                if state.login_submit_clicks >= 2 && state.login_redirects {
                    state.url = "https://www.churchofjesuschrist.org/my-home/".to_string();
                }
            } else if selector == selectors::NEXT_STEP && state.next_advances {
                Self::advance_url(state);
            } else if selector == selectors::SUBMIT && state.submit_advances {
                state.url = selectors::THANK_YOU_URL.to_string();
            }
        }
    }

    #[async_trait]
    impl DonationPage for FakePage {
        async fn navigate(&self, url: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.navigations.push(url.to_string());
            state.url = url.to_string();
            Ok(())
        }

        async fn current_url(&self) -> Result<String> {
            Ok(self.state.lock().unwrap().url.clone())
        }

        async fn element_exists(&self, selector: &str) -> bool {
            self.state.lock().unwrap().present.contains(selector)
        }

        async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<()> {
            let state = self.state.lock().unwrap();
            if selector == selectors::NEXT_STEP_VISIBLE && state.next_visible_wait_fails {
                return Err(TitheError::Browser(format!("Element not found: {}", selector)));
            }
            if state.present.contains(selector) {
                Ok(())
            } else {
                Err(TitheError::Browser(format!("Element not found: {}", selector)))
            }
        }

        async fn text_content(&self, selector: &str) -> Result<String> {
            let state = self.state.lock().unwrap();
            if selector == selectors::LOGIN_ERROR_TEXT {
                if let Some(text) = &state.error_text {
                    return Ok(text.clone());
                }
            }
            Err(TitheError::Browser(format!("Element not found: {}", selector)))
        }

        async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
            self.state
                .lock()
                .unwrap()
                .typed
                .push((selector.to_string(), text.to_string()));
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if selector == selectors::NEXT_STEP && state.direct_next_fails {
                state.clicks.push(selector.to_string());
                return Err(TitheError::Browser("not clickable".to_string()));
            }
            state.clicks.push(selector.to_string());
            Self::apply_click(&mut state, selector);
            Ok(())
        }

        async fn click_center(&self, selector: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if selector == selectors::NEXT_STEP && state.geometry_next_fails {
                return Err(TitheError::Browser("no bounding box".to_string()));
            }
            state.center_clicks.push(selector.to_string());
            if selector == selectors::NEXT_STEP && state.next_advances {
                Self::advance_url(&mut state);
            }
            Ok(())
        }

        async fn invoke_click(&self, selector: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.invokes.push(selector.to_string());
            if selector == selectors::NEXT_STEP && state.next_advances {
                Self::advance_url(&mut state);
            }
            Ok(())
        }
    }

    /// Sleeper that records requested delays and returns immediately.
    #[derive(Clone, Default)]
    struct InstantSleeper {
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Sleeper for InstantSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "member@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn amount() -> DonationAmount {
        DonationAmount::parse("1").unwrap()
    }

    fn present(selectors_list: &[&str]) -> HashSet<String> {
        selectors_list.iter().map(|s| s.to_string()).collect()
    }

    /// A page where everything works and no session exists yet.
    fn happy_anonymous_state() -> FakeState {
        FakeState {
            present: present(&[
                selectors::USERNAME_INPUT,
                selectors::PASSWORD_INPUT,
                selectors::AMOUNT_INPUT,
                selectors::NEXT_STEP,
                selectors::NEXT_STEP_VISIBLE,
                selectors::SUBMIT,
            ]),
            login_redirects: true,
            next_advances: true,
            submit_advances: true,
            ..FakeState::default()
        }
    }

    fn driver(
        state: FakeState,
    ) -> (DonationDriver<FakePage, InstantSleeper>, FakePage, InstantSleeper) {
        let page = FakePage::new(state);
        let sleeper = InstantSleeper::default();
        let d = DonationDriver::new(
            page.clone(),
            sleeper.clone(),
            credentials(),
            FlowConfig::default(),
        );
        (d, page, sleeper)
    }

    #[tokio::test]
    async fn test_full_run_confirms_donation() {
        let (driver, page, _sleeper) = driver(happy_anonymous_state());

        let report = driver.run(&amount()).await.unwrap();

        assert_eq!(report.session, SessionState::Anonymous);
        assert_eq!(report.login, Some(LoginOutcome::Established));
        assert!(report.reached_review);
        assert_eq!(report.confirmation, Confirmation::Confirmed);

        let state = page.state.lock().unwrap();
        assert!(state
            .typed
            .contains(&(selectors::AMOUNT_INPUT.to_string(), "1".to_string())));
        assert!(state.clicks.contains(&selectors::SUBMIT.to_string()));
    }

    #[tokio::test]
    async fn test_preauthenticated_session_skips_login() {
        let mut state = happy_anonymous_state();
        state.present.insert(selectors::PROFILE_MARKER.to_string());
        let (driver, page, _sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();

        assert_eq!(report.session, SessionState::PreAuthenticated);
        assert_eq!(report.login, None);

        // No credential was ever typed
        let state = page.state.lock().unwrap();
        assert!(state
            .typed
            .iter()
            .all(|(selector, _)| selector == selectors::AMOUNT_INPUT));
        assert_eq!(state.login_submit_clicks, 0);
    }

    #[tokio::test]
    async fn test_error_panel_fails_authentication() {
        let mut state = happy_anonymous_state();
        state.login_redirects = false;
        state.present.insert(selectors::LOGIN_ERROR_PANEL.to_string());
        state.error_text = Some("Unable to sign in".to_string());
        let (driver, page, _sleeper) = driver(state);

        let err = driver.run(&amount()).await.unwrap_err();
        match err {
            TitheError::AuthenticationFailed(message) => {
                assert_eq!(message, "Unable to sign in")
            }
            other => panic!("expected AuthenticationFailed, got {}", other),
        }

        // The run aborted before the donation page
        let state = page.state.lock().unwrap();
        assert!(!state
            .navigations
            .contains(&selectors::DONATION_START_URL.to_string()));
    }

    #[tokio::test]
    async fn test_no_signal_is_unknown_but_proceeds() {
        let mut state = happy_anonymous_state();
        // No redirect, no error panel: the race times out
        state.login_redirects = false;
        let (driver, page, _sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();

        assert_eq!(report.login, Some(LoginOutcome::Unknown));
        // ...and the flow still went to the donation page
        let state = page.state.lock().unwrap();
        assert!(state
            .navigations
            .contains(&selectors::DONATION_START_URL.to_string()));
    }

    #[tokio::test]
    async fn test_step1_advance_falls_back_to_geometry_click() {
        let mut state = happy_anonymous_state();
        state.direct_next_fails = true;
        let (driver, page, _sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();

        assert!(report.reached_review);
        let state = page.state.lock().unwrap();
        assert!(state.center_clicks.contains(&selectors::NEXT_STEP.to_string()));
    }

    #[tokio::test]
    async fn test_step1_advance_failure_is_non_fatal() {
        let mut state = happy_anonymous_state();
        state.direct_next_fails = true;
        state.geometry_next_fails = true;
        let (driver, page, _sleeper) = driver(state);

        // Both click variants fail on step 1. The run is not aborted: it
        // carries on to the poll loop and the terminal check, and ends as a
        // soft failure with nothing submitted.
        let report = driver.run(&amount()).await.unwrap();
        assert!(!report.reached_review);
        assert_eq!(report.confirmation, Confirmation::Unconfirmed);
        let state = page.state.lock().unwrap();
        assert!(!state.clicks.contains(&selectors::SUBMIT.to_string()));
    }

    #[tokio::test]
    async fn test_exhausted_poll_loop_is_bounded_and_skips_submit() {
        let mut state = happy_anonymous_state();
        // Clicks never change the page: the form is wedged
        state.next_advances = false;
        let (driver, page, sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();

        // Review is never reached, so nothing was submitted
        assert!(!report.reached_review);
        assert_eq!(report.confirmation, Confirmation::Unconfirmed);

        let state = page.state.lock().unwrap();
        assert!(!state.clicks.contains(&selectors::SUBMIT.to_string()));
        // The outer loop slept step_poll_delay exactly step_poll_iterations times
        let config = FlowConfig::default();
        let outer_sleeps = sleeper
            .slept
            .lock()
            .unwrap()
            .iter()
            .filter(|d| **d == config.step_poll_delay)
            .count();
        assert_eq!(outer_sleeps, config.step_poll_iterations as usize);
    }

    #[tokio::test]
    async fn test_blind_retries_respect_policy_and_backoff() {
        let mut state = happy_anonymous_state();
        state.next_advances = false;
        state.next_visible_wait_fails = true;
        let (driver, page, sleeper) = driver(state);

        // Drive only the inner stage, starting directly on step 2 so every
        // iteration attempts the advance
        page.state.lock().unwrap().url =
            "https://donations.churchofjesuschrist.org/donations/#/donation/step2".to_string();
        let reached = driver.drive_to_review().await.unwrap();
        assert!(!reached);

        let config = FlowConfig::default();
        let state = page.state.lock().unwrap();
        // Each of the 5 outer iterations made exactly max_attempts raw clicks
        let next_clicks = state
            .clicks
            .iter()
            .filter(|s| s.as_str() == selectors::NEXT_STEP)
            .count();
        assert_eq!(
            next_clicks,
            (config.step_poll_iterations * config.blind_retry.max_attempts) as usize
        );
        // No programmatic invoke landed (the visible-wait kept failing)
        assert!(state.invokes.is_empty());

        // Backoff delays doubled up to the cap: 2s, 4s, 8s per iteration
        let slept = sleeper.slept.lock().unwrap();
        let backoffs: Vec<_> = slept
            .iter()
            .filter(|d| **d != config.step_poll_delay)
            .collect();
        assert_eq!(backoffs.len(), (config.step_poll_iterations * 3) as usize);
        assert_eq!(*backoffs[0], Duration::from_secs(2));
        assert_eq!(*backoffs[1], Duration::from_secs(4));
        assert_eq!(*backoffs[2], Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_confirmation_via_marker_element() {
        let mut state = happy_anonymous_state();
        // Submit does not navigate to the thank-you URL; only the marker
        // element signals success
        state.submit_advances = false;
        state.present.insert(selectors::CONFIRMATION_MARKER.to_string());
        let (driver, page, _sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();
        assert_eq!(report.confirmation, Confirmation::Confirmed);
        // The URL never reached the terminal location
        assert_ne!(page.state.lock().unwrap().url, selectors::THANK_YOU_URL);
    }

    #[tokio::test]
    async fn test_unconfirmed_is_soft_not_an_error() {
        let mut state = happy_anonymous_state();
        // Submit click goes nowhere: stay on step 3, no marker appears
        state.present.remove(selectors::SUBMIT);
        let (driver, page, _sleeper) = driver(state);

        let report = driver.run(&amount()).await.unwrap();

        assert!(report.reached_review);
        assert_eq!(report.confirmation, Confirmation::Unconfirmed);
        // The submit wait failed, but that was absorbed
        let state = page.state.lock().unwrap();
        assert!(!state.clicks.contains(&selectors::SUBMIT.to_string()));
    }
}
