use crate::config::TrialConfig;
use crate::digits::DigitProbe;
use rand::Rng;
use rsvp_core::{
    DigitAnswer, FullscreenGuardian, HostPage, KEY_DIGIT_RESPONSE, KEY_RECALL,
    RECALL_TIMEOUT_SENTINEL, ResultSink, ResumePolicy, SessionContext, SessionStore, Surface,
    TrialError, TrialState, TrialSummary, View,
};
use rsvp_timing::{Clock, TimerHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the host can feed into a running trial: user interactions,
/// fullscreen changes, and fired timers.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    StartClicked,
    ContinueClicked,
    YesClicked,
    NoClicked,
    DraftChanged(String),
    TextSubmitted(String),
    FullscreenChanged(bool),
    TimerFired(TimerHandle),
}

/// Host-side collaborators, owned by the controller for the lifetime of one
/// trial.
pub struct Ports {
    pub surface: Box<dyn Surface>,
    pub guardian: Box<dyn FullscreenGuardian>,
    pub sink: Box<dyn ResultSink>,
    pub host: Box<dyn HostPage>,
    pub session_store: Box<dyn SessionStore>,
}

/// Drives one RSVP trial from instructions through free recall.
///
/// Single-threaded and event-driven: every mutation happens inside
/// [`TrialController::handle_event`], in response to a user interaction, a
/// fullscreen change, or a fired timer. At most one timer is outstanding at
/// any instant; entering a stage cancels the previous handle before arming
/// the next.
pub struct TrialController<C: Clock, R: Rng> {
    pub clock: C,
    rng: R,
    config: TrialConfig,
    sentence: String,
    words: Vec<String>,

    state: TrialState,
    word_index: usize,
    probe: Option<DigitProbe>,
    digit_answer: Option<DigitAnswer>,
    recall: Option<String>,
    draft: String,
    recall_remaining: u32,
    recall_timed_out: bool,
    show_empty_error: bool,
    paused_from: Option<TrialState>,
    pending: Option<TimerHandle>,

    session: SessionContext,
    ports: Ports,
    advance_requested: bool,
}

impl<C: Clock, R: Rng> TrialController<C, R> {
    pub fn new(
        config: TrialConfig,
        sentence: &str,
        session: SessionContext,
        ports: Ports,
        clock: C,
        rng: R,
    ) -> Result<Self, TrialError> {
        config.validate()?;
        let words: Vec<String> = sentence.split_whitespace().map(str::to_owned).collect();
        if words.is_empty() {
            return Err(TrialError::EmptySentence);
        }

        Ok(Self {
            clock,
            rng,
            config,
            sentence: sentence.trim().to_owned(),
            words,
            state: TrialState::Instructions,
            word_index: 0,
            probe: None,
            digit_answer: None,
            recall: None,
            draft: String::new(),
            recall_remaining: 0,
            recall_timed_out: false,
            show_empty_error: false,
            paused_from: None,
            pending: None,
            session,
            ports,
            advance_requested: false,
        })
    }

    /// Initial dispatch: full instructions on a fresh session, a lighter
    /// confirmation for a returning participant still in fullscreen, and a
    /// re-entry prompt for one who left fullscreen between trials.
    pub fn start(&mut self) {
        info!(words = self.words.len(), "trial starting");
        if self.session.has_entered_fullscreen && self.ports.guardian.is_active() {
            self.enter_ready_confirmation();
        } else if self.session.has_entered_fullscreen {
            self.enter_fullscreen_prompt();
        } else {
            self.enter_instructions();
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn session(&self) -> SessionContext {
        self.session
    }

    /// Drain the clock and replay every fired timer through the machine.
    /// The host calls this once per frame.
    pub fn pump(&mut self) {
        let fired = self.clock.due();
        for handle in fired {
            self.handle_event(TrialEvent::TimerFired(handle));
        }
    }

    pub fn handle_event(&mut self, event: TrialEvent) {
        match event {
            TrialEvent::FullscreenChanged(active) => self.on_fullscreen_changed(active),
            TrialEvent::TimerFired(handle) => self.on_timer_fired(handle),
            TrialEvent::StartClicked => self.on_start_clicked(),
            TrialEvent::ContinueClicked => self.on_continue_clicked(),
            TrialEvent::YesClicked => self.on_answer(DigitAnswer::Yes),
            TrialEvent::NoClicked => self.on_answer(DigitAnswer::No),
            TrialEvent::DraftChanged(text) => self.on_draft_changed(text),
            TrialEvent::TextSubmitted(text) => self.on_text_submitted(text),
        }
    }

    /// Cancels any outstanding timer and detaches the surface. Called by the
    /// host when the page advances past this trial.
    pub fn teardown(&mut self) {
        self.cancel_pending();
        self.ports.surface.clear();
    }

    // ── Timer plumbing ───────────────────────────────────────────────

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.clock.cancel(handle);
        }
    }

    fn arm_after(&mut self, delay: Duration) {
        self.cancel_pending();
        self.pending = Some(self.clock.after(delay));
    }

    fn arm_every(&mut self, period: Duration) {
        self.cancel_pending();
        self.pending = Some(self.clock.every(period));
    }

    fn transition(&mut self, next: TrialState) {
        debug!(from = ?self.state, to = ?next, "transition");
        self.state = next;
    }

    fn on_timer_fired(&mut self, handle: TimerHandle) {
        if self.pending != Some(handle) {
            debug!(?handle, "stale timer ignored");
            return;
        }
        // Repeating stages keep their handle; one-shot stages consume it.
        if !matches!(self.state, TrialState::Rsvp | TrialState::FreeRecall) {
            self.pending = None;
        }
        match self.state {
            TrialState::Ready => self.enter_asterisks(),
            TrialState::Asterisks => self.enter_blank(),
            TrialState::Blank => self.enter_rsvp(),
            TrialState::Rsvp => self.on_word_tick(),
            TrialState::Mask => self.enter_distractor_digits(),
            TrialState::DistractorDigits => self.enter_percent_signs(),
            TrialState::PercentSigns => self.enter_spelled_digit(),
            TrialState::SpelledDigit => self.enter_digit_question(),
            TrialState::DigitQuestion => self.enter_free_recall(),
            TrialState::FreeRecall => self.on_countdown_tick(),
            TrialState::Instructions
            | TrialState::FullscreenPrompt
            | TrialState::ReadyConfirmation
            | TrialState::Paused
            | TrialState::End => {
                debug!(state = ?self.state, "timer fired in untimed state; ignored")
            }
        }
    }

    // ── Stage entries ────────────────────────────────────────────────

    fn enter_instructions(&mut self) {
        self.cancel_pending();
        self.transition(TrialState::Instructions);
        self.render_instructions(false);
    }

    fn render_instructions(&mut self, fullscreen_notice: bool) {
        self.ports.surface.render(&View::Instructions {
            start_enabled: self.ports.guardian.is_active(),
            fullscreen_notice,
        });
    }

    fn enter_fullscreen_prompt(&mut self) {
        self.cancel_pending();
        self.transition(TrialState::FullscreenPrompt);
        self.ports.surface.render(&View::FullscreenPrompt);
    }

    fn enter_ready_confirmation(&mut self) {
        self.cancel_pending();
        self.transition(TrialState::ReadyConfirmation);
        self.ports.surface.render(&View::ReadyConfirmation);
    }

    fn enter_ready(&mut self) {
        self.transition(TrialState::Ready);
        self.ports.surface.render(&View::Ready);
        self.arm_after(Duration::from_millis(self.config.ready_duration_ms));
    }

    fn enter_asterisks(&mut self) {
        self.transition(TrialState::Asterisks);
        self.ports.surface.render(&View::Fixation);
        self.arm_after(Duration::from_millis(self.config.asterisks_duration_ms));
    }

    fn enter_blank(&mut self) {
        self.transition(TrialState::Blank);
        self.ports.surface.clear();
        self.arm_after(Duration::from_millis(self.config.blank_duration_ms));
    }

    fn enter_rsvp(&mut self) {
        self.transition(TrialState::Rsvp);
        self.word_index = 0;
        self.ports
            .surface
            .render(&View::Word(self.words[0].clone()));
        self.arm_every(self.config.word_tick());
    }

    fn on_word_tick(&mut self) {
        self.word_index += 1;
        if self.word_index < self.words.len() {
            self.ports
                .surface
                .render(&View::Word(self.words[self.word_index].clone()));
        } else {
            self.cancel_pending();
            self.enter_mask();
        }
    }

    fn enter_mask(&mut self) {
        self.transition(TrialState::Mask);
        self.ports.surface.render(&View::Mask);
        self.arm_after(Duration::from_millis(self.config.mask_duration_ms));
    }

    fn enter_distractor_digits(&mut self) {
        self.transition(TrialState::DistractorDigits);
        let probe = DigitProbe::generate(&mut self.rng);
        debug!(
            digits = %probe.shown_line(),
            spelled = probe.spelled(),
            present = probe.present,
            "distractor generated"
        );
        self.ports.surface.render(&View::DigitSet(probe.shown_line()));
        self.probe = Some(probe);
        self.arm_after(Duration::from_millis(self.config.digits_duration_ms));
    }

    fn enter_percent_signs(&mut self) {
        self.transition(TrialState::PercentSigns);
        self.ports.surface.render(&View::PercentSigns);
        self.arm_after(Duration::from_millis(self.config.percent_duration_ms));
    }

    fn enter_spelled_digit(&mut self) {
        self.transition(TrialState::SpelledDigit);
        let spelled = self.spelled_probe();
        self.ports.surface.render(&View::SpelledDigit(spelled));
        self.arm_after(Duration::from_millis(self.config.spelled_duration_ms));
    }

    fn enter_digit_question(&mut self) {
        self.transition(TrialState::DigitQuestion);
        let spelled = self.spelled_probe();
        self.ports.surface.render(&View::DigitQuestion {
            spelled,
            answered: self.digit_answer,
        });
        if self.digit_answer.is_some() {
            // Re-entry after a pause with the judgment already recorded:
            // hold briefly and move on instead of re-asking.
            self.arm_after(Duration::from_millis(self.config.answer_hold_ms));
        }
    }

    fn on_answer(&mut self, answer: DigitAnswer) {
        if self.state != TrialState::DigitQuestion || self.digit_answer.is_some() {
            return;
        }
        self.digit_answer = Some(answer);
        let correct = self
            .probe
            .as_ref()
            .map(|p| (answer == DigitAnswer::Yes) == p.present);
        debug!(answer = answer.as_str(), ?correct, "digit judgment recorded");

        let spelled = self.spelled_probe();
        self.ports.surface.render(&View::DigitQuestion {
            spelled,
            answered: Some(answer),
        });
        self.arm_after(Duration::from_millis(self.config.answer_hold_ms));
    }

    fn enter_free_recall(&mut self) {
        self.transition(TrialState::FreeRecall);
        self.draft.clear();
        self.show_empty_error = false;
        self.recall_timed_out = false;
        self.recall_remaining = self.config.recall_budget_secs;
        self.render_free_recall();
        self.arm_every(Duration::from_secs(1));
    }

    fn render_free_recall(&mut self) {
        self.ports.surface.render(&View::FreeRecall {
            remaining_secs: self.recall_remaining,
            draft: self.draft.clone(),
            show_empty_error: self.show_empty_error,
        });
    }

    fn on_countdown_tick(&mut self) {
        self.recall_remaining = self.recall_remaining.saturating_sub(1);
        if self.recall_remaining == 0 {
            self.cancel_pending();
            self.recall_timed_out = true;
            debug!("recall window expired");
            self.ports.surface.render(&View::RecallTimedOut {
                draft: self.draft.clone(),
            });
        } else {
            self.render_free_recall();
        }
    }

    fn on_draft_changed(&mut self, text: String) {
        if self.state != TrialState::FreeRecall || self.recall_timed_out {
            return;
        }
        self.draft = text;
        if !self.draft.trim().is_empty() {
            self.show_empty_error = false;
        }
        self.render_free_recall();
    }

    fn on_text_submitted(&mut self, text: String) {
        if self.state != TrialState::FreeRecall || self.recall_timed_out {
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.show_empty_error = true;
            self.render_free_recall();
            return;
        }
        self.finalize_recall(trimmed.to_owned());
    }

    fn on_start_clicked(&mut self) {
        if self.state != TrialState::Instructions {
            return;
        }
        if self.ports.guardian.is_active() {
            self.enter_ready();
        } else {
            self.render_instructions(true);
        }
    }

    fn on_continue_clicked(&mut self) {
        match self.state {
            TrialState::ReadyConfirmation => self.enter_ready(),
            TrialState::FreeRecall if self.recall_timed_out => {
                let trimmed = self.draft.trim();
                let recall = if trimmed.is_empty() {
                    RECALL_TIMEOUT_SENTINEL.to_owned()
                } else {
                    trimmed.to_owned()
                };
                self.finalize_recall(recall);
            }
            _ => {}
        }
    }

    // ── Pause / resume ───────────────────────────────────────────────

    fn on_fullscreen_changed(&mut self, active: bool) {
        debug!(active, "fullscreen changed");
        if active && !self.session.has_entered_fullscreen {
            self.session.has_entered_fullscreen = true;
            self.ports.session_store.save(&self.session);
        }
        match (self.state, active) {
            (TrialState::Paused, true) => self.resume(),
            (TrialState::FullscreenPrompt, true) => self.enter_ready_confirmation(),
            (TrialState::Instructions, _) => self.render_instructions(false),
            (state, false) if state.is_pausable() => self.pause(),
            _ => {}
        }
    }

    fn pause(&mut self) {
        self.cancel_pending();
        self.paused_from = Some(self.state);
        self.transition(TrialState::Paused);
        self.ports.surface.render(&View::Paused);
    }

    fn resume(&mut self) {
        let Some(from) = self.paused_from.take() else {
            self.enter_ready_confirmation();
            return;
        };
        debug!(?from, "resuming");
        match from.resume_policy() {
            ResumePolicy::Reenter => match from {
                TrialState::ReadyConfirmation => self.enter_ready_confirmation(),
                TrialState::DigitQuestion => self.enter_digit_question(),
                TrialState::FreeRecall => self.enter_free_recall(),
                _ => self.enter_ready(),
            },
            ResumePolicy::RestartSequence => self.enter_ready(),
        }
    }

    // ── Finalization ─────────────────────────────────────────────────

    fn finalize_recall(&mut self, recall: String) {
        if self.recall.is_some() {
            return;
        }
        self.recall = Some(recall);
        self.enter_end();
    }

    fn enter_end(&mut self) {
        self.cancel_pending();
        self.transition(TrialState::End);

        let recall = self.recall.clone().unwrap_or_default();
        self.store_result(KEY_RECALL, &recall);
        let answer_str = self.digit_answer.map(|a| a.as_str()).unwrap_or("none");
        self.store_result(KEY_DIGIT_RESPONSE, answer_str);

        if self.ports.guardian.is_active() {
            self.ports.guardian.exit();
        }

        if let (Some(answer), Some(probe)) = (self.digit_answer, &self.probe) {
            let summary = TrialSummary {
                sentence: self.sentence.clone(),
                recall,
                digits: probe.shown_line(),
                spelled: probe.spelled().to_owned(),
                present: probe.present,
                answer,
            };
            self.ports.surface.render(&View::End(summary));
        }

        if !self.advance_requested {
            self.advance_requested = true;
            self.ports.host.request_advance();
        }
        info!("trial finished");
    }

    fn store_result(&mut self, key: &str, value: &str) {
        if let Err(err) = self.ports.sink.store(key, value) {
            warn!(%err, "result write failed; continuing");
        }
    }

    fn spelled_probe(&self) -> String {
        self.probe
            .as_ref()
            .map(|p| p.spelled().to_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rsvp_timing::ManualClock;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type TestController = TrialController<ManualClock, StdRng>;

    #[derive(Default)]
    struct Shared {
        views: RefCell<Vec<View>>,
        clears: Cell<usize>,
        stored: RefCell<Vec<(String, String)>>,
        advances: Cell<usize>,
        fullscreen: Cell<bool>,
        saved_sessions: RefCell<Vec<SessionContext>>,
        sink_fails: Cell<bool>,
    }

    impl Shared {
        fn last_view(&self) -> View {
            self.views.borrow().last().cloned().expect("no view rendered")
        }
    }

    struct TestSurface(Rc<Shared>);
    impl Surface for TestSurface {
        fn render(&mut self, view: &View) {
            self.0.views.borrow_mut().push(view.clone());
        }
        fn clear(&mut self) {
            self.0.clears.set(self.0.clears.get() + 1);
        }
    }

    struct TestGuardian(Rc<Shared>);
    impl FullscreenGuardian for TestGuardian {
        fn is_active(&self) -> bool {
            self.0.fullscreen.get()
        }
        fn request(&mut self) {
            self.0.fullscreen.set(true);
        }
        fn exit(&mut self) {
            self.0.fullscreen.set(false);
        }
    }

    struct TestSink(Rc<Shared>);
    impl ResultSink for TestSink {
        fn store(&mut self, key: &str, value: &str) -> Result<(), rsvp_core::SinkError> {
            if self.0.sink_fails.get() {
                return Err(rsvp_core::SinkError::new(key, "disk full"));
            }
            self.0.stored.borrow_mut().push((key.into(), value.into()));
            Ok(())
        }
    }

    struct TestHost(Rc<Shared>);
    impl HostPage for TestHost {
        fn request_advance(&mut self) {
            self.0.advances.set(self.0.advances.get() + 1);
        }
    }

    struct TestSessionStore(Rc<Shared>);
    impl SessionStore for TestSessionStore {
        fn load(&mut self) -> SessionContext {
            self.0
                .saved_sessions
                .borrow()
                .last()
                .copied()
                .unwrap_or_default()
        }
        fn save(&mut self, ctx: &SessionContext) {
            self.0.saved_sessions.borrow_mut().push(*ctx);
        }
    }

    fn ports(shared: &Rc<Shared>) -> Ports {
        Ports {
            surface: Box::new(TestSurface(shared.clone())),
            guardian: Box::new(TestGuardian(shared.clone())),
            sink: Box::new(TestSink(shared.clone())),
            host: Box::new(TestHost(shared.clone())),
            session_store: Box::new(TestSessionStore(shared.clone())),
        }
    }

    fn harness_with(sentence: &str, session: SessionContext) -> (TestController, Rc<Shared>) {
        let shared = Rc::new(Shared::default());
        let ctl = TrialController::new(
            TrialConfig::default(),
            sentence,
            session,
            ports(&shared),
            ManualClock::new(),
            StdRng::seed_from_u64(7),
        )
        .expect("harness trial");
        (ctl, shared)
    }

    fn harness(sentence: &str) -> (TestController, Rc<Shared>) {
        harness_with(sentence, SessionContext::default())
    }

    /// Advance virtual time, pump fired timers, and check the one-timer
    /// invariant after every step.
    fn advance(ctl: &mut TestController, ms: u64) {
        ctl.clock.advance(Duration::from_millis(ms));
        ctl.pump();
        assert!(ctl.clock.outstanding() <= 1, "timer leak");
    }

    /// Fresh-session entry: instructions, fullscreen on, start click.
    fn begin(ctl: &mut TestController, shared: &Rc<Shared>) {
        ctl.start();
        assert_eq!(ctl.state(), TrialState::Instructions);
        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));
        ctl.handle_event(TrialEvent::StartClicked);
        assert_eq!(ctl.state(), TrialState::Ready);
    }

    /// Step in 10 ms increments until the machine reaches `target`.
    fn run_until(ctl: &mut TestController, target: TrialState) {
        let mut spent = 0u64;
        while ctl.state() != target {
            advance(ctl, 10);
            spent += 10;
            assert!(spent < 10_000, "never reached {target:?}");
        }
    }

    fn run_to_digit_question(ctl: &mut TestController, shared: &Rc<Shared>) {
        begin(ctl, shared);
        advance(ctl, 1000);
        assert_eq!(ctl.state(), TrialState::Asterisks);
        advance(ctl, 300);
        assert_eq!(ctl.state(), TrialState::Blank);
        advance(ctl, 100);
        assert_eq!(ctl.state(), TrialState::Rsvp);
        let ticks = ctl.words.len() as u64;
        for _ in 0..ticks {
            advance(ctl, 240);
        }
        assert_eq!(ctl.state(), TrialState::Mask);
        advance(ctl, 100);
        assert_eq!(ctl.state(), TrialState::DistractorDigits);
        advance(ctl, 533);
        assert_eq!(ctl.state(), TrialState::PercentSigns);
        advance(ctl, 100);
        assert_eq!(ctl.state(), TrialState::SpelledDigit);
        advance(ctl, 500);
        assert_eq!(ctl.state(), TrialState::DigitQuestion);
    }

    fn run_to_free_recall(ctl: &mut TestController, shared: &Rc<Shared>) {
        run_to_digit_question(ctl, shared);
        ctl.handle_event(TrialEvent::YesClicked);
        advance(ctl, 600);
        assert_eq!(ctl.state(), TrialState::FreeRecall);
    }

    #[test]
    fn refuses_empty_sentence() {
        let shared = Rc::new(Shared::default());
        let err = TrialController::new(
            TrialConfig::default(),
            "   \t ",
            SessionContext::default(),
            ports(&shared),
            ManualClock::new(),
            StdRng::seed_from_u64(1),
        )
        .err()
        .expect("empty sentence must be rejected");
        assert_eq!(err, TrialError::EmptySentence);
    }

    #[test]
    fn start_without_fullscreen_shows_notice_and_stays() {
        let (mut ctl, shared) = harness("Cats sleep often");
        ctl.start();
        ctl.handle_event(TrialEvent::StartClicked);
        assert_eq!(ctl.state(), TrialState::Instructions);
        assert_eq!(
            shared.last_view(),
            View::Instructions {
                start_enabled: false,
                fullscreen_notice: true,
            }
        );
    }

    #[test]
    fn words_visit_every_index_in_order_before_mask() {
        let (mut ctl, shared) = harness("Cats sleep often");
        begin(&mut ctl, &shared);
        advance(&mut ctl, 1000);
        advance(&mut ctl, 300);
        advance(&mut ctl, 100);
        assert_eq!(ctl.state(), TrialState::Rsvp);

        // First word is shown at t=0 of the stage, not after a tick.
        assert_eq!(shared.last_view(), View::Word("Cats".into()));
        advance(&mut ctl, 240);
        assert_eq!(ctl.state(), TrialState::Rsvp);
        advance(&mut ctl, 240);
        assert_eq!(ctl.state(), TrialState::Rsvp);
        advance(&mut ctl, 240);
        assert_eq!(ctl.state(), TrialState::Mask);

        let words: Vec<String> = shared
            .views
            .borrow()
            .iter()
            .filter_map(|v| match v {
                View::Word(w) => Some(w.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(words, ["Cats", "sleep", "often"]);
        assert!(shared.clears.get() >= 1, "blank stage must clear the surface");
    }

    #[test]
    fn digit_probe_is_generated_at_distractor_entry() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_digit_question(&mut ctl, &shared);
        let probe = ctl.probe.clone().expect("probe generated");
        let mut sorted = probe.shown;
        sorted.sort_unstable();
        for pair in sorted.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(probe.present, probe.shown.contains(&probe.probe));
    }

    #[test]
    fn full_trial_happy_path() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_digit_question(&mut ctl, &shared);

        ctl.handle_event(TrialEvent::YesClicked);
        assert_eq!(ctl.digit_answer, Some(DigitAnswer::Yes));
        // The second click never overwrites the recorded judgment.
        ctl.handle_event(TrialEvent::NoClicked);
        assert_eq!(ctl.digit_answer, Some(DigitAnswer::Yes));

        advance(&mut ctl, 600);
        assert_eq!(ctl.state(), TrialState::FreeRecall);

        ctl.handle_event(TrialEvent::DraftChanged("cats sleep".into()));
        ctl.handle_event(TrialEvent::TextSubmitted("cats sleep".into()));
        assert_eq!(ctl.state(), TrialState::End);

        assert_eq!(
            *shared.stored.borrow(),
            vec![
                ("recall".to_string(), "cats sleep".to_string()),
                ("digit_response".to_string(), "yes".to_string()),
            ]
        );
        assert_eq!(shared.advances.get(), 1);
        assert!(!shared.fullscreen.get(), "fullscreen exited at end");
        match shared.last_view() {
            View::End(summary) => {
                assert_eq!(summary.recall, "cats sleep");
                assert_eq!(summary.answer, DigitAnswer::Yes);
            }
            other => panic!("expected end summary, got {other:?}"),
        }

        // A duplicate submission changes nothing.
        ctl.handle_event(TrialEvent::TextSubmitted("again".into()));
        assert_eq!(shared.advances.get(), 1);
        assert_eq!(shared.stored.borrow().len(), 2);
    }

    #[test]
    fn empty_recall_is_rejected_then_retry_succeeds() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_free_recall(&mut ctl, &shared);

        ctl.handle_event(TrialEvent::TextSubmitted("   ".into()));
        assert_eq!(ctl.state(), TrialState::FreeRecall);
        match shared.last_view() {
            View::FreeRecall {
                show_empty_error, ..
            } => assert!(show_empty_error),
            other => panic!("expected free recall view, got {other:?}"),
        }
        assert_eq!(shared.advances.get(), 0);

        // Typing hides the error again.
        ctl.handle_event(TrialEvent::DraftChanged("c".into()));
        match shared.last_view() {
            View::FreeRecall {
                show_empty_error, ..
            } => assert!(!show_empty_error),
            other => panic!("expected free recall view, got {other:?}"),
        }

        ctl.handle_event(TrialEvent::TextSubmitted("c".into()));
        assert_eq!(ctl.state(), TrialState::End);
        assert_eq!(shared.advances.get(), 1);
    }

    #[test]
    fn countdown_timeout_finalizes_with_sentinel() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_free_recall(&mut ctl, &shared);

        for _ in 0..59 {
            advance(&mut ctl, 1000);
        }
        assert_eq!(ctl.state(), TrialState::FreeRecall);
        match shared.last_view() {
            View::FreeRecall { remaining_secs, .. } => assert_eq!(remaining_secs, 1),
            other => panic!("expected free recall view, got {other:?}"),
        }

        advance(&mut ctl, 1000);
        assert!(matches!(shared.last_view(), View::RecallTimedOut { .. }));
        assert_eq!(ctl.clock.outstanding(), 0, "countdown must be cancelled");

        // The submit path is closed once the window expired.
        ctl.handle_event(TrialEvent::TextSubmitted("late".into()));
        assert_eq!(ctl.state(), TrialState::FreeRecall);

        ctl.handle_event(TrialEvent::ContinueClicked);
        assert_eq!(ctl.state(), TrialState::End);
        assert_eq!(
            shared.stored.borrow()[0],
            ("recall".to_string(), RECALL_TIMEOUT_SENTINEL.to_string())
        );
        assert_eq!(shared.advances.get(), 1);
    }

    #[test]
    fn countdown_timeout_keeps_surviving_draft() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_free_recall(&mut ctl, &shared);

        ctl.handle_event(TrialEvent::DraftChanged("Cats sl".into()));
        for _ in 0..60 {
            advance(&mut ctl, 1000);
        }
        ctl.handle_event(TrialEvent::ContinueClicked);
        assert_eq!(
            shared.stored.borrow()[0],
            ("recall".to_string(), "Cats sl".to_string())
        );
    }

    #[test]
    fn pause_in_timed_stages_restarts_from_ready() {
        for target in [
            TrialState::Ready,
            TrialState::Asterisks,
            TrialState::Blank,
            TrialState::Rsvp,
            TrialState::Mask,
            TrialState::DistractorDigits,
            TrialState::PercentSigns,
            TrialState::SpelledDigit,
        ] {
            let (mut ctl, shared) = harness("Cats sleep often");
            begin(&mut ctl, &shared);
            run_until(&mut ctl, target);

            shared.fullscreen.set(false);
            ctl.handle_event(TrialEvent::FullscreenChanged(false));
            assert_eq!(ctl.state(), TrialState::Paused, "pausing {target:?}");
            assert_eq!(ctl.clock.outstanding(), 0, "timer leak pausing {target:?}");

            shared.fullscreen.set(true);
            ctl.handle_event(TrialEvent::FullscreenChanged(true));
            assert_eq!(ctl.state(), TrialState::Ready, "resume from {target:?}");
            assert_eq!(ctl.clock.outstanding(), 1);
        }
    }

    #[test]
    fn pause_before_digit_answer_reenters_question() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_digit_question(&mut ctl, &shared);

        shared.fullscreen.set(false);
        ctl.handle_event(TrialEvent::FullscreenChanged(false));
        assert_eq!(ctl.state(), TrialState::Paused);

        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));
        assert_eq!(ctl.state(), TrialState::DigitQuestion);
        assert_eq!(ctl.digit_answer, None);
        assert_eq!(ctl.clock.outstanding(), 0, "no timer while awaiting answer");
    }

    #[test]
    fn pause_during_answer_hold_preserves_judgment() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_digit_question(&mut ctl, &shared);
        ctl.handle_event(TrialEvent::YesClicked);

        shared.fullscreen.set(false);
        ctl.handle_event(TrialEvent::FullscreenChanged(false));
        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));

        assert_eq!(ctl.state(), TrialState::DigitQuestion);
        assert_eq!(ctl.digit_answer, Some(DigitAnswer::Yes));
        match shared.last_view() {
            View::DigitQuestion { answered, .. } => assert_eq!(answered, Some(DigitAnswer::Yes)),
            other => panic!("expected digit question view, got {other:?}"),
        }

        advance(&mut ctl, 600);
        assert_eq!(ctl.state(), TrialState::FreeRecall);
    }

    #[test]
    fn pause_during_free_recall_resets_countdown_and_draft() {
        let (mut ctl, shared) = harness("Cats sleep often");
        run_to_free_recall(&mut ctl, &shared);

        ctl.handle_event(TrialEvent::DraftChanged("half typed".into()));
        for _ in 0..5 {
            advance(&mut ctl, 1000);
        }

        shared.fullscreen.set(false);
        ctl.handle_event(TrialEvent::FullscreenChanged(false));
        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));

        assert_eq!(ctl.state(), TrialState::FreeRecall);
        assert_eq!(
            shared.last_view(),
            View::FreeRecall {
                remaining_secs: 60,
                draft: String::new(),
                show_empty_error: false,
            }
        );
    }

    #[test]
    fn pause_in_ready_confirmation_reenters_it() {
        let (mut ctl, shared) = harness_with(
            "Cats sleep often",
            SessionContext {
                has_entered_fullscreen: true,
            },
        );
        shared.fullscreen.set(true);
        ctl.start();
        assert_eq!(ctl.state(), TrialState::ReadyConfirmation);

        shared.fullscreen.set(false);
        ctl.handle_event(TrialEvent::FullscreenChanged(false));
        assert_eq!(ctl.state(), TrialState::Paused);
        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));
        assert_eq!(ctl.state(), TrialState::ReadyConfirmation);
    }

    #[test]
    fn first_fullscreen_entry_persists_session_flag() {
        let (mut ctl, shared) = harness("Cats sleep often");
        ctl.start();
        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));

        assert!(ctl.session().has_entered_fullscreen);
        assert_eq!(
            shared.saved_sessions.borrow().as_slice(),
            &[SessionContext {
                has_entered_fullscreen: true,
            }]
        );
    }

    #[test]
    fn returning_session_in_fullscreen_skips_instructions() {
        let (mut ctl, shared) = harness_with(
            "Cats sleep often",
            SessionContext {
                has_entered_fullscreen: true,
            },
        );
        shared.fullscreen.set(true);
        ctl.start();
        assert_eq!(ctl.state(), TrialState::ReadyConfirmation);
        ctl.handle_event(TrialEvent::ContinueClicked);
        assert_eq!(ctl.state(), TrialState::Ready);
    }

    #[test]
    fn returning_session_out_of_fullscreen_gets_prompt() {
        let (mut ctl, shared) = harness_with(
            "Cats sleep often",
            SessionContext {
                has_entered_fullscreen: true,
            },
        );
        ctl.start();
        assert_eq!(ctl.state(), TrialState::FullscreenPrompt);

        shared.fullscreen.set(true);
        ctl.handle_event(TrialEvent::FullscreenChanged(true));
        assert_eq!(ctl.state(), TrialState::ReadyConfirmation);
    }

    #[test]
    fn sink_failure_does_not_stall_the_trial() {
        let (mut ctl, shared) = harness("Cats sleep often");
        shared.sink_fails.set(true);
        run_to_free_recall(&mut ctl, &shared);
        ctl.handle_event(TrialEvent::TextSubmitted("cats".into()));

        assert_eq!(ctl.state(), TrialState::End);
        assert_eq!(shared.advances.get(), 1);
        assert!(shared.stored.borrow().is_empty());
    }

    #[test]
    fn teardown_cancels_timers_and_clears_surface() {
        let (mut ctl, shared) = harness("Cats sleep often");
        begin(&mut ctl, &shared);
        assert_eq!(ctl.clock.outstanding(), 1);
        let clears = shared.clears.get();
        ctl.teardown();
        assert_eq!(ctl.clock.outstanding(), 0);
        assert_eq!(shared.clears.get(), clears + 1);
    }
}
