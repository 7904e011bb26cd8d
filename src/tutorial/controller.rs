//! TutorialController: drives the tutorial state machine and its side
//! effects (screen navigation, completion persistence, change
//! notification).
//!
//! One controller exists per app. It is built at the application root and
//! handed to whatever drives it; every operation takes `&mut self`, so all
//! mutation happens wherever the single owner lives. Operations are
//! synchronous and never fail: calls that make no sense in the current
//! state are ignored.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::content::FlowFactory;
use super::model::{Flow, HighlightRect, Persona, Step};
use super::navigation::NavigationCoordinator;
use super::progress::ProgressRecorder;
use super::state::{ControllerState, Finish, Transition, TutorialPhase};

/// Padding added around a highlight rect when drawing the cutout.
const CUTOUT_PADDING: f64 = 16.0;

/// Read model published after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorialSnapshot {
    pub phase: TutorialPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    /// Identifies one pass through a flow; changes on every start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub step_index: usize,
    pub step_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    pub progress: f32,
}

impl TutorialSnapshot {
    fn idle() -> Self {
        Self {
            phase: TutorialPhase::Idle,
            persona: None,
            run_id: None,
            step_index: 0,
            step_count: 0,
            step: None,
            progress: 0.0,
        }
    }
}

/// The forward control on the tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryControl {
    Next,
    Complete,
}

impl PrimaryControl {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Next => "Next",
            Self::Complete => "Complete",
        }
    }
}

/// What the overlay renderer should draw for the current step.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView<'a> {
    pub step: &'a Step,
    /// 1-based position of the step.
    pub step_number: usize,
    pub step_count: usize,
    /// Cutout in the dimmed backdrop, already padded. `None` dims the
    /// whole screen.
    pub cutout: Option<HighlightRect>,
    pub show_previous: bool,
    pub primary: PrimaryControl,
    /// Whether a tap on the backdrop counts as "next".
    pub backdrop_advances: bool,
    /// The closing community card (always the last step), drawn
    /// full-screen instead of a tooltip.
    pub closing_card: bool,
    pub progress_percent: u8,
}

impl OverlayView<'_> {
    /// "Step 3 of 12".
    pub fn counter(&self) -> String {
        format!("Step {} of {}", self.step_number, self.step_count)
    }
}

/// The app-wide tutorial engine.
pub struct TutorialController {
    factory: FlowFactory,
    navigator: Arc<dyn NavigationCoordinator>,
    recorder: ProgressRecorder,
    state: ControllerState,
    run_id: Option<Uuid>,
    snapshots: watch::Sender<TutorialSnapshot>,
}

impl TutorialController {
    pub fn new(
        factory: FlowFactory,
        navigator: Arc<dyn NavigationCoordinator>,
        recorder: ProgressRecorder,
    ) -> Self {
        let (snapshots, _rx) = watch::channel(TutorialSnapshot::idle());
        Self {
            factory,
            navigator,
            recorder,
            state: ControllerState::default(),
            run_id: None,
            snapshots,
        }
    }

    /// Watch state changes. The receiver always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TutorialSnapshot> {
        self.snapshots.subscribe()
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Start the tutorial for `persona` at its first step, replacing any
    /// running tutorial. Completion flags are not consulted.
    pub fn start(&mut self, persona: Persona) -> Transition {
        let flow = self.factory.build_flow(persona);
        let title = flow.title().to_string();
        let steps = flow.len();
        let transition = self.state.begin(flow);
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);

        info!(%persona, %run_id, steps, title = %title, "Tutorial started");
        self.navigate_to_current();
        self.publish();
        transition
    }

    /// Replay from the settings/help screen. Same as [`start`](Self::start);
    /// a prior completion never blocks it.
    pub fn restart(&mut self, persona: Persona) -> Transition {
        debug!(%persona, "Manual tutorial restart");
        self.start(persona)
    }

    /// Advance one step, or complete the tutorial from its last step.
    pub fn next(&mut self) -> Transition {
        let transition = self.state.advance();
        match transition {
            Transition::Advanced { index } => {
                debug!(index, run_id = ?self.run_id, "Tutorial advanced");
                self.navigate_to_current();
                self.publish();
            }
            Transition::Finished { persona, finish } => self.on_finished(persona, finish),
            _ => debug!("next() ignored while idle"),
        }
        transition
    }

    /// Go back one step.
    ///
    /// The host screen is left as is; only the tooltip content changes, so
    /// the prior step may describe a screen that is no longer visible.
    pub fn previous(&mut self) -> Transition {
        let transition = self.state.retreat();
        match transition {
            Transition::Retreated { index } => {
                debug!(index, run_id = ?self.run_id, "Tutorial went back");
                self.publish();
            }
            _ => debug!(index = self.state.index(), "previous() ignored"),
        }
        transition
    }

    /// Leave the tutorial now. Persists the same flag as completion.
    pub fn skip(&mut self) -> Transition {
        self.finish(Finish::Skipped)
    }

    /// Finish the tutorial and persist completion.
    pub fn complete(&mut self) -> Transition {
        self.finish(Finish::Completed)
    }

    /// A tap on the dimmed backdrop: advances unless the step is interactive.
    pub fn backdrop_tap(&mut self) -> Transition {
        match self.state.current_step().map(|step| step.is_interactive) {
            Some(false) => self.next(),
            Some(true) => {
                debug!("Backdrop tap ignored on interactive step");
                Transition::Ignored
            }
            None => Transition::Ignored,
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn phase(&self) -> TutorialPhase {
        self.state.phase()
    }

    /// Persona of the most recent start.
    pub fn persona(&self) -> Option<Persona> {
        self.state.persona()
    }

    /// The flow of the most recent start. Stays attached after it ends.
    pub fn active_flow(&self) -> Option<&Flow> {
        self.state.flow()
    }

    pub fn current_step_index(&self) -> usize {
        self.state.index()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.state.current_step()
    }

    pub fn progress_fraction(&self) -> f32 {
        self.state.progress_fraction()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn snapshot(&self) -> TutorialSnapshot {
        let Some(flow) = self.state.flow().filter(|_| self.state.is_active()) else {
            return TutorialSnapshot {
                persona: self.state.persona(),
                ..TutorialSnapshot::idle()
            };
        };
        TutorialSnapshot {
            phase: self.state.phase(),
            persona: self.state.persona(),
            run_id: self.run_id,
            step_index: self.state.index(),
            step_count: flow.len(),
            step: self.state.current_step().cloned(),
            progress: self.state.progress_fraction(),
        }
    }

    /// What to draw right now; `None` while idle.
    pub fn overlay(&self) -> Option<OverlayView<'_>> {
        let step = self.state.current_step()?;
        let flow = self.state.flow()?;
        let index = self.state.index();
        Some(OverlayView {
            step,
            step_number: index + 1,
            step_count: flow.len(),
            cutout: step.highlight_rect.map(|r| r.inflate(CUTOUT_PADDING)),
            show_previous: index > 0,
            primary: if flow.is_last(index) {
                PrimaryControl::Complete
            } else {
                PrimaryControl::Next
            },
            backdrop_advances: !step.is_interactive,
            closing_card: flow.is_last(index),
            progress_percent: (self.state.progress_fraction() * 100.0).round() as u8,
        })
    }

    // ── Internals ───────────────────────────────────────────────────

    fn finish(&mut self, finish: Finish) -> Transition {
        let transition = self.state.finish(finish);
        match transition {
            Transition::Finished { persona, finish } => self.on_finished(persona, finish),
            _ => debug!(?finish, "finish ignored while idle"),
        }
        transition
    }

    fn on_finished(&mut self, persona: Persona, finish: Finish) {
        info!(%persona, ?finish, run_id = ?self.run_id, "Tutorial finished");
        self.recorder.mark_completed(persona);
        self.run_id = None;
        self.publish();
    }

    fn navigate_to_current(&self) {
        if let Some(target) = self
            .state
            .current_step()
            .and_then(|s| s.navigation_target.as_deref())
        {
            debug!(screen = target, "Tutorial requesting navigation");
            self.navigator.switch_to(target);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::MemoryStore;
    use crate::tutorial::content::{COMMUNITY_WELCOME_ID, RESTART_HINT_ID};
    use crate::tutorial::progress::ProgressReader;

    #[derive(Default)]
    struct RecordingNavigator {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NavigationCoordinator for RecordingNavigator {
        fn switch_to(&self, screen: &str) {
            self.calls.lock().unwrap().push(screen.to_string());
        }
    }

    fn controller() -> (TutorialController, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::default());
        let controller = TutorialController::new(
            FlowFactory::builtin().unwrap(),
            nav.clone(),
            ProgressRecorder::detached(),
        );
        (controller, nav)
    }

    /// Controller over a table where every persona has the given steps.
    fn controller_with_steps(steps: &str) -> (TutorialController, Arc<RecordingNavigator>) {
        let scripts: Vec<String> = Persona::ALL
            .iter()
            .map(|p| {
                format!(
                    r#"{{"persona":"{p}","title":"T","summary":"S",
                        "estimated_duration_secs":60,"steps":[{steps}]}}"#
                )
            })
            .collect();
        let json = format!(r#"{{"scripts":[{}]}}"#, scripts.join(","));
        let nav = Arc::new(RecordingNavigator::default());
        let controller = TutorialController::new(
            FlowFactory::from_json(&json).unwrap(),
            nav.clone(),
            ProgressRecorder::detached(),
        );
        (controller, nav)
    }

    fn step_count(controller: &TutorialController) -> usize {
        controller.active_flow().unwrap().len()
    }

    #[test]
    fn starts_idle() {
        let (controller, _) = controller();
        assert!(!controller.is_active());
        assert!(controller.persona().is_none());
        assert!(controller.overlay().is_none());
        assert_eq!(controller.snapshot(), TutorialSnapshot::idle());
    }

    #[test]
    fn start_is_active_at_first_step() {
        for persona in Persona::ALL {
            let (mut controller, _) = controller();
            assert_eq!(
                controller.start(persona),
                Transition::Started { persona }
            );
            assert!(controller.is_active());
            assert_eq!(controller.current_step_index(), 0);
            assert_eq!(controller.persona(), Some(persona));
            assert!(controller.run_id().is_some());
        }
    }

    #[test]
    fn next_count_reaches_idle() {
        for persona in Persona::ALL {
            let (mut controller, _) = controller();
            controller.start(persona);
            let n = step_count(&controller);
            for _ in 0..n - 1 {
                assert!(matches!(controller.next(), Transition::Advanced { .. }));
                assert!(controller.is_active());
            }
            assert!(matches!(
                controller.next(),
                Transition::Finished {
                    finish: Finish::Completed,
                    ..
                }
            ));
            assert!(!controller.is_active());
        }
    }

    #[test]
    fn mentor_next_switches_home_once() {
        let (mut controller, nav) = controller();
        controller.start(Persona::Mentor);
        assert!(nav.calls().is_empty());
        controller.next();
        assert_eq!(nav.calls(), vec!["home".to_string()]);
    }

    #[test]
    fn start_navigates_when_first_step_has_target() {
        let (mut controller, nav) = controller_with_steps(
            r#"{"title":"Circles","short_description":"d","message":"m",
                "target_region_id":"circles_tab","tooltip_placement":"center",
                "navigation_target":"groups"},
               {"title":"Next","short_description":"d","message":"m",
                "target_region_id":"other","tooltip_placement":"center"}"#,
        );

        controller.start(Persona::Student);
        assert_eq!(nav.calls(), ["groups"]);

        controller.next();
        assert_eq!(nav.calls(), ["groups"]);

        assert_eq!(controller.previous(), Transition::Retreated { index: 0 });
        assert_eq!(nav.calls(), ["groups"]);
    }

    #[test]
    fn closing_card_is_only_the_last_step() {
        let (mut controller, _) = controller_with_steps(&format!(
            r#"{{"title":"Lookalike","short_description":"d","message":"m",
                "target_region_id":"{COMMUNITY_WELCOME_ID}","tooltip_placement":"center"}}"#
        ));

        controller.start(Persona::Mentor);
        let view = controller.overlay().unwrap();
        assert_eq!(view.step.target_region_id, COMMUNITY_WELCOME_ID);
        assert!(!view.closing_card);

        controller.next();
        controller.next();
        let view = controller.overlay().unwrap();
        assert_eq!(view.step_number, view.step_count);
        assert!(view.closing_card);
    }

    #[test]
    fn previous_does_not_navigate() {
        let (mut controller, nav) = controller();
        controller.start(Persona::Entrepreneur);
        controller.next();
        controller.next();
        let before = nav.calls();
        let index = controller.current_step_index();

        controller.previous();
        assert_eq!(controller.current_step_index(), index - 1);
        assert_eq!(nav.calls(), before);
    }

    #[test]
    fn previous_inverts_next() {
        let (mut controller, _) = controller();
        controller.start(Persona::Student);
        controller.next();
        controller.next();
        let index = controller.current_step_index();
        let flow = controller.active_flow().cloned();

        controller.next();
        controller.previous();

        assert_eq!(controller.current_step_index(), index);
        assert!(controller.is_active());
        assert_eq!(controller.persona(), Some(Persona::Student));
        assert_eq!(controller.active_flow().cloned(), flow);
    }

    #[test]
    fn idle_next_and_previous_change_nothing() {
        let (mut controller, nav) = controller();
        controller.start(Persona::Investor);
        controller.skip();
        let snapshot = controller.snapshot();
        let index = controller.current_step_index();

        assert_eq!(controller.next(), Transition::Ignored);
        assert_eq!(controller.previous(), Transition::Ignored);
        assert_eq!(controller.skip(), Transition::Ignored);
        assert_eq!(controller.complete(), Transition::Ignored);

        assert_eq!(controller.snapshot(), snapshot);
        assert_eq!(controller.current_step_index(), index);
        assert_eq!(controller.persona(), Some(Persona::Investor));
        assert!(nav.calls().is_empty());
    }

    #[test]
    fn restart_after_complete() {
        let (mut controller, _) = controller();
        controller.start(Persona::CommunityBuilder);
        controller.next();
        controller.complete();
        assert!(!controller.is_active());

        controller.restart(Persona::CommunityBuilder);
        assert!(controller.is_active());
        assert_eq!(controller.current_step_index(), 0);
    }

    #[test]
    fn restart_mid_tour_gets_new_run() {
        let (mut controller, _) = controller();
        controller.start(Persona::Mentor);
        let first = controller.run_id();
        controller.next();
        controller.restart(Persona::Investor);
        assert_ne!(controller.run_id(), first);
        assert_eq!(controller.persona(), Some(Persona::Investor));
        assert_eq!(controller.current_step_index(), 0);
    }

    #[test]
    fn backdrop_tap_respects_interactivity() {
        let (mut controller, _) = controller();
        controller.start(Persona::Mentor);
        // Welcome step is not interactive.
        assert!(matches!(
            controller.backdrop_tap(),
            Transition::Advanced { index: 1 }
        ));
        controller.next();
        // Third mentor step (network) is interactive.
        assert!(controller.current_step().unwrap().is_interactive);
        assert_eq!(controller.backdrop_tap(), Transition::Ignored);
        assert_eq!(controller.current_step_index(), 2);
    }

    #[test]
    fn overlay_contract() {
        let (mut controller, _) = controller();
        controller.start(Persona::Investor);
        let n = step_count(&controller);

        let view = controller.overlay().unwrap();
        assert!(!view.show_previous);
        assert_eq!(view.primary, PrimaryControl::Next);
        assert_eq!(view.counter(), format!("Step 1 of {n}"));
        assert!(view.cutout.is_none());

        controller.next();
        let view = controller.overlay().unwrap();
        assert!(view.show_previous);
        let rect = view.step.highlight_rect.unwrap();
        assert_eq!(view.cutout.unwrap().width, rect.width + CUTOUT_PADDING);

        while controller.current_step_index() < n - 2 {
            controller.next();
        }
        let view = controller.overlay().unwrap();
        assert_eq!(view.step.target_region_id, RESTART_HINT_ID);
        assert!(!view.closing_card);

        controller.next();
        let view = controller.overlay().unwrap();
        assert_eq!(view.primary, PrimaryControl::Complete);
        assert_eq!(view.primary.label(), "Complete");
        assert!(view.closing_card);
        assert!(!view.backdrop_advances);
        assert_eq!(view.progress_percent, 100);
    }

    #[test]
    fn snapshots_follow_changes() {
        let (mut controller, _) = controller();
        let mut rx = controller.subscribe();
        assert_eq!(rx.borrow().phase, TutorialPhase::Idle);

        controller.start(Persona::Student);
        assert!(rx.has_changed().unwrap());
        {
            let snap = rx.borrow_and_update();
            assert_eq!(snap.phase, TutorialPhase::Running);
            assert_eq!(snap.step_index, 0);
            assert_eq!(snap.persona, Some(Persona::Student));
            assert!(snap.step.is_some());
        }

        controller.next();
        assert_eq!(rx.borrow_and_update().step_index, 1);

        controller.skip();
        let snap = rx.borrow_and_update();
        assert_eq!(snap.phase, TutorialPhase::Idle);
        assert!(snap.step.is_none());
        assert!(snap.run_id.is_none());
    }

    #[test]
    fn snapshot_serializes() {
        let (mut controller, _) = controller();
        controller.start(Persona::Mentor);
        let json = serde_json::to_value(controller.snapshot()).unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["persona"], "mentor");
        assert_eq!(json["step_index"], 0);
    }

    #[tokio::test]
    async fn skip_and_complete_persist_the_same_flag() {
        for finish_by_skip in [true, false] {
            let store = Arc::new(MemoryStore::new());
            let (recorder, _handle) = ProgressRecorder::spawn(store.clone(), "default");
            let reader = ProgressReader::new(store.clone(), "default");
            let mut controller = TutorialController::new(
                FlowFactory::builtin().unwrap(),
                Arc::new(RecordingNavigator::default()),
                recorder.clone(),
            );

            controller.start(Persona::Entrepreneur);
            controller.next();
            if finish_by_skip {
                controller.skip();
            } else {
                while controller.is_active() {
                    controller.next();
                }
            }
            assert!(!controller.is_active());

            recorder.flush().await;
            assert!(reader.has_completed(Persona::Entrepreneur).await.unwrap());
            assert!(!reader.has_completed(Persona::Student).await.unwrap());
        }
    }
}
