//! Tutorial state machine: tracks which flow is active and at which step.
//!
//! Pure index bookkeeping. Side effects (navigation, persistence, change
//! notification) belong to the controller.

use serde::{Deserialize, Serialize};

use super::model::{Flow, Persona, Step};

/// Whether a tutorial is on screen.
///
/// Idle → Running on start; Running → Idle on skip or complete. There is no
/// paused phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorialPhase {
    #[default]
    Idle,
    Running,
}

impl TutorialPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: TutorialPhase) -> bool {
        use TutorialPhase::*;
        // Running → Running is a restart.
        matches!(
            (self, target),
            (Idle, Running) | (Running, Running) | (Running, Idle)
        )
    }
}

impl std::fmt::Display for TutorialPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
        };
        write!(f, "{s}")
    }
}

/// How a running tutorial ended. Both outcomes persist the same flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    Completed,
    Skipped,
}

/// Outcome of a state-machine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A flow for `persona` began at its first step.
    Started { persona: Persona },
    /// Moved forward to `index`.
    Advanced { index: usize },
    /// Moved back to `index`.
    Retreated { index: usize },
    /// The tutorial for `persona` ended.
    Finished { persona: Persona, finish: Finish },
    /// The call was not valid in the current state and changed nothing.
    Ignored,
}

/// The mutable tutorial state.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    persona: Option<Persona>,
    flow: Option<Flow>,
    index: usize,
    phase: TutorialPhase,
}

impl ControllerState {
    /// Persona of the most recent start; `None` until the first one.
    pub fn persona(&self) -> Option<Persona> {
        self.persona
    }

    pub fn flow(&self) -> Option<&Flow> {
        self.flow.as_ref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> TutorialPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == TutorialPhase::Running
    }

    pub fn current_step(&self) -> Option<&Step> {
        if !self.is_active() {
            return None;
        }
        self.flow.as_ref()?.step(self.index)
    }

    /// `(index + 1) / steps`, or 0.0 when idle.
    pub fn progress_fraction(&self) -> f32 {
        match (&self.flow, self.is_active()) {
            (Some(flow), true) if !flow.is_empty() => (self.index + 1) as f32 / flow.len() as f32,
            _ => 0.0,
        }
    }

    /// Begin `flow` at its first step, replacing whatever was running.
    pub fn begin(&mut self, flow: Flow) -> Transition {
        if !self.phase.can_transition_to(TutorialPhase::Running) {
            return Transition::Ignored;
        }
        let persona = flow.persona();
        self.persona = Some(persona);
        self.flow = Some(flow);
        self.index = 0;
        self.phase = TutorialPhase::Running;
        Transition::Started { persona }
    }

    /// Step forward; on the terminal step this completes the tutorial.
    pub fn advance(&mut self) -> Transition {
        let Some(flow) = self.active_flow() else {
            return Transition::Ignored;
        };
        if flow.is_last(self.index) {
            return self.finish(Finish::Completed);
        }
        self.index += 1;
        Transition::Advanced { index: self.index }
    }

    /// Step back. Ignored on the first step or while idle.
    pub fn retreat(&mut self) -> Transition {
        if !self.is_active() || self.index == 0 {
            return Transition::Ignored;
        }
        self.index -= 1;
        Transition::Retreated { index: self.index }
    }

    /// End the running tutorial.
    ///
    /// The flow stays attached for inspection; the index resets so a replay
    /// starts at the beginning.
    pub fn finish(&mut self, finish: Finish) -> Transition {
        if !self.phase.can_transition_to(TutorialPhase::Idle) {
            return Transition::Ignored;
        }
        let Some(persona) = self.persona else {
            return Transition::Ignored;
        };
        self.phase = TutorialPhase::Idle;
        self.index = 0;
        Transition::Finished { persona, finish }
    }

    fn active_flow(&self) -> Option<&Flow> {
        if self.is_active() { self.flow.as_ref() } else { None }
    }
}
