//! Guided tutorial: persona flows, the step state machine, and the
//! controller that drives them.

pub mod content;
pub mod controller;
pub mod model;
pub mod navigation;
pub mod persona;
pub mod progress;
pub mod state;

pub use content::FlowFactory;
pub use controller::{OverlayView, PrimaryControl, TutorialController, TutorialSnapshot};
pub use model::{Flow, HighlightRect, Persona, Step, TooltipPlacement};
pub use navigation::{NavigationCoordinator, NoopNavigator, TabNavigator};
pub use persona::{OnboardingAnswers, detect_persona};
pub use progress::{LaunchGate, ProgressReader, ProgressRecorder};
pub use state::{Finish, Transition, TutorialPhase};
