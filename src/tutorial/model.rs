//! Tutorial data model: personas, steps, and flows.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The user type that selects which tutorial script is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    Entrepreneur,
    Student,
    StudentEntrepreneur,
    CommunityBuilder,
    Investor,
    Mentor,
    /// Fallback for legacy or unrecognized user types.
    Generic,
}

impl Persona {
    /// Every persona, in content-table order.
    pub const ALL: [Persona; 7] = [
        Persona::Entrepreneur,
        Persona::Student,
        Persona::StudentEntrepreneur,
        Persona::CommunityBuilder,
        Persona::Investor,
        Persona::Mentor,
        Persona::Generic,
    ];

    /// Position of this persona in [`Persona::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Entrepreneur => 0,
            Self::Student => 1,
            Self::StudentEntrepreneur => 2,
            Self::CommunityBuilder => 3,
            Self::Investor => 4,
            Self::Mentor => 5,
            Self::Generic => 6,
        }
    }

    /// Stable tag used in serialization and settings keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entrepreneur => "entrepreneur",
            Self::Student => "student",
            Self::StudentEntrepreneur => "student-entrepreneur",
            Self::CommunityBuilder => "community-builder",
            Self::Investor => "investor",
            Self::Mentor => "mentor",
            Self::Generic => "generic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Entrepreneur => "Entrepreneur",
            Self::Student => "Student",
            Self::StudentEntrepreneur => "Student Entrepreneur",
            Self::CommunityBuilder => "Community Builder",
            Self::Investor => "Investor",
            Self::Mentor => "Mentor",
            Self::Generic => "Member",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a persona tag is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown persona: {0}")]
pub struct UnknownPersona(pub String);

impl FromStr for Persona {
    type Err = UnknownPersona;

    /// Accepts the kebab-case tag and the older camelCase tags that
    /// earlier app versions stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "entrepreneur" => Ok(Self::Entrepreneur),
            "student" => Ok(Self::Student),
            "student-entrepreneur" | "studentEntrepreneur" => Ok(Self::StudentEntrepreneur),
            "community-builder" | "communityBuilder" => Ok(Self::CommunityBuilder),
            "investor" => Ok(Self::Investor),
            "mentor" => Ok(Self::Mentor),
            "generic" | "other" => Ok(Self::Generic),
            other => Err(UnknownPersona(other.to_string())),
        }
    }
}

/// Where the tooltip sits relative to the highlighted region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipPlacement {
    Top,
    Bottom,
    Leading,
    Trailing,
    Center,
}

/// Absolute-coordinate rectangle framed by the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl HighlightRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the rect by `pad` in each dimension, keeping the same center.
    pub fn inflate(&self, pad: f64) -> Self {
        Self {
            x: self.x - pad / 2.0,
            y: self.y - pad / 2.0,
            width: self.width + pad,
            height: self.height + pad,
        }
    }
}

/// One beat of a tutorial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub title: String,
    pub short_description: String,
    pub message: String,
    /// Correlation key for the UI region the host tags. The state machine
    /// never looks at it.
    pub target_region_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_rect: Option<HighlightRect>,
    pub tooltip_placement: TooltipPlacement,
    /// Logical screen shown while this step is current. `None` keeps the
    /// current screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_target: Option<String>,
    /// Interactive steps ignore backdrop taps; only explicit controls advance.
    #[serde(default)]
    pub is_interactive: bool,
    /// Reserved for auto-advance. No shipped script sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint: Option<Duration>,
}

/// An ordered, persona-specific tutorial script.
///
/// Steps are fixed at construction; a `Flow` only hands out shared
/// references to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    persona: Persona,
    title: String,
    summary: String,
    steps: Vec<Step>,
    estimated_duration: Duration,
    is_required: bool,
}

impl Flow {
    pub(crate) fn new(
        persona: Persona,
        title: impl Into<String>,
        summary: impl Into<String>,
        steps: Vec<Step>,
        estimated_duration: Duration,
        is_required: bool,
    ) -> Self {
        Self {
            persona,
            title: title.into(),
            summary: summary.into(),
            steps,
            estimated_duration,
            is_required,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the terminal step.
    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn is_last(&self, index: usize) -> bool {
        index == self.last_index()
    }

    pub fn estimated_duration(&self) -> Duration {
        self.estimated_duration
    }

    /// Advisory: whether the host should prevent bypass on first login.
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// Consume the flow and return it with `trailer` appended.
    pub(crate) fn appended(mut self, trailer: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(trailer);
        self
    }
}

/// Settings keys used for tutorial persistence.
pub mod settings_keys {
    use super::Persona;

    /// Set once the onboarding wizard finishes.
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
    /// One-shot trigger read at launch to decide on an automatic start.
    pub const JUST_COMPLETED_ONBOARDING: &str = "just_completed_onboarding";
    /// Persona detected from onboarding answers.
    pub const DETECTED_PERSONA: &str = "user_type_detected";
    /// Default user ID (single-user app).
    pub const DEFAULT_USER: &str = "default";

    const TUTORIAL_COMPLETED_PREFIX: &str = "tutorial_completed.";

    /// Per-persona "tutorial seen" flag.
    pub fn tutorial_completed(persona: Persona) -> String {
        format!("{TUTORIAL_COMPLETED_PREFIX}{persona}")
    }
}
