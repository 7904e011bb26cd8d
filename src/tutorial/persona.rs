//! Persona detection from onboarding answers.
//!
//! The onboarding wizard collects free-text interest selections; this maps
//! them onto a tutorial persona with a fixed keyword cascade. Earlier rules
//! win, so the order of `RULES` matters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::Persona;

/// Answers collected by the onboarding wizard that drive persona detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    /// Comma-separated "main usage interests" selections.
    pub usage_interests: String,
    /// Comma-separated industry selections.
    pub industry_interests: String,
}

impl OnboardingAnswers {
    pub fn new(usage_interests: impl Into<String>, industry_interests: impl Into<String>) -> Self {
        Self {
            usage_interests: usage_interests.into(),
            industry_interests: industry_interests.into(),
        }
    }
}

/// Interests that mark a student as building a business.
const BUSINESS_INTERESTS: &[&str] = &["entrepreneur", "start your business", "scale your business"];

/// Exact onboarding selections, checked after the student rules.
const RULES: &[(&str, Persona)] = &[
    ("start your business", Persona::Entrepreneur),
    ("scale your business", Persona::Entrepreneur),
    ("network with entrepreneurs", Persona::Entrepreneur),
    ("find co-founder", Persona::Entrepreneur),
    ("find mentors", Persona::Entrepreneur),
    ("find investors", Persona::Entrepreneur),
    ("make investments", Persona::Investor),
    ("share knowledge", Persona::Mentor),
    ("sell a skill", Persona::Entrepreneur),
    ("be part of the community", Persona::CommunityBuilder),
];

/// Broad keyword fallbacks for free-form answers.
const FALLBACKS: &[(&[&str], Persona)] = &[
    (&["entrepreneur"], Persona::Entrepreneur),
    (&["invest", "funding"], Persona::Investor),
    (&["mentor", "teaching"], Persona::Mentor),
    (&["community", "networking"], Persona::CommunityBuilder),
];

/// Pick the tutorial persona for a set of onboarding answers.
///
/// Never fails; answers that match nothing get `CommunityBuilder`.
pub fn detect_persona(answers: &OnboardingAnswers) -> Persona {
    let interests = answers.usage_interests.to_lowercase();
    let industry = answers.industry_interests.to_lowercase();

    if interests.contains("student") {
        let persona = if BUSINESS_INTERESTS.iter().any(|k| interests.contains(k)) {
            Persona::StudentEntrepreneur
        } else {
            Persona::Student
        };
        debug!(%persona, "Persona detected from student interest");
        return persona;
    }

    if let Some((keyword, persona)) = RULES.iter().find(|(k, _)| interests.contains(k)) {
        debug!(%persona, keyword, "Persona detected from onboarding selection");
        return *persona;
    }

    if industry.contains("startups & entrepreneurship") {
        debug!("Persona detected from industry interest");
        return Persona::Entrepreneur;
    }

    if let Some((_, persona)) = FALLBACKS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| interests.contains(k)))
    {
        debug!(%persona, "Persona detected from broad keyword match");
        return *persona;
    }

    debug!("No persona keywords matched, defaulting to community builder");
    Persona::CommunityBuilder
}
