//! Flow factory: persona scripts as a data table.
//!
//! Scripts are authored in `content/flows.json` and embedded at compile
//! time. Choosing a script is a table lookup keyed by persona, so the
//! controller never branches on who the user is.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::model::{Flow, HighlightRect, Persona, Step, TooltipPlacement};
use crate::error::ContentError;

/// The shipped persona scripts.
const BUILTIN_FLOWS: &str = include_str!("content/flows.json");

/// Region id of the first trailer step.
pub const RESTART_HINT_ID: &str = "restart-hint";
/// Region id of the closing trailer step.
pub const COMMUNITY_WELCOME_ID: &str = "community-welcome";

#[derive(Debug, Deserialize)]
struct ContentTable {
    scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Deserialize)]
struct ScriptEntry {
    persona: Persona,
    title: String,
    summary: String,
    estimated_duration_secs: u64,
    #[serde(default = "default_required")]
    is_required: bool,
    steps: Vec<Step>,
}

fn default_required() -> bool {
    true
}

/// Builds persona flows from a validated content table.
#[derive(Debug, Clone)]
pub struct FlowFactory {
    /// One script per persona, in [`Persona::ALL`] order.
    scripts: Vec<Flow>,
}

impl FlowFactory {
    /// Load the scripts that ship with the crate.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::from_json(BUILTIN_FLOWS)
    }

    /// Parse and validate a content table.
    ///
    /// Every persona must have exactly one non-empty script.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let table: ContentTable = serde_json::from_str(json)?;
        let mut by_persona = HashMap::with_capacity(table.scripts.len());

        for entry in table.scripts {
            let persona = entry.persona;
            if entry.steps.is_empty() {
                return Err(ContentError::EmptyScript { persona });
            }
            if let Some(index) = entry.steps.iter().position(|s| {
                s.navigation_target
                    .as_deref()
                    .is_some_and(|t| t.trim().is_empty())
            }) {
                return Err(ContentError::BlankNavigationTarget { persona, index });
            }

            let flow = Flow::new(
                persona,
                entry.title,
                entry.summary,
                entry.steps,
                Duration::from_secs(entry.estimated_duration_secs),
                entry.is_required,
            );
            if by_persona.insert(persona, flow).is_some() {
                return Err(ContentError::DuplicatePersona { persona });
            }
        }

        let scripts = Persona::ALL
            .into_iter()
            .map(|persona| {
                by_persona
                    .remove(&persona)
                    .ok_or(ContentError::MissingPersona { persona })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(scripts = scripts.len(), "Tutorial content loaded");
        Ok(Self { scripts })
    }

    /// Build the complete flow for `persona`: its script followed by the
    /// restart hint and the community welcome.
    pub fn build_flow(&self, persona: Persona) -> Flow {
        with_trailers(self.scripts[persona.index()].clone())
    }
}

/// Append the two universal closing steps.
fn with_trailers(flow: Flow) -> Flow {
    flow.appended([restart_hint_step(), community_welcome_step()])
}

fn restart_hint_step() -> Step {
    Step {
        title: "Need a Refresher?".to_string(),
        short_description: "You can always rewatch tutorials anytime".to_string(),
        message: "Forgot how to use a feature? No worries! You can always rewatch any tutorial \
                  by going to Settings and tapping 'Start Tutorial'. All tutorials are available \
                  anytime you need them, perfect for brushing up on features or helping friends \
                  get started!"
            .to_string(),
        target_region_id: RESTART_HINT_ID.to_string(),
        highlight_rect: Some(HighlightRect::new(50.0, 200.0, 300.0, 150.0)),
        tooltip_placement: TooltipPlacement::Bottom,
        navigation_target: None,
        is_interactive: false,
        duration_hint: None,
    }
}

fn community_welcome_step() -> Step {
    Step {
        title: "Welcome to the Circl Community!".to_string(),
        short_description: "Thank you for joining our collaborative ecosystem".to_string(),
        message: "Thank you for being part of our growing community!\n\n\
                  Circl is built on collaboration, connecting employees, students, entrepreneurs, \
                  investors, and mentors in one powerful ecosystem. The network effect is real \
                  here, and every connection you make strengthens the entire community.\n\n\
                  Ready to start collaborating? Join a Circl that matches your interests and \
                  goals. Then invite your friends, colleagues, and classmates to grow this \
                  ecosystem together!"
            .to_string(),
        target_region_id: COMMUNITY_WELCOME_ID.to_string(),
        highlight_rect: None,
        tooltip_placement: TooltipPlacement::Center,
        navigation_target: None,
        is_interactive: true,
        duration_hint: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> FlowFactory {
        FlowFactory::builtin().expect("builtin content must load")
    }

    #[test]
    fn every_persona_ends_with_trailers() {
        let factory = factory();
        for persona in Persona::ALL {
            let flow = factory.build_flow(persona);
            assert!(flow.len() >= 3, "{persona} flow too short");
            let steps = flow.steps();
            assert_eq!(steps[steps.len() - 2].target_region_id, RESTART_HINT_ID);
            assert_eq!(steps[steps.len() - 1].target_region_id, COMMUNITY_WELCOME_ID);
            assert_eq!(flow.persona(), persona);
        }
    }

    #[test]
    fn trailers_are_appended_exactly_once() {
        let factory = factory();
        for persona in Persona::ALL {
            let flow = factory.build_flow(persona);
            let trailers = flow
                .steps()
                .iter()
                .filter(|s| {
                    s.target_region_id == RESTART_HINT_ID
                        || s.target_region_id == COMMUNITY_WELCOME_ID
                })
                .count();
            assert_eq!(trailers, 2, "{persona}");
        }
    }

    #[test]
    fn build_is_deterministic() {
        let factory = factory();
        for persona in Persona::ALL {
            assert_eq!(factory.build_flow(persona), factory.build_flow(persona));
        }
    }

    #[test]
    fn mentor_welcome_stays_then_feed_navigates_home() {
        let flow = factory().build_flow(Persona::Mentor);
        assert_eq!(flow.steps()[0].navigation_target, None);
        assert_eq!(flow.steps()[1].navigation_target.as_deref(), Some("home"));
    }

    #[test]
    fn student_tour_switches_only_where_the_step_lives() {
        let flow = factory().build_flow(Persona::Student);
        let target_of = |title: &str| {
            flow.steps()
                .iter()
                .find(|s| s.title == title)
                .unwrap_or_else(|| panic!("missing step {title}"))
                .navigation_target
                .clone()
        };
        assert_eq!(target_of("Connect and Message Professionally").as_deref(), Some("messages"));
        assert_eq!(target_of("Student Networking Strategy"), None);
        assert_eq!(target_of("Build Your Future").as_deref(), Some("home"));
    }

    #[test]
    fn first_step_never_navigates() {
        let factory = factory();
        for persona in Persona::ALL {
            let flow = factory.build_flow(persona);
            assert!(flow.steps()[0].navigation_target.is_none(), "{persona}");
        }
    }

    #[test]
    fn shipped_targets_use_known_screen_names() {
        let known = [
            "home",
            "network",
            "groups",
            "business-profile",
            "profile",
            "resources",
            "messages",
        ];
        let factory = factory();
        for persona in Persona::ALL {
            for step in factory.build_flow(persona).steps() {
                if let Some(target) = &step.navigation_target {
                    assert!(known.contains(&target.as_str()), "{persona}: {target}");
                }
            }
        }
    }

    #[test]
    fn no_shipped_step_sets_duration_hint() {
        let factory = factory();
        for persona in Persona::ALL {
            assert!(
                factory
                    .build_flow(persona)
                    .steps()
                    .iter()
                    .all(|s| s.duration_hint.is_none())
            );
        }
    }

    #[test]
    fn closing_step_is_interactive() {
        let flow = factory().build_flow(Persona::Investor);
        assert!(flow.steps().last().unwrap().is_interactive);
        assert!(!flow.steps()[flow.len() - 2].is_interactive);
    }

    const MINIMAL_STEP: &str = r#"{"title":"t","short_description":"d","message":"m",
        "target_region_id":"r","tooltip_placement":"center"}"#;

    fn table_for(personas: &[&str], step: &str) -> String {
        let scripts: Vec<String> = personas
            .iter()
            .map(|p| {
                format!(
                    r#"{{"persona":"{p}","title":"T","summary":"S",
                        "estimated_duration_secs":60,"steps":[{step}]}}"#
                )
            })
            .collect();
        format!(r#"{{"scripts":[{}]}}"#, scripts.join(","))
    }

    fn all_tags() -> Vec<&'static str> {
        Persona::ALL.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn custom_table_loads() {
        let factory = FlowFactory::from_json(&table_for(&all_tags(), MINIMAL_STEP)).unwrap();
        let flow = factory.build_flow(Persona::Generic);
        assert_eq!(flow.len(), 3);
        assert!(flow.is_required());
        assert_eq!(flow.estimated_duration(), Duration::from_secs(60));
    }

    #[test]
    fn table_order_does_not_matter() {
        let scripts: Vec<String> = Persona::ALL
            .iter()
            .rev()
            .map(|p| {
                format!(
                    r#"{{"persona":"{p}","title":"{p} tour","summary":"S",
                        "estimated_duration_secs":60,"steps":[{MINIMAL_STEP}]}}"#
                )
            })
            .collect();
        let json = format!(r#"{{"scripts":[{}]}}"#, scripts.join(","));
        let factory = FlowFactory::from_json(&json).unwrap();
        for persona in Persona::ALL {
            let flow = factory.build_flow(persona);
            assert_eq!(flow.persona(), persona);
            assert_eq!(flow.title(), format!("{persona} tour"));
        }
    }

    #[test]
    fn missing_persona_is_rejected() {
        let tags: Vec<&str> = all_tags().into_iter().filter(|t| *t != "mentor").collect();
        let err = FlowFactory::from_json(&table_for(&tags, MINIMAL_STEP)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::MissingPersona {
                persona: Persona::Mentor
            }
        ));
    }

    #[test]
    fn duplicate_persona_is_rejected() {
        let mut tags = all_tags();
        tags.push("investor");
        let err = FlowFactory::from_json(&table_for(&tags, MINIMAL_STEP)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::DuplicatePersona {
                persona: Persona::Investor
            }
        ));
    }

    #[test]
    fn empty_script_is_rejected() {
        let json = r#"{"scripts":[{"persona":"student","title":"T","summary":"S",
            "estimated_duration_secs":60,"steps":[]}]}"#;
        let err = FlowFactory::from_json(json).unwrap_err();
        assert!(matches!(err, ContentError::EmptyScript { .. }));
    }

    #[test]
    fn blank_navigation_target_is_rejected() {
        let step = r#"{"title":"t","short_description":"d","message":"m",
            "target_region_id":"r","tooltip_placement":"center","navigation_target":" "}"#;
        let err = FlowFactory::from_json(&table_for(&all_tags(), step)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::BlankNavigationTarget { index: 0, .. }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FlowFactory::from_json("{not json").unwrap_err();
        assert!(matches!(err, ContentError::Parse(_)));
    }
}
