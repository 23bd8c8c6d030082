//! Flow variants and their data-driven configuration.
//!
//! The step sequence after age and the back-navigation table are product
//! decisions, not structural necessities, so they live in data rather than in
//! the transition match.

use std::collections::HashMap;

use super::state::StateTag;

/// Which flavor of the collection flow is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowVariant {
    /// Mode, name, age, confirmation. No back navigation.
    Minimal,
    /// Adds the optional phone and location steps plus back navigation.
    Extended,
}

impl FlowVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minimal" => Some(Self::Minimal),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }
}

/// Runtime configuration of the active flow.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub variant: FlowVariant,
    /// Successor of a completed age step.
    after_age: StateTag,
    /// Back-navigation table: nav target tag → the state it returns to.
    /// Empty in the minimal flow, which has no back navigation at all.
    back_table: HashMap<StateTag, StateTag>,
}

impl FlowConfig {
    pub fn minimal() -> Self {
        Self {
            variant: FlowVariant::Minimal,
            after_age: StateTag::Confirmation,
            back_table: HashMap::new(),
        }
    }

    pub fn extended() -> Self {
        use StateTag::*;
        let back_table = HashMap::from([
            (ModeSelect, ModeSelect),
            (CollectName, ModeSelect),
            (CollectAge, CollectName),
            (CollectPhone, CollectAge),
            (CollectLocation, CollectPhone),
            (Confirmation, CollectLocation),
        ]);
        Self {
            variant: FlowVariant::Extended,
            after_age: CollectPhone,
            back_table,
        }
    }

    pub fn for_variant(variant: FlowVariant) -> Self {
        match variant {
            FlowVariant::Minimal => Self::minimal(),
            FlowVariant::Extended => Self::extended(),
        }
    }

    /// The state that follows a successfully validated age.
    pub fn after_age(&self) -> StateTag {
        self.after_age
    }

    /// Where a back request targeting `target` lands, if this flow supports
    /// back navigation from that step.
    pub fn back_target(&self, target: StateTag) -> Option<StateTag> {
        self.back_table.get(&target).copied()
    }

    /// The nav affordance to attach to `state`'s prompt: the state's own tag
    /// when the flow maps it, so pressing it resolves through `back_target`.
    pub fn nav_affordance(&self, state: StateTag) -> Option<StateTag> {
        self.back_table.contains_key(&state).then_some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parse() {
        assert_eq!(FlowVariant::parse("minimal"), Some(FlowVariant::Minimal));
        assert_eq!(FlowVariant::parse("Extended"), Some(FlowVariant::Extended));
        assert_eq!(FlowVariant::parse("full"), None);
    }

    #[test]
    fn minimal_flow_skips_optional_steps() {
        let flow = FlowConfig::minimal();
        assert_eq!(flow.after_age(), StateTag::Confirmation);
    }

    #[test]
    fn minimal_flow_has_no_back_navigation() {
        let flow = FlowConfig::minimal();
        for state in [
            StateTag::ModeSelect,
            StateTag::CollectName,
            StateTag::CollectAge,
            StateTag::Confirmation,
        ] {
            assert_eq!(flow.back_target(state), None);
            assert_eq!(flow.nav_affordance(state), None);
        }
    }

    #[test]
    fn extended_back_table_maps_each_step_to_its_predecessor() {
        use StateTag::*;
        let flow = FlowConfig::extended();
        assert_eq!(flow.back_target(ModeSelect), Some(ModeSelect));
        assert_eq!(flow.back_target(CollectName), Some(ModeSelect));
        assert_eq!(flow.back_target(CollectAge), Some(CollectName));
        assert_eq!(flow.back_target(CollectPhone), Some(CollectAge));
        assert_eq!(flow.back_target(CollectLocation), Some(CollectPhone));
        assert_eq!(flow.back_target(Confirmation), Some(CollectLocation));
    }

    #[test]
    fn extended_age_leads_to_phone() {
        assert_eq!(FlowConfig::extended().after_age(), StateTag::CollectPhone);
    }
}
