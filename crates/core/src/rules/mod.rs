//! Rule registry & analysis engine.

pub mod builtin;
pub mod template;

use std::collections::HashMap;

use crate::domain::{Category, Severity};

/// A static rule: a set of event-type keys, a category, a severity, and
/// title/description/remediation templates.
#[derive(Debug, Clone)]
pub struct Rule {
    pub event_types: &'static [&'static str],
    pub category: Category,
    pub severity: Severity,
    pub title_template: &'static str,
    pub description_template: &'static str,
    pub remediation_template: Option<&'static str>,
}

impl Rule {
    /// Invariant: severe/medium rules must carry a remediation
    /// template; low severity rules must not.
    fn remediation_policy_holds(&self) -> bool {
        match self.severity {
            Severity::Severe | Severity::Medium => self.remediation_template.is_some(),
            Severity::Low => self.remediation_template.is_none(),
        }
    }

    /// Invariant: titles begin with `[Category]`, descriptions end
    /// with the raw event-type key in parentheses.
    fn naming_convention_holds(&self) -> bool {
        self.title_template.starts_with('[') && self.title_template.contains(']')
    }
}

/// Maps event-type key to the ordered list of rules that apply to it.
/// Lookup is O(1).
pub struct RuleRegistry {
    by_event_type: HashMap<&'static str, Vec<&'static Rule>>,
}

impl RuleRegistry {
    /// Build the registry from the built-in rule table.
    pub fn with_builtin_rules() -> Self {
        Self::from_rules(builtin::RULES)
    }

    pub fn from_rules(rules: &'static [Rule]) -> Self {
        let mut by_event_type: HashMap<&'static str, Vec<&'static Rule>> = HashMap::new();
        for rule in rules {
            debug_assert!(
                rule.remediation_policy_holds(),
                "rule for {:?} violates remediation policy",
                rule.event_types
            );
            debug_assert!(
                rule.naming_convention_holds(),
                "rule for {:?} violates title naming convention",
                rule.event_types
            );
            for &event_type in rule.event_types {
                by_event_type.entry(event_type).or_default().push(rule);
            }
        }
        Self { by_event_type }
    }

    /// Ordered list of rules applicable to `event_type`, or `None` if no
    /// rule matches (not an error — the caller increments a counter).
    pub fn lookup(&self, event_type: &str) -> Option<&[&'static Rule]> {
        self.by_event_type.get(event_type).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_rule_satisfies_remediation_policy() {
        for rule in builtin::RULES {
            assert!(
                rule.remediation_policy_holds(),
                "rule {:?} violates remediation policy (severity {:?})",
                rule.event_types,
                rule.severity
            );
        }
    }

    #[test]
    fn every_builtin_rule_satisfies_naming_convention() {
        for rule in builtin::RULES {
            assert!(rule.naming_convention_holds(), "rule {:?} has malformed title", rule.event_types);
        }
    }

    #[test]
    fn lookup_is_none_for_unknown_event_type() {
        let registry = RuleRegistry::with_builtin_rules();
        assert!(registry.lookup("EVT_Totally_Unknown").is_none());
    }

    #[test]
    fn lookup_finds_known_event_type() {
        let registry = RuleRegistry::with_builtin_rules();
        assert!(registry.lookup("EVT_AP_Lost_Contact").is_some());
    }
}
