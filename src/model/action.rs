//! The per-recipient `Action` field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a recipient's `Action` field.
///
/// RFC 3464 defines five action values, compared case-insensitively. Any other
/// string is kept as-is; every predicate simply reports `false` for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientAction(String);

impl RecipientAction {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is(&self, literal: &str) -> bool {
        self.0.eq_ignore_ascii_case(literal)
    }

    /// The message could not be delivered and the Reporting MTA has given up.
    /// No further notifications should be expected.
    pub fn is_failed(&self) -> bool {
        self.is("failed")
    }

    /// Delivery has not succeeded yet but will be retried. More notifications
    /// may follow.
    pub fn is_delayed(&self) -> bool {
        self.is("delayed")
    }

    /// The message reached the recipient (or a list exploder). Terminal.
    pub fn is_delivered(&self) -> bool {
        self.is("delivered")
    }

    /// Relayed into an environment that does not produce DSNs on success.
    pub fn is_relayed(&self) -> bool {
        self.is("relayed")
    }

    /// Delivered to an alias and forwarded to several further recipients.
    /// Not terminal: `failed` or `delayed` notifications may still follow.
    pub fn is_expanded(&self) -> bool {
        self.is("expanded")
    }

    /// Whether no further notification is expected for this recipient.
    pub fn is_terminal(&self) -> bool {
        self.is_failed() || self.is_delivered()
    }

    /// Whether the value is one of the five standard actions.
    pub fn is_known(&self) -> bool {
        self.is_failed()
            || self.is_delayed()
            || self.is_delivered()
            || self.is_relayed()
            || self.is_expanded()
    }
}

impl fmt::Display for RecipientAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipientAction {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicates(a: &RecipientAction) -> [bool; 5] {
        [
            a.is_failed(),
            a.is_delayed(),
            a.is_delivered(),
            a.is_relayed(),
            a.is_expanded(),
        ]
    }

    #[test]
    fn test_case_insensitive() {
        assert!(RecipientAction::from("Failed").is_failed());
        assert!(RecipientAction::from("FAILED").is_failed());
        assert!(RecipientAction::from("dElAyEd").is_delayed());
    }

    #[test]
    fn test_empty_matches_nothing() {
        let a = RecipientAction::default();
        assert_eq!(predicates(&a), [false; 5]);
        assert!(!a.is_known());
    }

    #[test]
    fn test_predicates_mutually_exclusive() {
        for (i, name) in ["failed", "delayed", "delivered", "relayed", "expanded"]
            .iter()
            .enumerate()
        {
            let a = RecipientAction::from(*name);
            let got = predicates(&a);
            for (j, hit) in got.iter().enumerate() {
                assert_eq!(*hit, i == j, "{name} predicate {j}");
            }
            assert!(a.is_known());
        }
    }

    #[test]
    fn test_unknown_action_is_kept() {
        let a = RecipientAction::from("quarantined");
        assert_eq!(predicates(&a), [false; 5]);
        assert_eq!(a.as_str(), "quarantined");
        assert_eq!(a.to_string(), "quarantined");
    }

    #[test]
    fn test_terminal() {
        assert!(RecipientAction::from("failed").is_terminal());
        assert!(RecipientAction::from("Delivered").is_terminal());
        assert!(!RecipientAction::from("delayed").is_terminal());
        assert!(!RecipientAction::from("expanded").is_terminal());
    }
}
