//! Gesture-change debouncing, kept free of side effects.
//!
//! The recognition loop sees the same label on every frame while a gesture
//! is held; only a *change* should reach the controller.

use std::str::FromStr;

use hand_gesture::GestureLabel;
use serde::{Deserialize, Serialize};

/// What to do with the controller after a label change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start(GestureLabel),
    Stop,
}

/// How an unrecognized hand pose affects a running effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Stop the running effect.
    #[default]
    Stop,
    /// Keep it running; returning to the same gesture is not a change.
    Hold,
}

impl FromStr for UnknownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(UnknownPolicy::Stop),
            "hold" => Ok(UnknownPolicy::Hold),
            other  => Err(format!("unknown policy {:?} (expected stop or hold)", other)),
        }
    }
}

/// Decide what a new label means given the previous one.
pub fn transition(
    previous: Option<GestureLabel>,
    new:      GestureLabel,
    policy:   UnknownPolicy,
) -> Option<Action> {
    if previous == Some(new) {
        return None;
    }
    if new.is_unknown() {
        return match policy {
            UnknownPolicy::Stop => Some(Action::Stop),
            UnknownPolicy::Hold => None,
        };
    }
    Some(Action::Start(new))
}

/// [`transition`] plus the memory of the last label that counted.
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    previous: Option<GestureLabel>,
    policy:   UnknownPolicy,
}

impl Debouncer {
    pub fn new(policy: UnknownPolicy) -> Self {
        Debouncer { previous: None, policy }
    }

    pub fn previous(&self) -> Option<GestureLabel> {
        self.previous
    }

    pub fn observe(&mut self, label: GestureLabel) -> Option<Action> {
        let action = transition(self.previous, label, self.policy);
        let held = label.is_unknown() && self.policy == UnknownPolicy::Hold;
        if !held {
            self.previous = Some(label);
        }
        action
    }

    /// Drop the remembered label so the next observation counts as a change.
    pub fn forget(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GestureLabel::*;

    #[test]
    fn repeated_label_is_suppressed() {
        assert_eq!(transition(Some(Point), Point, UnknownPolicy::Stop), None);
        assert_eq!(transition(Some(Point), Peace, UnknownPolicy::Stop), Some(Action::Start(Peace)));
        assert_eq!(transition(None, Point, UnknownPolicy::Hold), Some(Action::Start(Point)));
    }

    #[test]
    fn unknown_follows_policy() {
        assert_eq!(transition(Some(Point), Unknown, UnknownPolicy::Stop), Some(Action::Stop));
        assert_eq!(transition(Some(Point), Unknown, UnknownPolicy::Hold), None);
        assert_eq!(transition(Some(Unknown), Unknown, UnknownPolicy::Stop), None);
    }

    #[test]
    fn hold_keeps_previous_label_across_unknown() {
        let mut d = Debouncer::new(UnknownPolicy::Hold);
        assert_eq!(d.observe(Point), Some(Action::Start(Point)));
        assert_eq!(d.observe(Unknown), None);
        assert_eq!(d.observe(Point), None);
        assert_eq!(d.previous(), Some(Point));
    }

    #[test]
    fn stop_policy_restarts_after_unknown() {
        let mut d = Debouncer::new(UnknownPolicy::Stop);
        assert_eq!(d.observe(Point), Some(Action::Start(Point)));
        assert_eq!(d.observe(Unknown), Some(Action::Stop));
        assert_eq!(d.observe(Unknown), None);
        assert_eq!(d.observe(Point), Some(Action::Start(Point)));
    }

    #[test]
    fn forget_makes_same_label_count_again() {
        let mut d = Debouncer::new(UnknownPolicy::Stop);
        assert_eq!(d.observe(Peace), Some(Action::Start(Peace)));
        d.forget();
        assert_eq!(d.previous(), None);
        assert_eq!(d.observe(Peace), Some(Action::Start(Peace)));
        assert_eq!(d.observe(Peace), None);
    }

    #[test]
    fn policy_parses() {
        assert_eq!("HOLD".parse::<UnknownPolicy>(), Ok(UnknownPolicy::Hold));
        assert!("pause".parse::<UnknownPolicy>().is_err());
    }
}
