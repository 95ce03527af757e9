//! Filters over emitted events, for hosts that attach automations to a
//! subset of messages.

use std::{fmt, str::FromStr};

use serde_json::Value;
use thiserror::Error;

use crate::MessageEvent;

/// Severity bucket shared by provider priorities and embedded `level` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Critical,
    High,
    Normal,
    Low,
}

impl Level {
    const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Normal, Self::Low];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Provider priority value for this level.
    #[must_use]
    pub const fn priority(self) -> i64 {
        match self {
            Self::Critical => 2,
            Self::High => 1,
            Self::Normal => 0,
            Self::Low => -1,
        }
    }
}

/// Event filter a host can subscribe with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    AllMessages,
    /// Provider `priority` field.
    Priority(Level),
    /// Embedded `level=` field.
    CustomLevel(Level),
    /// Embedded `type=alert`.
    CustomTypeAlert,
}

impl TriggerKind {
    /// Every trigger, in a stable order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut kinds = vec![Self::AllMessages];
        kinds.extend(Level::ALL.map(Self::Priority));
        kinds.extend(Level::ALL.map(Self::CustomLevel));
        kinds.push(Self::CustomTypeAlert);
        kinds
    }

    #[must_use]
    pub fn matches(&self, event: &MessageEvent) -> bool {
        match self {
            Self::AllMessages => true,
            Self::Priority(level) => event
                .get("priority")
                .and_then(as_integer)
                .is_some_and(|p| p == level.priority()),
            Self::CustomLevel(level) => event
                .get("level")
                .and_then(Value::as_str)
                .is_some_and(|l| l == level.as_str()),
            Self::CustomTypeAlert => event
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t == "alert"),
        }
    }
}

// Priorities arrive as numbers from the provider but as strings when embedded.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllMessages => f.write_str("all_messages"),
            Self::Priority(level) => write!(f, "priority_{}", level.as_str()),
            Self::CustomLevel(level) => write!(f, "custom_level_{}", level.as_str()),
            Self::CustomTypeAlert => f.write_str("custom_type_alert"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown trigger type: {0}")]
pub struct UnknownTrigger(String);

impl FromStr for TriggerKind {
    type Err = UnknownTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| UnknownTrigger(s.to_string()))
    }
}
