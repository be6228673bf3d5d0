//! Business-rule configuration loaded from environment variables.
//!
//! Defaults apply when a variable is unset; invalid values are logged and
//! ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use exportdesk_shared::{ParseEnumError, RfqStatus};

/// How RFQ creation treats a quantity below the product's MOQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoqPolicy {
    /// Reject with a validation error.
    #[default]
    Enforce,
    /// Accept and log a warning; the quantity is negotiated in the thread.
    Advisory,
}

impl FromStr for MoqPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(MoqPolicy::Enforce),
            "advisory" => Ok(MoqPolicy::Advisory),
            _ => Err(ParseEnumError::new("moq policy", s)),
        }
    }
}

impl fmt::Display for MoqPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoqPolicy::Enforce => "enforce",
            MoqPolicy::Advisory => "advisory",
        })
    }
}

/// Which status changes an admin may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// Any status may follow any other, including reopening a closed RFQ.
    #[default]
    Free,
    /// `Closed` is final.
    TerminalClosed,
}

impl TransitionPolicy {
    pub fn allows(&self, from: RfqStatus, to: RfqStatus) -> bool {
        match self {
            TransitionPolicy::Free => true,
            TransitionPolicy::TerminalClosed => from != RfqStatus::Closed || to == RfqStatus::Closed,
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(TransitionPolicy::Free),
            "terminal-closed" => Ok(TransitionPolicy::TerminalClosed),
            _ => Err(ParseEnumError::new("transition policy", s)),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransitionPolicy::Free => "free",
            TransitionPolicy::TerminalClosed => "terminal-closed",
        })
    }
}

/// Core configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Env: `EXPORTDESK_MOQ_POLICY` (`enforce` | `advisory`)
    /// Default: `enforce`
    pub moq_policy: MoqPolicy,

    /// Env: `EXPORTDESK_TRANSITION_POLICY` (`free` | `terminal-closed`)
    /// Default: `free`
    pub transition_policy: TransitionPolicy,
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoreConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("EXPORTDESK_MOQ_POLICY") {
            match raw.parse() {
                Ok(policy) => config.moq_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid EXPORTDESK_MOQ_POLICY, using default"),
            }
        }

        if let Some(raw) = lookup("EXPORTDESK_TRANSITION_POLICY") {
            match raw.parse() {
                Ok(policy) => config.transition_policy = policy,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid EXPORTDESK_TRANSITION_POLICY, using default")
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.moq_policy, MoqPolicy::Enforce);
        assert_eq!(config.transition_policy, TransitionPolicy::Free);
    }

    #[test]
    fn test_env_overrides() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("EXPORTDESK_MOQ_POLICY", "Advisory"),
            ("EXPORTDESK_TRANSITION_POLICY", "terminal-closed"),
        ]));
        assert_eq!(config.moq_policy, MoqPolicy::Advisory);
        assert_eq!(config.transition_policy, TransitionPolicy::TerminalClosed);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("EXPORTDESK_MOQ_POLICY", "sometimes"),
            ("EXPORTDESK_TRANSITION_POLICY", ""),
        ]));
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_terminal_closed_transitions() {
        let policy = TransitionPolicy::TerminalClosed;
        assert!(policy.allows(RfqStatus::Pending, RfqStatus::InDiscussion));
        assert!(policy.allows(RfqStatus::InDiscussion, RfqStatus::Closed));
        assert!(policy.allows(RfqStatus::Closed, RfqStatus::Closed));
        assert!(!policy.allows(RfqStatus::Closed, RfqStatus::Pending));
        assert!(!policy.allows(RfqStatus::Closed, RfqStatus::InDiscussion));

        for from in RfqStatus::ALL {
            for to in RfqStatus::ALL {
                assert!(TransitionPolicy::Free.allows(from, to));
            }
        }
    }
}
