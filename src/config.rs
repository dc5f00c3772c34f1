//! Initial configuration
//!
//! Typed configuration consumed when constructing the policy engine. Loadable
//! from JSON for deployments; defaults cover local testing. Validation happens
//! at construction so bad thresholds are rejected before any traffic flows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PolicyError;
use crate::protocol::Protocol;

/// Per-protocol security limits applied at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLimits {
    /// Maximum volume the protocol may carry per 24h window
    pub daily_limit: u128,
    /// Maximum amount per single transfer
    pub transaction_limit: u128,
    /// Cooldown between large transfers, seconds
    pub cooldown_period: u64,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        ProtocolLimits {
            daily_limit: 100_000_000_000,
            transaction_limit: 10_000_000_000,
            cooldown_period: 3_600,
        }
    }
}

/// Anomaly detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Cumulative per-subject, per-protocol volume above which activity is
    /// flagged as suspicious
    pub volume_threshold: u128,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        AnomalyConfig {
            volume_threshold: 50_000_000_000,
        }
    }
}

/// Complete initial configuration for the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    /// Global daily volume ceiling across all protocols
    pub global_daily_limit: u128,
    pub anomaly: AnomalyConfig,
    /// Per-protocol overrides; protocols absent here get `ProtocolLimits::default()`
    #[serde(default)]
    pub protocols: HashMap<Protocol, ProtocolLimits>,
}

impl Default for InitConfig {
    fn default() -> Self {
        InitConfig {
            global_daily_limit: 1_000_000_000_000,
            anomaly: AnomalyConfig::default(),
            protocols: HashMap::new(),
        }
    }
}

impl InitConfig {
    /// Load from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let config: InitConfig =
            serde_json::from_str(json).map_err(|e| PolicyError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero or inconsistent thresholds.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.global_daily_limit == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "global_daily_limit must be nonzero".to_string(),
            });
        }
        if self.anomaly.volume_threshold == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "anomaly volume_threshold must be nonzero".to_string(),
            });
        }
        for (protocol, limits) in &self.protocols {
            if limits.daily_limit == 0 || limits.transaction_limit == 0 {
                return Err(PolicyError::InvalidConfig {
                    reason: format!("limits for {protocol} must be nonzero"),
                });
            }
            if limits.transaction_limit > limits.daily_limit {
                return Err(PolicyError::InvalidConfig {
                    reason: format!("transaction_limit exceeds daily_limit for {protocol}"),
                });
            }
        }
        Ok(())
    }

    /// Limits for `protocol`, falling back to defaults.
    pub fn limits_for(&self, protocol: Protocol) -> ProtocolLimits {
        self.protocols
            .get(&protocol)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        InitConfig::default().validate().unwrap();
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "global_daily_limit": 10000,
            "anomaly": { "volume_threshold": 5000 },
            "protocols": {
                "RelayNetwork": {
                    "daily_limit": 4000,
                    "transaction_limit": 1000,
                    "cooldown_period": 600
                }
            }
        }"#;
        let config = InitConfig::from_json(json).unwrap();
        assert_eq!(config.global_daily_limit, 10_000);
        assert_eq!(config.limits_for(Protocol::RelayNetwork).daily_limit, 4_000);
        // Unlisted protocol falls back to defaults
        assert_eq!(
            config.limits_for(Protocol::DirectMessage),
            ProtocolLimits::default()
        );
    }

    #[test]
    fn test_zero_global_limit_rejected() {
        let config = InitConfig {
            global_daily_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PolicyError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_transaction_limit_above_daily_rejected() {
        let mut config = InitConfig::default();
        config.protocols.insert(
            Protocol::DirectMessage,
            ProtocolLimits {
                daily_limit: 100,
                transaction_limit: 1_000,
                cooldown_period: 0,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            InitConfig::from_json("{"),
            Err(PolicyError::InvalidConfig { .. })
        ));
    }
}
