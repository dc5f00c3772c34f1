//! Security / policy engine
//!
//! Gatekeeper for every transfer attempt, independent of which transport the
//! router will choose. Enforces, in order: emergency stop, per-protocol pause,
//! the transfer blocklist, the lazily rolled global daily window, per-protocol
//! transaction and daily ceilings, per-subject rate limits, and the
//! suspicious-activity circuit breaker.
//!
//! A failing validation commits nothing: checks run against current state and
//! mutations are applied only once every check has passed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::capability::{Capabilities, Capability};
use crate::config::InitConfig;
use crate::error::PolicyError;
use crate::events::{Event, EventLog};
use crate::protocol::Protocol;
use crate::rate_limit::{DecayingRateLimiter, LimiterState, MintBurnLimiter};
use crate::types::{Account, TransferId};

/// Global volume window length in seconds (24 hours).
pub const GLOBAL_WINDOW: u64 = 86_400;

/// Suspicious-activity flags a subject may accumulate before the circuit
/// breaker denies it outright.
pub const MAX_SUSPICIOUS_FLAGS: u32 = 5;

// ============================================================================
// State
// ============================================================================

/// Per-protocol security configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSecurityConfig {
    pub paused: bool,
    /// Ceiling on the protocol's decaying 24h volume limiter
    pub daily_limit: u128,
    /// Maximum amount per single transfer
    pub transaction_limit: u128,
    /// Cooldown between large transfers, seconds
    pub cooldown_period: u64,
}

/// Global accounting singleton owned by the engine.
///
/// The daily volume window rolls lazily: the first validation at or past the
/// 24h boundary zeroes the accumulator before applying its own amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlobalAccounting {
    global_daily_limit: u128,
    global_daily_volume: u128,
    last_reset: u64,
    emergency_paused: bool,
    blocked: HashSet<TransferId>,
    suspicious: HashMap<Account, u32>,
}

/// Anomaly detection thresholds (administrator-updatable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    pub volume_threshold: u128,
}

/// The policy engine.
pub struct PolicyEngine {
    capabilities: Capabilities,
    configs: HashMap<Protocol, ProtocolSecurityConfig>,
    /// Per-protocol decaying volume limiter, ceiling = `daily_limit`
    protocol_limiters: HashMap<Protocol, LimiterState>,
    /// Per-subject decaying limiter (tracked subjects only)
    subject_limiter: DecayingRateLimiter,
    /// Mint/burn ceilings for rate-limited-mint bridge endpoints
    mint_burn: MintBurnLimiter,
    /// Cumulative volume per (subject, protocol), feeds anomaly detection
    subject_volume: HashMap<(Account, Protocol), u128>,
    accounting: GlobalAccounting,
    anomaly: AnomalyThresholds,
    events: EventLog,
}

impl PolicyEngine {
    /// Construct from validated configuration. `root` receives every
    /// capability and bootstraps further grants.
    pub fn new(root: Account, config: InitConfig, now: u64) -> Result<Self, PolicyError> {
        config.validate()?;

        let mut configs = HashMap::new();
        let mut protocol_limiters = HashMap::new();
        for protocol in Protocol::ALL {
            let limits = config.limits_for(protocol);
            configs.insert(
                protocol,
                ProtocolSecurityConfig {
                    paused: false,
                    daily_limit: limits.daily_limit,
                    transaction_limit: limits.transaction_limit,
                    cooldown_period: limits.cooldown_period,
                },
            );
            protocol_limiters.insert(protocol, LimiterState::new(limits.daily_limit));
        }

        Ok(PolicyEngine {
            capabilities: Capabilities::with_root(root),
            configs,
            protocol_limiters,
            subject_limiter: DecayingRateLimiter::new(),
            mint_burn: MintBurnLimiter::new(),
            subject_volume: HashMap::new(),
            accounting: GlobalAccounting {
                global_daily_limit: config.global_daily_limit,
                global_daily_volume: 0,
                last_reset: now,
                emergency_paused: false,
                blocked: HashSet::new(),
                suspicious: HashMap::new(),
            },
            anomaly: AnomalyThresholds {
                volume_threshold: config.anomaly.volume_threshold,
            },
            events: EventLog::new(),
        })
    }

    fn config(&self, protocol: Protocol) -> &ProtocolSecurityConfig {
        // Every Protocol::ALL member is inserted at construction
        &self.configs[&protocol]
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate a transfer attempt. Either every check passes and all
    /// bookkeeping (global volume, protocol and subject limiters, cumulative
    /// subject volume, suspicion counters) is committed atomically, or the
    /// call fails and nothing changes.
    pub fn validate_transfer(
        &mut self,
        subject: &Account,
        protocol: Protocol,
        amount: u128,
        transfer_id: TransferId,
        now: u64,
    ) -> Result<(), PolicyError> {
        // 1. Emergency stop short-circuits everything; no per-protocol
        //    configuration can bypass it.
        if self.accounting.emergency_paused {
            return Err(PolicyError::EmergencyPaused);
        }

        // 2. Per-protocol pause
        let config = *self.config(protocol);
        if config.paused {
            return Err(PolicyError::ProtocolPaused { protocol });
        }

        // 3. Explicit blocklist
        if self.accounting.blocked.contains(&transfer_id) {
            return Err(PolicyError::TransferBlocked { transfer_id });
        }

        // 4. Lazy global window roll, right-exclusive boundary: a call at
        //    exactly last_reset + 24h starts the new window.
        let rolled = now >= self.accounting.last_reset + GLOBAL_WINDOW;
        let window_volume = if rolled {
            0
        } else {
            self.accounting.global_daily_volume
        };

        // 5. Global daily limit (overflow counts as exceeded)
        match window_volume.checked_add(amount) {
            Some(new_volume) if new_volume <= self.accounting.global_daily_limit => {}
            _ => {
                return Err(PolicyError::GlobalDailyLimitExceeded {
                    limit: self.accounting.global_daily_limit,
                    volume: window_volume,
                    requested: amount,
                });
            }
        }

        // 6. Per-protocol transaction limit
        if amount > config.transaction_limit {
            return Err(PolicyError::TransactionLimitExceeded {
                protocol,
                limit: config.transaction_limit,
                requested: amount,
            });
        }

        // 7. Rate limiters, consumed on scratch copies so a later denial
        //    leaves the live state untouched.
        let mut protocol_limiter = self.protocol_limiters[&protocol];
        protocol_limiter.consume(amount, now)?;

        let mut subject_state = self.subject_limiter.state(subject).copied();
        if let Some(state) = subject_state.as_mut() {
            state.consume(amount, now)?;
        }

        // 8/9. Anomaly detection over the would-be cumulative volume. The
        //    circuit breaker fails the whole call, so the persisted counter
        //    tops out at the threshold and only an administrative reset
        //    restores the subject.
        let key = (subject.clone(), protocol);
        let cumulative = self
            .subject_volume
            .get(&key)
            .copied()
            .unwrap_or(0)
            .saturating_add(amount);
        let anomalous = cumulative > self.anomaly.volume_threshold;
        if anomalous {
            let flags = self.accounting.suspicious.get(subject).copied().unwrap_or(0) + 1;
            if flags > MAX_SUSPICIOUS_FLAGS {
                return Err(PolicyError::SubjectFlagged {
                    subject: subject.clone(),
                    flags,
                });
            }
        }

        // Commit
        if rolled {
            self.accounting.last_reset = now;
        }
        self.accounting.global_daily_volume = window_volume + amount;
        self.protocol_limiters.insert(protocol, protocol_limiter);
        if let Some(state) = subject_state {
            self.subject_limiter.set_state(subject.clone(), state);
        }
        self.subject_volume.insert(key, cumulative);
        if anomalous {
            let flags = self.accounting.suspicious.entry(subject.clone()).or_insert(0);
            *flags += 1;
            self.events.record(Event::AnomalyDetected {
                subject: subject.clone(),
                protocol,
                volume: cumulative,
            });
            tracing::warn!(
                subject = %subject,
                protocol = %protocol,
                volume = cumulative,
                flags = *flags,
                "anomalous transfer volume"
            );
        }

        Ok(())
    }

    // ========================================================================
    // Pause Controls
    // ========================================================================

    /// Pause or unpause a single protocol. Idempotent.
    pub fn set_protocol_paused(
        &mut self,
        caller: &Account,
        protocol: Protocol,
        paused: bool,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        if let Some(config) = self.configs.get_mut(&protocol) {
            config.paused = paused;
        }
        self.events.record(Event::ProtocolPauseSet { protocol, paused });
        Ok(())
    }

    /// Set the global emergency stop. Held by a capability distinct from
    /// `SecurityAdmin` so it is independently revocable. Idempotent.
    pub fn set_emergency_paused(
        &mut self,
        caller: &Account,
        paused: bool,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::Emergency)?;
        self.accounting.emergency_paused = paused;
        self.events.record(Event::EmergencyPauseSet { paused });
        Ok(())
    }

    // ========================================================================
    // Limit Configuration
    // ========================================================================

    /// Update a protocol's limits. The post-update config is validated on a
    /// scratch copy before anything is written, so a rejected update leaves
    /// config and limiter untouched. Changing `daily_limit` resets the
    /// protocol's volume limiter to the fresh ceiling, anchored at `now`;
    /// the administrative top-up path, same as the subject limiter.
    pub fn update_protocol_config(
        &mut self,
        caller: &Account,
        protocol: Protocol,
        daily_limit: Option<u128>,
        transaction_limit: Option<u128>,
        cooldown_period: Option<u64>,
        now: u64,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;

        let mut config = *self.config(protocol);
        if let Some(limit) = daily_limit {
            config.daily_limit = limit;
        }
        if let Some(limit) = transaction_limit {
            config.transaction_limit = limit;
        }
        if let Some(cooldown) = cooldown_period {
            config.cooldown_period = cooldown;
        }

        if config.daily_limit == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "daily_limit must be nonzero".to_string(),
            });
        }
        if config.transaction_limit == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "transaction_limit must be nonzero".to_string(),
            });
        }
        if config.transaction_limit > config.daily_limit {
            return Err(PolicyError::InvalidConfig {
                reason: format!("transaction_limit exceeds daily_limit for {protocol}"),
            });
        }

        // Commit
        if daily_limit.is_some() {
            let mut state = LimiterState::new(config.daily_limit);
            state.last_update = Some(now);
            self.protocol_limiters.insert(protocol, state);
        }
        self.configs.insert(protocol, config);
        self.events.record(Event::ProtocolConfigUpdated { protocol });
        Ok(())
    }

    /// Update the global daily volume ceiling.
    pub fn update_global_limit(
        &mut self,
        caller: &Account,
        limit: u128,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        if limit == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "global_daily_limit must be nonzero".to_string(),
            });
        }
        self.accounting.global_daily_limit = limit;
        self.events.record(Event::GlobalLimitUpdated { limit });
        Ok(())
    }

    /// Update the anomaly volume threshold.
    pub fn update_anomaly_threshold(
        &mut self,
        caller: &Account,
        volume_threshold: u128,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        if volume_threshold == 0 {
            return Err(PolicyError::InvalidConfig {
                reason: "volume_threshold must be nonzero".to_string(),
            });
        }
        self.anomaly.volume_threshold = volume_threshold;
        self.events
            .record(Event::AnomalyThresholdUpdated { volume_threshold });
        Ok(())
    }

    /// Set a subject's decaying rate limit, registering it for tracking.
    /// Re-setting refills the subject to the new ceiling.
    pub fn set_subject_limit(
        &mut self,
        caller: &Account,
        subject: Account,
        max_limit: u128,
        now: u64,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        self.subject_limiter.set_limit(subject.clone(), max_limit, now);
        self.events.record(Event::SubjectLimitSet { subject, max_limit });
        Ok(())
    }

    /// Set mint/burn ceilings for a rate-limited-mint bridge endpoint.
    pub fn set_mint_burn_limits(
        &mut self,
        caller: &Account,
        bridge: Account,
        max_mint: u128,
        max_burn: u128,
        now: u64,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        self.mint_burn
            .set_limits(bridge.clone(), max_mint, max_burn, now);
        self.events.record(Event::MintBurnLimitsSet {
            bridge,
            max_mint,
            max_burn,
        });
        Ok(())
    }

    // ========================================================================
    // Blocklist & Suspicion Overrides
    // ========================================================================

    /// Block a transfer by ID, halting its destination-side effect. The
    /// dispatch itself has already occurred; this stops completion. Idempotent.
    pub fn block_transfer(
        &mut self,
        caller: &Account,
        transfer_id: TransferId,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        self.accounting.blocked.insert(transfer_id);
        self.events.record(Event::TransferBlocked { transfer_id });
        Ok(())
    }

    /// Clear a subject's suspicious-activity counter (false-positive
    /// override); restores normal validation for the subject.
    pub fn reset_suspicion(
        &mut self,
        caller: &Account,
        subject: &Account,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, Capability::SecurityAdmin)?;
        self.accounting.suspicious.remove(subject);
        self.events.record(Event::SuspicionReset {
            subject: subject.clone(),
        });
        Ok(())
    }

    // ========================================================================
    // Capability Management
    // ========================================================================

    /// Grant a capability. The caller must itself hold the capability it
    /// grants.
    pub fn grant_capability(
        &mut self,
        caller: &Account,
        account: Account,
        cap: Capability,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, cap)?;
        self.capabilities.grant(account, cap);
        Ok(())
    }

    /// Revoke a capability. Same possession rule as `grant_capability`.
    pub fn revoke_capability(
        &mut self,
        caller: &Account,
        account: &Account,
        cap: Capability,
    ) -> Result<(), PolicyError> {
        self.capabilities.require(caller, cap)?;
        self.capabilities.revoke(account, cap);
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn emergency_paused(&self) -> bool {
        self.accounting.emergency_paused
    }

    pub fn protocol_config(&self, protocol: Protocol) -> ProtocolSecurityConfig {
        *self.config(protocol)
    }

    /// All per-protocol configs in ordinal order.
    pub fn protocol_configs(&self) -> Vec<(Protocol, ProtocolSecurityConfig)> {
        Protocol::ALL
            .iter()
            .map(|p| (*p, *self.config(*p)))
            .collect()
    }

    pub fn global_daily_limit(&self) -> u128 {
        self.accounting.global_daily_limit
    }

    /// Volume consumed in the window that would apply at `now` (zero if the
    /// window has lapsed but not yet been rolled by a validation).
    pub fn global_daily_volume(&self, now: u64) -> u128 {
        if now >= self.accounting.last_reset + GLOBAL_WINDOW {
            0
        } else {
            self.accounting.global_daily_volume
        }
    }

    pub fn is_blocked(&self, transfer_id: &TransferId) -> bool {
        self.accounting.blocked.contains(transfer_id)
    }

    pub fn anomaly_thresholds(&self) -> AnomalyThresholds {
        self.anomaly
    }

    /// Suspicious-activity flags for `subject`.
    pub fn suspicion_flags(&self, subject: &Account) -> u32 {
        self.accounting.suspicious.get(subject).copied().unwrap_or(0)
    }

    /// All flagged subjects and their counts (administrative report).
    pub fn suspicion_report(&self) -> Vec<(Account, u32)> {
        let mut report: Vec<_> = self
            .accounting
            .suspicious
            .iter()
            .map(|(a, c)| (a.clone(), *c))
            .collect();
        report.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        report
    }

    /// Cumulative volume recorded for `(subject, protocol)`.
    pub fn subject_volume(&self, subject: &Account, protocol: Protocol) -> u128 {
        self.subject_volume
            .get(&(subject.clone(), protocol))
            .copied()
            .unwrap_or(0)
    }

    pub fn subject_limiter(&self) -> &DecayingRateLimiter {
        &self.subject_limiter
    }

    pub fn mint_burn(&self) -> &MintBurnLimiter {
        &self.mint_burn
    }

    /// Mutable access for mint/burn consumption by the token integration.
    pub fn mint_burn_mut(&mut self) -> &mut MintBurnLimiter {
        &mut self.mint_burn
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}
