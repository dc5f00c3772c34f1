//! Decaying rate limiter
//!
//! Gives each tracked subject a capacity ceiling that regenerates linearly
//! over a 24-hour window, anchored to the subject's own last use rather than
//! a shared reset instant. An idle subject is always fully replenished after
//! one window; there is no boundary at which every subject resets at once.
//!
//! Used twice: generically by the policy engine for per-subject throughput,
//! and in the mint/burn-pair form for rate-limited-mint token ceilings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RateLimitError;
use crate::types::Account;

/// Regeneration window in seconds (24 hours).
pub const WINDOW: u64 = 86_400;

/// `max_limit * elapsed / WINDOW` without overflow.
///
/// Requires `elapsed < WINDOW`. Decomposing by quotient and remainder keeps
/// every intermediate product within `u128`: `(m / w) * e <= m`, and
/// `(m % w) * e < w * w < 2^34`. The result is exactly the floored ratio.
fn regenerated(max_limit: u128, elapsed: u64) -> u128 {
    let w = WINDOW as u128;
    let e = elapsed as u128;
    (max_limit / w) * e + (max_limit % w) * e / w
}

// ============================================================================
// Per-Subject Limiter State
// ============================================================================

/// Replenishing capacity state for one tracked subject.
///
/// `last_update = None` means the subject has never consumed since its limit
/// was set, so full capacity is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterState {
    /// Capacity remaining as of `last_update`
    pub current_limit: u128,
    /// Configured ceiling; `current_limit` never exceeds this
    pub max_limit: u128,
    /// Timestamp of the last consumption
    pub last_update: Option<u64>,
}

impl LimiterState {
    /// Fresh state at the configured ceiling.
    pub fn new(max_limit: u128) -> Self {
        LimiterState {
            current_limit: max_limit,
            max_limit,
            last_update: None,
        }
    }

    /// Capacity available at `now`, after linear regeneration.
    pub fn available(&self, now: u64) -> u128 {
        let Some(last) = self.last_update else {
            return self.max_limit;
        };
        let elapsed = now.saturating_sub(last);
        if elapsed >= WINDOW {
            return self.max_limit;
        }
        self.current_limit
            .saturating_add(regenerated(self.max_limit, elapsed))
            .min(self.max_limit)
    }

    /// Consume `amount` at `now`, anchoring the window to this use.
    pub fn consume(&mut self, amount: u128, now: u64) -> Result<(), RateLimitError> {
        let available = self.available(now);
        if amount > available {
            return Err(RateLimitError::LimitExceeded {
                available,
                requested: amount,
            });
        }
        self.current_limit = available - amount;
        self.last_update = Some(now);
        Ok(())
    }
}

// ============================================================================
// Generic Limiter (policy engine subjects)
// ============================================================================

/// Decaying limiter over a set of tracked subjects.
///
/// Subjects without a configured limit are not throttled. `set_limit` both
/// registers a subject and refills it to the new ceiling with its window
/// re-anchored at `now`; that refill is the administrative "top up" mechanism
/// for a throttled subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecayingRateLimiter {
    subjects: HashMap<Account, LimiterState>,
}

impl DecayingRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or reset) a subject's ceiling, granting full fresh capacity.
    pub fn set_limit(&mut self, subject: Account, max_limit: u128, now: u64) {
        let mut state = LimiterState::new(max_limit);
        state.last_update = Some(now);
        self.subjects.insert(subject, state);
    }

    /// Remove a subject from tracking (back to unthrottled).
    pub fn clear_limit(&mut self, subject: &Account) {
        self.subjects.remove(subject);
    }

    /// Capacity available to `subject` at `now`; `None` if untracked.
    pub fn available(&self, subject: &Account, now: u64) -> Option<u128> {
        self.subjects.get(subject).map(|s| s.available(now))
    }

    /// Current state for `subject`, if tracked.
    pub fn state(&self, subject: &Account) -> Option<&LimiterState> {
        self.subjects.get(subject)
    }

    /// Replace a tracked subject's state wholesale. Used by callers that
    /// validate against a scratch copy and commit only on full success.
    pub fn set_state(&mut self, subject: Account, state: LimiterState) {
        self.subjects.insert(subject, state);
    }

    /// Consume capacity for `subject`. Untracked subjects pass untouched.
    pub fn consume(
        &mut self,
        subject: &Account,
        amount: u128,
        now: u64,
    ) -> Result<(), RateLimitError> {
        match self.subjects.get_mut(subject) {
            Some(state) => state.consume(amount, now),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Mint/Burn Limiter (rate-limited-mint token ceilings)
// ============================================================================

/// Paired mint and burn ceilings for one bridge endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBurnState {
    pub mint: LimiterState,
    pub burn: LimiterState,
}

/// Decaying limiter specialized for token mint/burn ceilings.
///
/// Unlike the generic limiter, an unregistered bridge has no capacity at all:
/// minting rights exist only where an administrator has set limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MintBurnLimiter {
    bridges: HashMap<Account, MintBurnState>,
}

impl MintBurnLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both ceilings for a bridge, registering it if unknown. Both
    /// limiters are refilled and re-anchored at `now`.
    pub fn set_limits(&mut self, bridge: Account, max_mint: u128, max_burn: u128, now: u64) {
        let mut mint = LimiterState::new(max_mint);
        mint.last_update = Some(now);
        let mut burn = LimiterState::new(max_burn);
        burn.last_update = Some(now);
        self.bridges.insert(bridge, MintBurnState { mint, burn });
    }

    pub fn minting_available(&self, bridge: &Account, now: u64) -> u128 {
        self.bridges
            .get(bridge)
            .map(|s| s.mint.available(now))
            .unwrap_or(0)
    }

    pub fn burning_available(&self, bridge: &Account, now: u64) -> u128 {
        self.bridges
            .get(bridge)
            .map(|s| s.burn.available(now))
            .unwrap_or(0)
    }

    pub fn consume_mint(
        &mut self,
        bridge: &Account,
        amount: u128,
        now: u64,
    ) -> Result<(), RateLimitError> {
        match self.bridges.get_mut(bridge) {
            Some(state) => state.mint.consume(amount, now),
            None => Err(RateLimitError::LimitExceeded {
                available: 0,
                requested: amount,
            }),
        }
    }

    pub fn consume_burn(
        &mut self,
        bridge: &Account,
        amount: u128,
        now: u64,
    ) -> Result<(), RateLimitError> {
        match self.bridges.get_mut(bridge) {
            Some(state) => state.burn.consume(amount, now),
            None => Err(RateLimitError::LimitExceeded {
                available: 0,
                requested: amount,
            }),
        }
    }

    /// Current state for `bridge`, if registered.
    pub fn state(&self, bridge: &Account) -> Option<&MintBurnState> {
        self.bridges.get(bridge)
    }
}
