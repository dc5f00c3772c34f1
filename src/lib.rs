//! Bridge-Router: Cross-Chain Transfer Routing and Policy Core
//!
//! This crate provides the routing and security core of a multi-transport
//! cross-chain bridge:
//!
//! - **Transfer Router** - Transport module registry, route discovery and
//!   selection, dispatch with a reentrancy guard, transfer records
//! - **Policy Engine** - Per-protocol pause/limit configuration, global daily
//!   volume accounting, transfer blocklist, anomaly circuit breaker,
//!   emergency stop
//! - **Decaying Rate Limiter** - Per-subject capacity that regenerates
//!   linearly over a 24-hour window, plus the mint/burn-pair specialization
//!   for token ceilings
//!
//! The crate is deliberately transport-agnostic: concrete transports plug in
//! behind the [`BridgeModule`] trait, and every state-transitioning operation
//! takes the current unix time from the caller rather than reading a clock.

pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod hash;
pub mod protocol;
pub mod rate_limit;
pub mod router;
pub mod security;
pub mod types;

// Re-export commonly used items at the crate root
pub use capability::{Capabilities, Capability, Unauthorized};
pub use config::{AnomalyConfig, InitConfig, ProtocolLimits};
pub use error::{PolicyError, RateLimitError, RouterError};
pub use events::{Event, EventLog};
pub use hash::{account_bytes32, compute_transfer_id, keccak256};
pub use protocol::{
    BridgeModule, BridgeOption, DispatchRequest, FeeEstimate, ModuleError, Protocol,
    RoutePreference,
};
pub use rate_limit::{
    DecayingRateLimiter, LimiterState, MintBurnLimiter, MintBurnState, WINDOW,
};
pub use router::{RouterStats, TransferRecord, TransferRouter};
pub use security::{PolicyEngine, ProtocolSecurityConfig, GLOBAL_WINDOW, MAX_SUSPICIOUS_FLAGS};
pub use types::{Account, ChainId, TransferId, TransferStatus};
