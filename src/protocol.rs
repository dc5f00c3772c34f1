//! Transport protocols and the module seam
//!
//! The router is generic over four interchangeable bridge transport families.
//! Each is represented by a `Protocol` variant with a stable ordinal (ordinals
//! may be persisted, so new kinds are appended, never renumbered) and is backed
//! at runtime by a `BridgeModule` implementation that performs the actual
//! cross-chain messaging.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChainId, TransferId, TransferStatus};

// ============================================================================
// Protocol Enumeration
// ============================================================================

/// Closed enumeration of supported transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Direct endpoint-to-endpoint messaging (LayerZero-style)
    DirectMessage,
    /// External relay/validator network (Celer-style)
    RelayNetwork,
    /// Modular messaging with pluggable security (Hyperlane-style)
    ModularMessage,
    /// Rate-limited canonical mint/burn standard (XERC20-style)
    RateLimitedMint,
}

impl Protocol {
    /// All protocols in ordinal order. Iteration over this array is the only
    /// sanctioned way to enumerate protocols; adding a variant without
    /// extending it is a compile error via `from_ordinal`'s exhaustive match.
    pub const ALL: [Protocol; 4] = [
        Protocol::DirectMessage,
        Protocol::RelayNetwork,
        Protocol::ModularMessage,
        Protocol::RateLimitedMint,
    ];

    /// Stable ordinal identity.
    pub fn ordinal(&self) -> u8 {
        match self {
            Protocol::DirectMessage => 0,
            Protocol::RelayNetwork => 1,
            Protocol::ModularMessage => 2,
            Protocol::RateLimitedMint => 3,
        }
    }

    /// Reverse of `ordinal`. Returns `None` for unknown ordinals so persisted
    /// values from a newer deployment fail loudly instead of aliasing.
    pub fn from_ordinal(ordinal: u8) -> Option<Protocol> {
        match ordinal {
            0 => Some(Protocol::DirectMessage),
            1 => Some(Protocol::RelayNetwork),
            2 => Some(Protocol::ModularMessage),
            3 => Some(Protocol::RateLimitedMint),
            _ => None,
        }
    }

    /// Static security level, 0 (weakest) to 9 (strongest).
    ///
    /// A coarse, fixed ranking of the transport families' trust assumptions,
    /// used only for `RoutePreference::MostSecure` selection.
    pub fn security_level(&self) -> u8 {
        match self {
            Protocol::DirectMessage => 7,
            Protocol::RelayNetwork => 5,
            Protocol::ModularMessage => 6,
            Protocol::RateLimitedMint => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::DirectMessage => "direct_message",
            Protocol::RelayNetwork => "relay_network",
            Protocol::ModularMessage => "modular_message",
            Protocol::RateLimitedMint => "rate_limited_mint",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Module Seam
// ============================================================================

/// Failure surfaced by a transport module.
///
/// During route discovery any module failure degrades the option to
/// `available = false`; during dispatch it aborts the transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("Transport unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Transport rejected dispatch: {reason}")]
    Rejected { reason: String },

    #[error("Insufficient relay payment: need {required}, got {attached}")]
    InsufficientPayment { required: u128, attached: u128 },

    #[error("Unknown transfer: {transfer_id}")]
    UnknownTransfer { transfer_id: TransferId },
}

/// Fee quote from a transport module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Relay fee in native currency (smallest unit)
    pub fee: u128,
    /// Estimated delivery time in seconds
    pub estimated_time: u64,
}

/// Dispatch request forwarded to a transport module.
///
/// `payment` is the native currency attached by the caller; the router
/// forwards it in full and holds no funds beyond the instant of the call.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub dest_chain: ChainId,
    /// Recipient account on the destination chain, universal 32-byte form
    pub recipient: [u8; 32],
    pub amount: u128,
    /// Attached native currency for relay fees
    pub payment: u128,
    /// Opaque transport-specific parameters
    pub params: Vec<u8>,
}

/// One bridging mechanism's dispatch implementation.
///
/// Implementations wrap the actual wire protocol (message encoding, relay
/// submission) for one `Protocol`. All three operations are external calls
/// from the router's perspective: they may fail, and `bridge_out` may reenter
/// the router, which the router guards against.
pub trait BridgeModule {
    /// Quote the fee and delivery time for a prospective transfer.
    fn estimate_fee(
        &self,
        dest_chain: ChainId,
        amount: u128,
        params: &[u8],
    ) -> Result<FeeEstimate, ModuleError>;

    /// Dispatch a transfer, returning the module-produced transfer ID.
    fn bridge_out(&mut self, request: DispatchRequest) -> Result<TransferId, ModuleError>;

    /// Report the status of a previously dispatched transfer.
    fn status(&self, transfer_id: &TransferId) -> Result<TransferStatus, ModuleError>;
}

// ============================================================================
// Route Discovery Types
// ============================================================================

/// Caller preference for route selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePreference {
    /// Lowest fee among available options
    Cheapest,
    /// Lowest estimated delivery time among available options
    Fastest,
    /// Highest static security level among available options
    MostSecure,
}

/// One candidate route, computed on demand and never persisted.
///
/// A degraded transport (module errored during fee estimation) is still
/// listed, with `available = false` and zeroed quote fields, so one bad
/// module cannot abort discovery for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOption {
    pub protocol: Protocol,
    pub fee: u128,
    pub estimated_time: u64,
    pub security_level: u8,
    pub available: bool,
}

impl BridgeOption {
    /// The degraded form of an option whose module call failed.
    pub fn unavailable(protocol: Protocol) -> Self {
        BridgeOption {
            protocol,
            fee: 0,
            estimated_time: 0,
            security_level: protocol.security_level(),
            available: false,
        }
    }
}
