//! Error types for the routing and policy core
//!
//! Three taxonomies: router failures (routing/dispatch), policy denials
//! (validation), and rate-limit exhaustion (shared primitive). Configuration
//! errors are rejected synchronously at the administrative call; policy
//! denials abort the whole operation with no partial state change.

use thiserror::Error;

use crate::capability::Unauthorized;
use crate::protocol::{ModuleError, Protocol};
use crate::types::{Account, ChainId, TransferId};

/// Rate limiter failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Rate limit exceeded: {available} available, requested {requested}")]
    LimitExceeded { available: u128, requested: u128 },
}

/// Transfer router failures.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),

    // ========================================================================
    // Routing Errors
    // ========================================================================
    #[error("No available route to chain {dest_chain}")]
    NoAvailableRoute { dest_chain: ChainId },

    #[error("Protocol inactive: {protocol}")]
    ProtocolInactive { protocol: Protocol },

    #[error("Chain {dest_chain} not supported by protocol {protocol}")]
    UnsupportedChainForProtocol {
        protocol: Protocol,
        dest_chain: ChainId,
    },

    #[error("No transport module registered for protocol {protocol}")]
    ModuleNotRegistered { protocol: Protocol },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    #[error("Router is paused")]
    RouterPaused,

    #[error("Reentrant call rejected")]
    ReentrantCall,

    #[error("Dispatch failed: {0}")]
    DispatchFailed(#[from] ModuleError),

    #[error("Transfer ID already recorded: {transfer_id}")]
    DuplicateTransferId { transfer_id: TransferId },
}

/// Policy engine denials and configuration failures.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),

    // ========================================================================
    // Validation Denials
    // ========================================================================
    #[error("Emergency pause is active")]
    EmergencyPaused,

    #[error("Protocol paused: {protocol}")]
    ProtocolPaused { protocol: Protocol },

    #[error("Transfer blocked: {transfer_id}")]
    TransferBlocked { transfer_id: TransferId },

    #[error("Global daily limit exceeded: limit {limit}, volume {volume}, requested {requested}")]
    GlobalDailyLimitExceeded {
        limit: u128,
        volume: u128,
        requested: u128,
    },

    #[error("Transaction limit exceeded for {protocol}: limit {limit}, requested {requested}")]
    TransactionLimitExceeded {
        protocol: Protocol,
        limit: u128,
        requested: u128,
    },

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error("Subject flagged for suspicious activity: {subject} ({flags} flags)")]
    SubjectFlagged { subject: Account, flags: u32 },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
