//! Observable event audit trail
//!
//! Every externally observable state change is recorded exactly once, after
//! all validation for the causing operation has passed. The log is append-only
//! and is the only durable audit surface this core exposes; each record is
//! also mirrored to `tracing` for operators tailing a live deployment.

use serde::{Deserialize, Serialize};

use crate::protocol::Protocol;
use crate::types::{Account, ChainId, TransferId};

/// Audit events emitted by the router and the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // ========================================================================
    // Router Events
    // ========================================================================
    ProtocolRegistered {
        protocol: Protocol,
    },
    ProtocolStatusUpdated {
        protocol: Protocol,
        active: bool,
    },
    ChainSupportUpdated {
        dest_chain: ChainId,
        protocol: Protocol,
        supported: bool,
    },
    DefaultRouteSet {
        dest_chain: ChainId,
        protocol: Protocol,
    },
    RouterPauseSet {
        paused: bool,
    },
    RouteSelected {
        dest_chain: ChainId,
        protocol: Protocol,
        fee: u128,
    },
    TransferRouted {
        transfer_id: TransferId,
        protocol: Protocol,
        dest_chain: ChainId,
        amount: u128,
    },

    // ========================================================================
    // Policy Engine Events
    // ========================================================================
    ProtocolPauseSet {
        protocol: Protocol,
        paused: bool,
    },
    EmergencyPauseSet {
        paused: bool,
    },
    ProtocolConfigUpdated {
        protocol: Protocol,
    },
    GlobalLimitUpdated {
        limit: u128,
    },
    AnomalyThresholdUpdated {
        volume_threshold: u128,
    },
    TransferBlocked {
        transfer_id: TransferId,
    },
    AnomalyDetected {
        subject: Account,
        protocol: Protocol,
        volume: u128,
    },
    SuspicionReset {
        subject: Account,
    },
    SubjectLimitSet {
        subject: Account,
        max_limit: u128,
    },
    MintBurnLimitsSet {
        bridge: Account,
        max_mint: u128,
        max_burn: u128,
    },
}

/// Append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and mirror it to the tracing subscriber.
    pub fn record(&mut self, event: Event) {
        tracing::info!(target: "bridge_router::audit", ?event, "audit event");
        self.events.push(event);
    }

    /// All recorded events, oldest first.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_in_order() {
        let mut log = EventLog::new();
        log.record(Event::RouterPauseSet { paused: true });
        log.record(Event::RouterPauseSet { paused: false });

        assert_eq!(log.len(), 2);
        assert_eq!(log.all()[0], Event::RouterPauseSet { paused: true });
        assert_eq!(log.all()[1], Event::RouterPauseSet { paused: false });
    }

    #[test]
    fn test_event_serializes() {
        let event = Event::TransferRouted {
            transfer_id: TransferId::from_bytes([1u8; 32]),
            protocol: Protocol::RelayNetwork,
            dest_chain: ChainId::from_u32(56),
            amount: 1_000_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
