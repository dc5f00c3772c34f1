//! Transfer router
//!
//! Owns the transport module registry, per-chain protocol support, route
//! discovery and selection, and the dispatch path. The router holds no funds:
//! attached payment is forwarded to the chosen module within the call, and the
//! only durable state a successful dispatch leaves behind is the transfer
//! record and the audit events.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::capability::{Capabilities, Capability};
use crate::error::RouterError;
use crate::events::{Event, EventLog};
use crate::protocol::{BridgeModule, BridgeOption, DispatchRequest, Protocol, RoutePreference};
use crate::types::{Account, ChainId, TransferId, TransferStatus};

// ============================================================================
// State
// ============================================================================

/// Durable record of a routed transfer. Written exactly once on successful
/// dispatch; the protocol binding is never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub protocol: Protocol,
    pub dest_chain: ChainId,
    pub recipient: [u8; 32],
    pub amount: u128,
    pub routed_at: u64,
}

/// Aggregate dispatch counters, queryable by anyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStats {
    pub total_routed: u64,
    pub total_volume: u128,
}

/// The transfer router.
pub struct TransferRouter {
    capabilities: Capabilities,
    modules: HashMap<Protocol, Box<dyn BridgeModule>>,
    active: HashMap<Protocol, bool>,
    chain_support: HashMap<ChainId, HashSet<Protocol>>,
    default_routes: HashMap<ChainId, Protocol>,
    records: HashMap<TransferId, TransferRecord>,
    /// Dispatch order, for enumeration
    record_order: Vec<TransferId>,
    stats: RouterStats,
    paused: bool,
    /// Reentrancy guard around the dispatch path
    entered: bool,
    events: EventLog,
}

impl TransferRouter {
    /// Construct with `root` holding every capability.
    pub fn new(root: Account) -> Self {
        TransferRouter {
            capabilities: Capabilities::with_root(root),
            modules: HashMap::new(),
            active: HashMap::new(),
            chain_support: HashMap::new(),
            default_routes: HashMap::new(),
            records: HashMap::new(),
            record_order: Vec::new(),
            stats: RouterStats::default(),
            paused: false,
            entered: false,
            events: EventLog::new(),
        }
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Bind a transport module to a protocol and activate it. Re-registering
    /// replaces the module; the protocol stays active.
    pub fn register_protocol(
        &mut self,
        caller: &Account,
        protocol: Protocol,
        module: Box<dyn BridgeModule>,
    ) -> Result<(), RouterError> {
        self.capabilities.require(caller, Capability::ProtocolAdmin)?;
        self.modules.insert(protocol, module);
        self.active.insert(protocol, true);
        self.events.record(Event::ProtocolRegistered { protocol });
        tracing::info!(protocol = %protocol, "transport module registered");
        Ok(())
    }

    /// Activate or deactivate a protocol globally. Idempotent.
    pub fn update_protocol_status(
        &mut self,
        caller: &Account,
        protocol: Protocol,
        active: bool,
    ) -> Result<(), RouterError> {
        self.capabilities.require(caller, Capability::ProtocolAdmin)?;
        self.active.insert(protocol, active);
        self.events
            .record(Event::ProtocolStatusUpdated { protocol, active });
        Ok(())
    }

    /// Mark a protocol as supported (or not) toward a destination chain.
    /// Idempotent.
    pub fn set_chain_support(
        &mut self,
        caller: &Account,
        dest_chain: ChainId,
        protocol: Protocol,
        supported: bool,
    ) -> Result<(), RouterError> {
        self.capabilities.require(caller, Capability::RouterAdmin)?;
        let set = self.chain_support.entry(dest_chain).or_default();
        if supported {
            set.insert(protocol);
        } else {
            set.remove(&protocol);
        }
        self.events.record(Event::ChainSupportUpdated {
            dest_chain,
            protocol,
            supported,
        });
        Ok(())
    }

    /// Record an advisory default route for a destination chain. Stored and
    /// queryable only; `bridge_token` always takes an explicit protocol.
    pub fn set_default_route(
        &mut self,
        caller: &Account,
        dest_chain: ChainId,
        protocol: Protocol,
    ) -> Result<(), RouterError> {
        self.capabilities.require(caller, Capability::RouterAdmin)?;
        self.default_routes.insert(dest_chain, protocol);
        self.events
            .record(Event::DefaultRouteSet { dest_chain, protocol });
        Ok(())
    }

    /// Pause or unpause dispatch. Administration and reads stay available
    /// while paused. Idempotent.
    pub fn set_paused(&mut self, caller: &Account, paused: bool) -> Result<(), RouterError> {
        self.capabilities.require(caller, Capability::RouterAdmin)?;
        self.paused = paused;
        self.events.record(Event::RouterPauseSet { paused });
        Ok(())
    }

    /// Grant a capability. The caller must itself hold the capability it
    /// grants.
    pub fn grant_capability(
        &mut self,
        caller: &Account,
        account: Account,
        cap: Capability,
    ) -> Result<(), RouterError> {
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
    ) -> Result<(), RouterError> {
        self.capabilities.require(caller, cap)?;
        self.capabilities.revoke(account, cap);
        Ok(())
    }

    // ========================================================================
    // Route Discovery & Selection
    // ========================================================================

    /// Quote every protocol that is globally active and supported toward
    /// `dest_chain`, in ordinal order. A module whose fee estimate fails (or
    /// a supported protocol with no module bound) is still listed, marked
    /// unavailable, so one degraded transport cannot abort discovery for the
    /// rest.
    pub fn bridge_options(
        &self,
        dest_chain: ChainId,
        amount: u128,
        params: &[u8],
    ) -> Vec<BridgeOption> {
        let mut options = Vec::new();
        for protocol in Protocol::ALL {
            if !self.is_active(protocol) || !self.is_supported(dest_chain, protocol) {
                continue;
            }
            let option = match self.modules.get(&protocol) {
                Some(module) => match module.estimate_fee(dest_chain, amount, params) {
                    Ok(estimate) => BridgeOption {
                        protocol,
                        fee: estimate.fee,
                        estimated_time: estimate.estimated_time,
                        security_level: protocol.security_level(),
                        available: true,
                    },
                    Err(err) => {
                        tracing::warn!(
                            protocol = %protocol,
                            dest_chain = %dest_chain,
                            error = %err,
                            "fee estimate failed, listing protocol as unavailable"
                        );
                        BridgeOption::unavailable(protocol)
                    }
                },
                None => BridgeOption::unavailable(protocol),
            };
            options.push(option);
        }
        options
    }

    /// Select the best available protocol toward `dest_chain` by `preference`.
    /// Ties break toward the lowest protocol ordinal; fails with
    /// `NoAvailableRoute` when nothing usable remains.
    pub fn optimal_route(
        &self,
        dest_chain: ChainId,
        amount: u128,
        preference: RoutePreference,
        params: &[u8],
    ) -> Result<(Protocol, u128), RouterError> {
        let options = self.bridge_options(dest_chain, amount, params);
        // Options come back in ordinal order, so a strict comparison keeps
        // the first-seen winner on ties.
        let mut best: Option<&BridgeOption> = None;
        for option in options.iter().filter(|o| o.available) {
            let better = match best {
                None => true,
                Some(current) => match preference {
                    RoutePreference::Cheapest => option.fee < current.fee,
                    RoutePreference::Fastest => option.estimated_time < current.estimated_time,
                    RoutePreference::MostSecure => {
                        option.security_level > current.security_level
                    }
                },
            };
            if better {
                best = Some(option);
            }
        }
        match best {
            Some(option) => Ok((option.protocol, option.fee)),
            None => Err(RouterError::NoAvailableRoute { dest_chain }),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Route a transfer through an explicitly chosen protocol. On success the
    /// module's transfer id is recorded against the protocol and the route
    /// and transfer events are emitted; on any failure no state changes.
    pub fn bridge_token(
        &mut self,
        dest_chain: ChainId,
        recipient: [u8; 32],
        amount: u128,
        protocol: Protocol,
        payment: u128,
        params: Vec<u8>,
        now: u64,
    ) -> Result<TransferId, RouterError> {
        if self.entered {
            return Err(RouterError::ReentrantCall);
        }
        self.entered = true;
        let result =
            self.dispatch(dest_chain, recipient, amount, protocol, payment, params, now);
        self.entered = false;
        result
    }

    fn dispatch(
        &mut self,
        dest_chain: ChainId,
        recipient: [u8; 32],
        amount: u128,
        protocol: Protocol,
        payment: u128,
        params: Vec<u8>,
        now: u64,
    ) -> Result<TransferId, RouterError> {
        if self.paused {
            return Err(RouterError::RouterPaused);
        }
        if !self.is_active(protocol) {
            return Err(RouterError::ProtocolInactive { protocol });
        }
        if !self.is_supported(dest_chain, protocol) {
            return Err(RouterError::UnsupportedChainForProtocol {
                protocol,
                dest_chain,
            });
        }
        let module = self
            .modules
            .get_mut(&protocol)
            .ok_or(RouterError::ModuleNotRegistered { protocol })?;

        let transfer_id = module.bridge_out(DispatchRequest {
            dest_chain,
            recipient,
            amount,
            payment,
            params,
        })?;

        // A transfer id binds to exactly one protocol for its lifetime; a
        // module reissuing an id is a bug surfaced here, not reassigned.
        if self.records.contains_key(&transfer_id) {
            return Err(RouterError::DuplicateTransferId { transfer_id });
        }

        self.records.insert(
            transfer_id,
            TransferRecord {
                protocol,
                dest_chain,
                recipient,
                amount,
                routed_at: now,
            },
        );
        self.record_order.push(transfer_id);
        self.stats.total_routed += 1;
        self.stats.total_volume = self.stats.total_volume.saturating_add(amount);

        self.events.record(Event::RouteSelected {
            dest_chain,
            protocol,
            fee: payment,
        });
        self.events.record(Event::TransferRouted {
            transfer_id,
            protocol,
            dest_chain,
            amount,
        });
        tracing::info!(
            transfer_id = %transfer_id,
            protocol = %protocol,
            dest_chain = %dest_chain,
            amount,
            "transfer routed"
        );

        Ok(transfer_id)
    }

    // ========================================================================
    // Status & Views
    // ========================================================================

    /// Delegate a status lookup to the owning module. An unknown transfer id,
    /// or a module that cannot answer, reads as `Failed` rather than an error:
    /// absence of a route is meaningful state.
    pub fn transfer_status(&self, transfer_id: &TransferId) -> TransferStatus {
        let Some(record) = self.records.get(transfer_id) else {
            return TransferStatus::Failed;
        };
        match self.modules.get(&record.protocol) {
            Some(module) => module
                .status(transfer_id)
                .unwrap_or(TransferStatus::Failed),
            None => TransferStatus::Failed,
        }
    }

    pub fn transfer_record(&self, transfer_id: &TransferId) -> Option<&TransferRecord> {
        self.records.get(transfer_id)
    }

    /// Routed transfer ids in dispatch order.
    pub fn transfers(&self) -> &[TransferId] {
        &self.record_order
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_active(&self, protocol: Protocol) -> bool {
        self.active.get(&protocol).copied().unwrap_or(false)
    }

    pub fn is_supported(&self, dest_chain: ChainId, protocol: Protocol) -> bool {
        self.chain_support
            .get(&dest_chain)
            .map(|set| set.contains(&protocol))
            .unwrap_or(false)
    }

    pub fn default_route(&self, dest_chain: ChainId) -> Option<Protocol> {
        self.default_routes.get(&dest_chain).copied()
    }

    /// All protocols with their activation and module-binding state, in
    /// ordinal order.
    pub fn protocols(&self) -> Vec<(Protocol, bool, bool)> {
        Protocol::ALL
            .iter()
            .map(|p| (*p, self.is_active(*p), self.modules.contains_key(p)))
            .collect()
    }

    /// Chains a protocol is marked supported for, sorted by chain id.
    pub fn supported_chains(&self, protocol: Protocol) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self
            .chain_support
            .iter()
            .filter(|(_, set)| set.contains(&protocol))
            .map(|(chain, _)| *chain)
            .collect();
        chains.sort_by_key(|c| c.0);
        chains
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FeeEstimate, ModuleError};

    fn root() -> Account {
        Account::new("terra1admin")
    }

    fn chain() -> ChainId {
        ChainId::from_u32(56)
    }

    /// Scripted transport module for tests.
    struct TestModule {
        fee: u128,
        time: u64,
        fail_estimate: bool,
        fail_dispatch: bool,
        /// Id to return from every dispatch
        next_id: u8,
        statuses: HashMap<TransferId, TransferStatus>,
    }

    impl TestModule {
        fn new(fee: u128, time: u64) -> Self {
            TestModule {
                fee,
                time,
                fail_estimate: false,
                fail_dispatch: false,
                next_id: 1,
                statuses: HashMap::new(),
            }
        }
    }

    impl BridgeModule for TestModule {
        fn estimate_fee(
            &self,
            _dest_chain: ChainId,
            _amount: u128,
            _params: &[u8],
        ) -> Result<FeeEstimate, ModuleError> {
            if self.fail_estimate {
                return Err(ModuleError::Unavailable {
                    reason: "relay offline".to_string(),
                });
            }
            Ok(FeeEstimate {
                fee: self.fee,
                estimated_time: self.time,
            })
        }

        fn bridge_out(&mut self, _request: DispatchRequest) -> Result<TransferId, ModuleError> {
            if self.fail_dispatch {
                return Err(ModuleError::Rejected {
                    reason: "sequencer down".to_string(),
                });
            }
            let id = TransferId::from_bytes([self.next_id; 32]);
            self.statuses.insert(id, TransferStatus::Pending);
            Ok(id)
        }

        fn status(&self, transfer_id: &TransferId) -> Result<TransferStatus, ModuleError> {
            self.statuses
                .get(transfer_id)
                .copied()
                .ok_or(ModuleError::UnknownTransfer {
                    transfer_id: *transfer_id,
                })
        }
    }

    fn setup() -> TransferRouter {
        let mut router = TransferRouter::new(root());
        router
            .register_protocol(
                &root(),
                Protocol::DirectMessage,
                Box::new(TestModule::new(300, 60)),
            )
            .unwrap();
        router
            .register_protocol(
                &root(),
                Protocol::RelayNetwork,
                Box::new(TestModule::new(100, 600)),
            )
            .unwrap();
        for p in [Protocol::DirectMessage, Protocol::RelayNetwork] {
            router.set_chain_support(&root(), chain(), p, true).unwrap();
        }
        router
    }

    #[test]
    fn test_register_requires_protocol_admin() {
        let mut router = TransferRouter::new(root());
        let err = router
            .register_protocol(
                &Account::new("terra1mallory"),
                Protocol::DirectMessage,
                Box::new(TestModule::new(1, 1)),
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::Unauthorized(_)));
    }

    #[test]
    fn test_options_ordinal_order_and_filtering() {
        let router = setup();
        let options = router.bridge_options(chain(), 1_000, &[]);
        // Only active, supported protocols appear, lowest ordinal first
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].protocol, Protocol::DirectMessage);
        assert_eq!(options[1].protocol, Protocol::RelayNetwork);
        assert!(options.iter().all(|o| o.available));

        // Unsupported chain: nothing listed
        assert!(router
            .bridge_options(ChainId::from_u32(999), 1_000, &[])
            .is_empty());
    }

    #[test]
    fn test_degraded_module_listed_unavailable() {
        let mut router = setup();
        let mut broken = TestModule::new(1, 1);
        broken.fail_estimate = true;
        router
            .register_protocol(&root(), Protocol::DirectMessage, Box::new(broken))
            .unwrap();

        let options = router.bridge_options(chain(), 1_000, &[]);
        assert_eq!(options.len(), 2);
        assert!(!options[0].available);
        assert_eq!(options[0].fee, 0);
        assert_eq!(options[0].estimated_time, 0);
        // The healthy transport is untouched by its neighbor's failure
        assert!(options[1].available);
    }

    #[test]
    fn test_optimal_route_preferences() {
        let router = setup();
        // DirectMessage: fee 300, time 60, security 7
        // RelayNetwork:  fee 100, time 600, security 5
        let (p, fee) = router
            .optimal_route(chain(), 1_000, RoutePreference::Cheapest, &[])
            .unwrap();
        assert_eq!((p, fee), (Protocol::RelayNetwork, 100));

        let (p, _) = router
            .optimal_route(chain(), 1_000, RoutePreference::Fastest, &[])
            .unwrap();
        assert_eq!(p, Protocol::DirectMessage);

        let (p, _) = router
            .optimal_route(chain(), 1_000, RoutePreference::MostSecure, &[])
            .unwrap();
        assert_eq!(p, Protocol::DirectMessage);
    }

    #[test]
    fn test_optimal_route_tie_breaks_lowest_ordinal() {
        let mut router = TransferRouter::new(root());
        // Identical quotes from both transports
        for p in [Protocol::DirectMessage, Protocol::RelayNetwork] {
            router
                .register_protocol(&root(), p, Box::new(TestModule::new(100, 60)))
                .unwrap();
            router.set_chain_support(&root(), chain(), p, true).unwrap();
        }
        let (p, _) = router
            .optimal_route(chain(), 1_000, RoutePreference::Cheapest, &[])
            .unwrap();
        assert_eq!(p, Protocol::DirectMessage);
        let (p, _) = router
            .optimal_route(chain(), 1_000, RoutePreference::Fastest, &[])
            .unwrap();
        assert_eq!(p, Protocol::DirectMessage);
    }

    #[test]
    fn test_no_available_route_when_all_degraded() {
        let mut router = TransferRouter::new(root());
        let mut broken = TestModule::new(1, 1);
        broken.fail_estimate = true;
        router
            .register_protocol(&root(), Protocol::DirectMessage, Box::new(broken))
            .unwrap();
        router
            .set_chain_support(&root(), chain(), Protocol::DirectMessage, true)
            .unwrap();

        let err = router
            .optimal_route(chain(), 1_000, RoutePreference::Cheapest, &[])
            .unwrap_err();
        assert!(matches!(err, RouterError::NoAvailableRoute { .. }));
    }

    #[test]
    fn test_bridge_token_records_and_counts() {
        let mut router = setup();
        let id = router
            .bridge_token(chain(), [9u8; 32], 1_000, Protocol::RelayNetwork, 100, vec![], 50)
            .unwrap();

        let record = router.transfer_record(&id).unwrap();
        assert_eq!(record.protocol, Protocol::RelayNetwork);
        assert_eq!(record.amount, 1_000);
        assert_eq!(record.routed_at, 50);
        assert_eq!(router.transfers(), &[id]);
        assert_eq!(
            router.stats(),
            RouterStats {
                total_routed: 1,
                total_volume: 1_000,
            }
        );
        assert_eq!(router.transfer_status(&id), TransferStatus::Pending);

        // Route-selected then transfer-routed, exactly once each
        let events = router.events().all();
        let n = events.len();
        assert!(matches!(events[n - 2], Event::RouteSelected { .. }));
        assert!(matches!(events[n - 1], Event::TransferRouted { .. }));
    }

    #[test]
    fn test_bridge_token_guards() {
        let mut router = setup();

        router
            .update_protocol_status(&root(), Protocol::RelayNetwork, false)
            .unwrap();
        let err = router
            .bridge_token(chain(), [0u8; 32], 1, Protocol::RelayNetwork, 0, vec![], 0)
            .unwrap_err();
        assert!(matches!(err, RouterError::ProtocolInactive { .. }));

        let err = router
            .bridge_token(
                ChainId::from_u32(999),
                [0u8; 32],
                1,
                Protocol::DirectMessage,
                0,
                vec![],
                0,
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedChainForProtocol { .. }));

        // Supported but never registered
        router
            .set_chain_support(&root(), chain(), Protocol::ModularMessage, true)
            .unwrap();
        router
            .update_protocol_status(&root(), Protocol::ModularMessage, true)
            .unwrap();
        let err = router
            .bridge_token(chain(), [0u8; 32], 1, Protocol::ModularMessage, 0, vec![], 0)
            .unwrap_err();
        assert!(matches!(err, RouterError::ModuleNotRegistered { .. }));

        router.set_paused(&root(), true).unwrap();
        let err = router
            .bridge_token(chain(), [0u8; 32], 1, Protocol::DirectMessage, 0, vec![], 0)
            .unwrap_err();
        assert!(matches!(err, RouterError::RouterPaused));
    }

    #[test]
    fn test_failed_dispatch_leaves_no_trace() {
        let mut router = setup();
        let mut broken = TestModule::new(1, 1);
        broken.fail_dispatch = true;
        router
            .register_protocol(&root(), Protocol::DirectMessage, Box::new(broken))
            .unwrap();
        let events_before = router.events().len();

        let err = router
            .bridge_token(chain(), [0u8; 32], 500, Protocol::DirectMessage, 0, vec![], 0)
            .unwrap_err();
        assert!(matches!(err, RouterError::DispatchFailed(_)));
        assert_eq!(router.stats(), RouterStats::default());
        assert!(router.transfers().is_empty());
        assert_eq!(router.events().len(), events_before);
    }

    #[test]
    fn test_duplicate_transfer_id_rejected() {
        let mut router = setup();
        // TestModule reissues the same id every dispatch
        router
            .bridge_token(chain(), [0u8; 32], 100, Protocol::RelayNetwork, 0, vec![], 0)
            .unwrap();
        let err = router
            .bridge_token(chain(), [0u8; 32], 100, Protocol::RelayNetwork, 0, vec![], 1)
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateTransferId { .. }));
        // The first binding survives untouched
        assert_eq!(router.stats().total_routed, 1);
    }

    #[test]
    fn test_unknown_transfer_status_reads_failed() {
        let router = setup();
        let unknown = TransferId::from_bytes([0xFF; 32]);
        assert_eq!(router.transfer_status(&unknown), TransferStatus::Failed);
    }

    #[test]
    fn test_idempotent_admin_ops() {
        let mut router = setup();
        router
            .set_chain_support(&root(), chain(), Protocol::RelayNetwork, true)
            .unwrap();
        assert!(router.is_supported(chain(), Protocol::RelayNetwork));

        router
            .set_default_route(&root(), chain(), Protocol::RelayNetwork)
            .unwrap();
        router
            .set_default_route(&root(), chain(), Protocol::RelayNetwork)
            .unwrap();
        assert_eq!(router.default_route(chain()), Some(Protocol::RelayNetwork));
    }

    #[test]
    fn test_enumeration_views() {
        let router = setup();
        let protocols = router.protocols();
        assert_eq!(protocols.len(), 4);
        assert_eq!(protocols[0], (Protocol::DirectMessage, true, true));
        assert_eq!(protocols[1], (Protocol::RelayNetwork, true, true));
        // Never registered
        assert_eq!(protocols[2], (Protocol::ModularMessage, false, false));

        assert_eq!(
            router.supported_chains(Protocol::DirectMessage),
            vec![chain()]
        );
        assert!(router.supported_chains(Protocol::RateLimitedMint).is_empty());
    }
}
