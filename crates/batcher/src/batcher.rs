//! The per-chain scheduling loop.

use std::{sync::Arc, time::Duration};

use corridor_chain_ops::{
    ops::ChainOperations,
    traits::{BridgeContract, SignedBatch},
    ChainOpsResult,
};
use corridor_primitives::chain::ChainId;
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::errors::{BatcherError, BatcherResult};

/// Builds (or rebuilds) the chain-operations strategy for one chain.
///
/// Called lazily: once at the first tick, and again whenever a transient RPC
/// failure made the loop discard its clients.
pub type OpsFactory = Box<dyn Fn() -> ChainOpsResult<Box<dyn ChainOperations>> + Send>;

/// One chain's batch scheduling loop.
///
/// Strictly sequential within the chain: a tick runs one build-and-submit
/// attempt to completion before the next tick is considered, so two in-flight
/// attempts can never select overlapping UTXOs.
pub struct Batcher {
    chain_id: ChainId,
    tick_interval: Duration,
    contract: Arc<dyn BridgeContract>,
    ops_factory: OpsFactory,
    ops: Option<Box<dyn ChainOperations>>,
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Batcher({})", self.chain_id)
    }
}

impl Batcher {
    /// Creates a loop for one chain; nothing runs until [`Self::run`].
    pub fn new(
        chain_id: ChainId,
        tick_interval: Duration,
        contract: Arc<dyn BridgeContract>,
        ops_factory: OpsFactory,
    ) -> Self {
        Self {
            chain_id,
            tick_interval,
            contract,
            ops_factory,
            ops: None,
        }
    }

    /// Runs the loop until shutdown is signalled or a fatal error occurs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> BatcherResult<()> {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(chain = %self.chain_id, "batcher loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(chain = %self.chain_id, "batcher loop shutting down");
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(chain = %self.chain_id, %err, "batcher loop stopping");
                        return Err(err);
                    }
                }
            }
        }
    }

    /// One scheduling tick; `Err` only for errors the loop must stop on.
    async fn tick(&mut self) -> BatcherResult<()> {
        if self.ops.is_none() {
            match (self.ops_factory)() {
                Ok(ops) => self.ops = Some(ops),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!(chain = %self.chain_id, %err, "cannot construct chain clients yet");
                    return Ok(());
                }
            }
        }

        match self.attempt().await {
            Ok(true) => {
                info!(chain = %self.chain_id, "batch submitted");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) if err.is_wait() => {
                debug!(chain = %self.chain_id, %err, "deferring batch to a later tick");
                Ok(())
            }
            Err(err) if err.is_transient() => {
                // The client is assumed broken; drop it and let the next tick
                // rebuild from scratch.
                warn!(chain = %self.chain_id, %err, "transient rpc failure, discarding clients");
                self.ops = None;
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                warn!(chain = %self.chain_id, %err, "batch attempt abandoned for this tick");
                Ok(())
            }
        }
    }

    /// One build-and-submit attempt; returns whether a batch went out.
    async fn attempt(&mut self) -> ChainOpsResult<bool> {
        let ops = self.ops.as_mut().expect("ops constructed by tick");

        if !ops.is_synchronized().await? {
            debug!(chain = %self.chain_id, "indexer behind bridge contract, skipping tick");
            return Ok(false);
        }
        if !self.contract.should_create_batch(&self.chain_id).await? {
            return Ok(false);
        }

        let confirmed = self.contract.confirmed_transactions(&self.chain_id).await?;
        if confirmed.is_empty() {
            debug!(chain = %self.chain_id, "no confirmed transactions yet");
            return Ok(false);
        }
        let validators = self.contract.validator_set(&self.chain_id).await?;
        let batch_id = self.contract.next_batch_id(&self.chain_id).await?;

        let tx = ops.generate_batch(batch_id, &confirmed, &validators).await?;
        let signatures = ops.sign_batch(&tx)?;
        let batch = SignedBatch {
            chain_id: self.chain_id.clone(),
            tx,
            signatures: vec![signatures],
            gas_limit: None,
        };
        ops.submit_batch(batch).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use corridor_chain_ops::{
        cardano::CardanoOpsConfig,
        create_chain_operations,
        traits::CardanoWallet,
        OpsConfig,
    };
    use corridor_primitives::{
        bridge::ValidatorTable,
        buf::Buf32,
        chain::{BlockPoint, ChainKind},
    };
    use corridor_test_utils::{
        bridge::{BridgeState, InMemoryBridge},
        gen::{committee_with, confirmed_transfer, seeded_wallet, utxo},
    };
    use corridor_tx_builder::{
        cardano::address::CardanoNetwork, context::AggregatorContext, policy::resolve_policies,
    };

    use super::*;

    const CHAIN: &str = "cardano-prime";

    fn ops_config(committee: ValidatorTable) -> CardanoOpsConfig {
        CardanoOpsConfig {
            chain_id: ChainId::from(CHAIN),
            kind: ChainKind::CardanoReactor,
            aggregator: AggregatorContext::reactor(CardanoNetwork::Testnet, 1_000_000),
            slot_rounding_threshold: 60,
            no_batch_period_bps: 1_250,
            max_utxo_count: 50,
            max_fee_utxo_count: 4,
            take_at_least_utxo_count: None,
            fixed_committee: Some(committee),
        }
    }

    /// A bridge seeded so one reactor batch can be built end to end.
    fn seeded_bridge(wallet: CardanoWallet, committee: &ValidatorTable) -> Arc<InMemoryBridge> {
        // Addresses depend only on the committee; any member passes the
        // own-keys check the resolver insists on.
        let member = *committee.0.values().next().unwrap();
        let policies =
            resolve_policies(committee, &member, CardanoNetwork::Testnet).unwrap();

        let bridge = InMemoryBridge::new(BridgeState::default());
        bridge.with_state(|state| {
            state.wallets.insert(ChainId::from(CHAIN), wallet);
            state.validators = committee.clone();
            state.tip = BlockPoint::new(75, Buf32([9; 32]));
            state.confirmed.insert(
                ChainId::from(CHAIN),
                vec![confirmed_transfer(CHAIN, 4, 2_000_000)],
            );
            state
                .utxos
                .insert(policies.funds.address.clone(), vec![utxo(1, 0, 50_000_000)]);
            state
                .utxos
                .insert(policies.fee.address.clone(), vec![utxo(2, 0, 5_000_000)]);
        });
        bridge
    }

    fn batcher_for(bridge: &Arc<InMemoryBridge>, committee: ValidatorTable) -> Batcher {
        let factory_bridge = bridge.clone();
        let factory: OpsFactory = Box::new(move || {
            create_chain_operations(
                OpsConfig::Cardano(ops_config(committee.clone())),
                factory_bridge.clone(),
                factory_bridge.clone(),
                factory_bridge.as_ref(),
                None,
            )
        });
        Batcher::new(
            ChainId::from(CHAIN),
            Duration::from_secs(30),
            bridge.clone(),
            factory,
        )
    }

    #[tokio::test]
    async fn a_tick_builds_signs_and_submits_one_batch() {
        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        let mut batcher = batcher_for(&bridge, committee);

        batcher.tick().await.unwrap();

        let submitted = bridge.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].chain_id, ChainId::from(CHAIN));
        assert_eq!(submitted[0].signatures.len(), 1);
        assert!(submitted[0].signatures[0].fee.is_some());
    }

    #[tokio::test]
    async fn no_confirmed_transactions_is_a_quiet_tick() {
        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        bridge.with_state(|state| state.confirmed.clear());
        let mut batcher = batcher_for(&bridge, committee);

        batcher.tick().await.unwrap();

        assert!(bridge.submitted().is_empty());
    }

    #[tokio::test]
    async fn dead_zone_tip_defers_without_failing_the_loop() {
        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        bridge.with_state(|state| state.tip = BlockPoint::new(66, Buf32([9; 32])));
        let mut batcher = batcher_for(&bridge, committee);

        batcher.tick().await.unwrap();
        assert!(bridge.submitted().is_empty());

        // Tip moves out of the dead zone; the next tick succeeds.
        bridge.with_state(|state| state.tip = BlockPoint::new(75, Buf32([9; 32])));
        batcher.tick().await.unwrap();
        assert_eq!(bridge.submitted().len(), 1);
    }

    #[tokio::test]
    async fn transient_rpc_failure_discards_and_recreates_clients() {
        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        let mut batcher = batcher_for(&bridge, committee);

        bridge.with_state(|state| state.rpc_down = true);
        batcher.tick().await.unwrap();
        assert!(batcher.ops.is_none(), "clients must be discarded");

        bridge.with_state(|state| state.rpc_down = false);
        batcher.tick().await.unwrap();
        assert_eq!(bridge.submitted().len(), 1);
    }

    #[tokio::test]
    async fn fatal_configuration_stops_the_loop() {
        let (wallet, _) = seeded_wallet(1);
        let (_, stranger_keys) = seeded_wallet(99);
        let committee = committee_with(stranger_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        let mut batcher = batcher_for(&bridge, committee);

        let err = batcher.tick().await.unwrap_err();
        assert!(matches!(err, BatcherError::ChainOps(ref inner) if inner.is_fatal()));
    }

    #[tokio::test]
    async fn run_honors_shutdown() {
        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let bridge = seeded_bridge(wallet, &committee);
        let batcher = batcher_for(&bridge, committee);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(batcher.run(rx));
        tx.send(true).unwrap();

        handle.await.unwrap().unwrap();
    }
}
