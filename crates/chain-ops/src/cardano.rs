//! Chain operations for Cardano-style destination chains.
//!
//! Covers both protocol variants. Reactor spends from a fixed configured
//! committee and moves base asset only; skyline re-derives the multisig
//! policies from the live validator set on every batch and is token-aware in
//! aggregation. Everything else, from slot rounding to coin selection to the
//! encoded bytes, is shared.

use std::{fmt, sync::Arc};

use corridor_primitives::{
    asset::{AssetId, SumMap, TokenAmount},
    batch::{BatchKind, BatchSignatures, GeneratedBatchTx},
    bridge::{ValidatorKeys, ValidatorTable},
    buf::{Buf32, Buf64},
    chain::{ChainId, ChainKind},
    rounding::round_with_threshold,
    tx::{ConfirmedTransaction, TxInput, TxOutput, Utxo},
};
use corridor_selection::{expected_change, select_utxos};
use corridor_tx_builder::{
    aggregator::aggregate_outputs,
    cardano::tx::{build_batch_tx, TxBuildParams},
    context::AggregatorContext,
    policy::resolve_policies,
};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use tracing::{debug, info};

use crate::{
    errors::{ChainOpsError, ChainOpsResult},
    faults::FaultPlan,
    ops::ChainOperations,
    traits::{BridgeContract, Indexer, SecretsManager, SignedBatch},
};

/// Configuration of one Cardano chain's operations.
#[derive(Clone, Debug)]
pub struct CardanoOpsConfig {
    /// Chain this strategy serves.
    pub chain_id: ChainId,
    /// Protocol variant; must be one of the Cardano kinds.
    pub kind: ChainKind,
    /// Aggregation context: network, minimum UTXO, token exchange table.
    pub aggregator: AggregatorContext,
    /// Slot rounding threshold for the transaction validity window.
    pub slot_rounding_threshold: u64,
    /// Dead-zone width around rounding boundaries, in basis points.
    pub no_batch_period_bps: u64,
    /// Maximum inputs one batch may consume, fee inputs included.
    pub max_utxo_count: usize,
    /// Cap on fee-multisig inputs within that budget.
    pub max_fee_utxo_count: usize,
    /// Optional consolidation floor for the funds selection.
    pub take_at_least_utxo_count: Option<usize>,
    /// Fixed committee for reactor chains; ignored by skyline.
    pub fixed_committee: Option<ValidatorTable>,
}

/// Batch operations for one Cardano destination chain.
pub struct CardanoChainOperations {
    config: CardanoOpsConfig,
    contract: Arc<dyn BridgeContract>,
    indexer: Arc<dyn Indexer>,
    funds_signer: SigningKey,
    fee_signer: SigningKey,
    own_keys: ValidatorKeys,
    faults: Option<Arc<FaultPlan>>,
}

impl fmt::Debug for CardanoChainOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CardanoChainOperations({}, {})",
            self.config.chain_id, self.config.kind
        )
    }
}

impl CardanoChainOperations {
    /// Builds the strategy, loading this validator's wallet from the secrets
    /// manager and checking it against the configured committee.
    pub fn new(
        config: CardanoOpsConfig,
        contract: Arc<dyn BridgeContract>,
        indexer: Arc<dyn Indexer>,
        secrets: &dyn SecretsManager,
        faults: Option<Arc<FaultPlan>>,
    ) -> ChainOpsResult<Self> {
        if !config.kind.is_cardano() {
            return Err(ChainOpsError::FatalConfiguration(format!(
                "chain {} configured as {} on the cardano strategy",
                config.chain_id, config.kind
            )));
        }
        if config.kind == ChainKind::CardanoReactor && config.fixed_committee.is_none() {
            return Err(ChainOpsError::FatalConfiguration(format!(
                "reactor chain {} has no configured committee",
                config.chain_id
            )));
        }

        let wallet = secrets.cardano_wallet(&config.chain_id)?;
        let funds_signer = SigningKey::from_bytes(wallet.funds_skey.as_bytes());
        let fee_signer = SigningKey::from_bytes(wallet.fee_skey.as_bytes());
        let own_keys = ValidatorKeys {
            funds_key: Buf32(funds_signer.verifying_key().to_bytes()),
            fee_key: Buf32(fee_signer.verifying_key().to_bytes()),
        };

        // A fixed committee that excludes the local keys can never produce a
        // signable batch; fail at construction, not per tick.
        if let Some(committee) = &config.fixed_committee {
            if committee.position_of(&own_keys).is_none() {
                return Err(ChainOpsError::FatalConfiguration(format!(
                    "own keys are not in the configured committee for {}",
                    config.chain_id
                )));
            }
        }

        Ok(Self {
            config,
            contract,
            indexer,
            funds_signer,
            fee_signer,
            own_keys,
            faults,
        })
    }

    /// The committee whose multisig this batch spends from.
    fn committee<'a>(&'a self, live: &'a ValidatorTable) -> ChainOpsResult<&'a ValidatorTable> {
        match self.config.kind {
            ChainKind::CardanoReactor => {
                self.config.fixed_committee.as_ref().ok_or_else(|| {
                    ChainOpsError::FatalConfiguration(format!(
                        "reactor chain {} has no configured committee",
                        self.config.chain_id
                    ))
                })
            }
            _ => Ok(live),
        }
    }
}

#[async_trait]
impl ChainOperations for CardanoChainOperations {
    fn chain_id(&self) -> &ChainId {
        &self.config.chain_id
    }

    async fn generate_batch(
        &self,
        batch_id: u64,
        confirmed: &[ConfirmedTransaction],
        validators: &ValidatorTable,
    ) -> ChainOpsResult<GeneratedBatchTx> {
        if let Some(faults) = &self.faults {
            if faults.take_ttl_failure() {
                return Err(ChainOpsError::NonActiveBatchPeriod {
                    value: 0,
                    threshold: self.config.slot_rounding_threshold,
                });
            }
        }

        let tip = self.indexer.latest_point().await?;
        let ttl_slot = round_with_threshold(
            tip.number,
            self.config.slot_rounding_threshold,
            self.config.no_batch_period_bps,
        )?;

        let committee = self.committee(validators)?;
        let policies = resolve_policies(committee, &self.own_keys, self.config.aggregator.network)?;

        let aggregated = aggregate_outputs(confirmed, &self.config.aggregator)?;
        if aggregated.outputs.is_empty() {
            return Err(ChainOpsError::EmptyBatch);
        }

        let params = self.indexer.protocol_params().await?;
        let known = self.config.aggregator.exchange.known_assets();

        // Fee inputs come out of the overall input budget, so they are
        // selected first with their own tighter cap.
        let fee_candidates: Vec<Utxo> = self
            .indexer
            .utxos_at(&policies.fee.address)
            .await?
            .into_iter()
            .filter(|utxo| !utxo.has_unknown_tokens(&known))
            .collect();
        let fee_desired: SumMap = [(AssetId::Base, params.batch_fee)].into_iter().collect();
        let fee_selection = select_utxos(
            &fee_candidates,
            &fee_desired,
            self.config.max_fee_utxo_count,
            None,
        )?;

        let funds_candidates: Vec<Utxo> = self
            .indexer
            .utxos_at(&policies.funds.address)
            .await?
            .into_iter()
            .filter(|utxo| !utxo.has_unknown_tokens(&known))
            .collect();
        let mut desired = aggregated.sums.clone();
        // Padding so the change output clears the minimum-UTXO floor. The
        // configured value caps the live parameter from below in case the
        // indexer serves stale parameters.
        desired.add(AssetId::Base, params.min_utxo.max(self.config.aggregator.min_utxo))?;
        let budget = self
            .config
            .max_utxo_count
            .saturating_sub(fee_selection.utxos.len());
        let funds_selection = select_utxos(
            &funds_candidates,
            &desired,
            budget,
            self.config.take_at_least_utxo_count,
        )?;

        let mut outputs = aggregated.outputs.clone();
        let change = expected_change(&funds_selection.total, &aggregated.sums)?;
        if !change.is_empty() {
            outputs.push(sum_map_output(policies.funds.address.clone(), &change));
        }
        let fee_change = expected_change(&fee_selection.total, &fee_desired)?;
        if !fee_change.is_empty() {
            outputs.push(sum_map_output(policies.fee.address.clone(), &fee_change));
        }

        let mut inputs: Vec<TxInput> =
            funds_selection.utxos.iter().map(TxInput::from).collect();
        inputs.extend(fee_selection.utxos.iter().map(TxInput::from));

        let kind = if aggregated.is_redistribution {
            BatchKind::Redistribution
        } else {
            BatchKind::Bridging
        };
        let tx = build_batch_tx(
            &inputs,
            &outputs,
            &TxBuildParams {
                batch_id,
                fee: params.batch_fee,
                ttl_slot,
                max_tx_size: params.max_tx_size,
            },
            kind,
        )?;

        debug!(
            batch_id,
            inputs = inputs.len(),
            outputs = outputs.len(),
            size = tx.raw_tx.len(),
            ttl_slot,
            "generated cardano batch transaction"
        );
        Ok(tx)
    }

    fn sign_batch(&self, tx: &GeneratedBatchTx) -> ChainOpsResult<BatchSignatures> {
        let funds_sig = self.funds_signer.sign(tx.tx_hash.as_bytes());
        let fee_sig = self.fee_signer.sign(tx.tx_hash.as_bytes());
        Ok(BatchSignatures {
            tx_hash: tx.tx_hash,
            funds: funds_sig.to_bytes().to_vec(),
            fee: Some(Buf64(fee_sig.to_bytes())),
        })
    }

    async fn is_synchronized(&self) -> ChainOpsResult<bool> {
        let point = self.indexer.latest_point().await?;
        let contract_block = self
            .contract
            .last_observed_block(&self.config.chain_id)
            .await?;
        Ok(point.number >= contract_block)
    }

    async fn submit_batch(&mut self, batch: SignedBatch) -> ChainOpsResult<()> {
        self.contract.submit_signed_batch(batch).await?;
        info!(chain = %self.config.chain_id, "submitted signed cardano batch");
        Ok(())
    }
}

/// Renders a change [`SumMap`] as one output to the given address.
fn sum_map_output(address: String, sums: &SumMap) -> TxOutput {
    let mut amount = 0;
    let mut tokens = Vec::new();
    for (asset, value) in sums.iter() {
        match asset {
            AssetId::Base => amount = *value,
            AssetId::Token { policy, name } => {
                tokens.push(TokenAmount::new(policy.clone(), name.clone(), *value));
            }
        }
    }
    TxOutput {
        address,
        amount,
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use corridor_primitives::chain::BlockPoint;
    use corridor_test_utils::gen::{
        committee_with, confirmed_transfer, seeded_wallet, utxo, utxo_with_token,
    };
    use corridor_tx_builder::cardano::address::CardanoNetwork;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    use super::*;
    use crate::traits::{
        CardanoWallet, MockBridgeContract, MockIndexer, MockSecretsManager, ProtocolParams,
    };

    const CHAIN: &str = "cardano-prime";
    const PARAMS: ProtocolParams = ProtocolParams {
        min_utxo: 1_000_000,
        max_tx_size: 16_384,
        batch_fee: 200_000,
    };

    fn config(kind: ChainKind, fixed_committee: Option<ValidatorTable>) -> CardanoOpsConfig {
        CardanoOpsConfig {
            chain_id: ChainId::from(CHAIN),
            kind,
            aggregator: AggregatorContext::reactor(CardanoNetwork::Testnet, PARAMS.min_utxo),
            slot_rounding_threshold: 60,
            no_batch_period_bps: 1_250,
            max_utxo_count: 50,
            max_fee_utxo_count: 4,
            take_at_least_utxo_count: None,
            fixed_committee,
        }
    }

    fn secrets(wallet: CardanoWallet) -> MockSecretsManager {
        let mut secrets = MockSecretsManager::new();
        secrets
            .expect_cardano_wallet()
            .returning(move |_| Ok(wallet));
        secrets
    }

    /// Indexer serving a healthy tip and funded multisig addresses.
    fn indexer(tip_slot: u64) -> MockIndexer {
        let mut indexer = MockIndexer::new();
        indexer
            .expect_latest_point()
            .returning(move || Ok(BlockPoint::new(tip_slot, Buf32([9; 32]))));
        indexer
            .expect_protocol_params()
            .returning(|| Ok(PARAMS));
        indexer.expect_utxos_at().returning(|_| {
            Ok(vec![
                utxo(1, 0, 80_000_000),
                utxo(2, 0, 30_000_000),
                utxo(3, 1, 5_000_000),
            ])
        });
        indexer
    }

    fn ops(
        kind: ChainKind,
        fixed: Option<ValidatorTable>,
        indexer: MockIndexer,
        faults: Option<Arc<FaultPlan>>,
    ) -> CardanoChainOperations {
        let (wallet, own_keys) = seeded_wallet(1);
        let fixed = fixed.or_else(|| {
            (kind == ChainKind::CardanoReactor).then(|| committee_with(own_keys, 3))
        });
        CardanoChainOperations::new(
            config(kind, fixed),
            Arc::new(MockBridgeContract::new()),
            Arc::new(indexer),
            &secrets(wallet),
            faults,
        )
        .unwrap()
    }

    fn transfers() -> Vec<ConfirmedTransaction> {
        vec![
            confirmed_transfer(CHAIN, 4, 2_000_000),
            confirmed_transfer(CHAIN, 5, 3_500_000),
        ]
    }

    #[tokio::test]
    async fn generation_is_deterministic() {
        let (_, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let ops = ops(ChainKind::CardanoSkyline, None, indexer(75), None);

        let first = ops
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap();
        let second = ops
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.batch_id, 7);
        assert_eq!(first.kind, BatchKind::Bridging);
    }

    #[tokio::test]
    async fn independent_validators_agree_on_the_bytes() {
        // The agreement that matters is between processes, not runs: two
        // validators holding different wallets must encode the same batch.
        let (wallet_a, keys_a) = seeded_wallet(1);
        let (wallet_b, keys_b) = seeded_wallet(2);
        let committee: ValidatorTable =
            [(0u32, keys_a), (1, keys_b), (2, seeded_wallet(3).1)]
                .into_iter()
                .collect();

        let make = |wallet: CardanoWallet| {
            CardanoChainOperations::new(
                config(ChainKind::CardanoSkyline, None),
                Arc::new(MockBridgeContract::new()),
                Arc::new(indexer(75)),
                &secrets(wallet),
                None,
            )
            .unwrap()
        };
        let ours = make(wallet_a);
        let theirs = make(wallet_b);

        let first = ours
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap();
        let second = theirs
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap();
        assert_eq!(first, second);

        // Each validator contributes its own witnesses over the shared hash.
        let sig_a = ours.sign_batch(&first).unwrap();
        let sig_b = theirs.sign_batch(&second).unwrap();
        assert_eq!(sig_a.tx_hash, sig_b.tx_hash);
        assert_ne!(sig_a.funds, sig_b.funds);
    }

    #[tokio::test]
    async fn tip_in_the_dead_zone_defers_the_batch() {
        let (_, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        // 66 % 60 = 6, inside 12.5% of the boundary.
        let ops = ops(ChainKind::CardanoSkyline, None, indexer(66), None);

        let err = ops
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap_err();

        assert!(matches!(err, ChainOpsError::NonActiveBatchPeriod { .. }));
        assert!(err.is_wait());
    }

    #[tokio::test]
    async fn own_keys_absent_from_live_committee_is_fatal() {
        let (_, stranger_keys) = seeded_wallet(99);
        let committee = committee_with(stranger_keys, 3);
        let ops = ops(ChainKind::CardanoSkyline, None, indexer(75), None);

        let err = ops
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
    }

    #[test]
    fn reactor_committee_excluding_own_keys_fails_at_construction() {
        let (wallet, _) = seeded_wallet(1);
        let (_, stranger_keys) = seeded_wallet(99);
        let committee = committee_with(stranger_keys, 3);

        let err = CardanoChainOperations::new(
            config(ChainKind::CardanoReactor, Some(committee)),
            Arc::new(MockBridgeContract::new()),
            Arc::new(indexer(75)),
            &secrets(wallet),
            None,
        )
        .map(|_| ())
        .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn scripted_fault_plan_forces_a_deferral() {
        let (_, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let faults = Arc::new(FaultPlan::with_ttl_failures(1));
        let ops = ops(
            ChainKind::CardanoSkyline,
            None,
            indexer(75),
            Some(faults),
        );

        let err = ops
            .generate_batch(7, &transfers(), &committee)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainOpsError::NonActiveBatchPeriod { .. }));

        // The plan is exhausted; the next attempt proceeds normally.
        ops.generate_batch(7, &transfers(), &committee)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn signatures_verify_against_both_multisig_keys() {
        let ops = ops(ChainKind::CardanoReactor, None, indexer(75), None);
        let tx = GeneratedBatchTx {
            batch_id: 1,
            raw_tx: vec![1, 2, 3],
            tx_hash: Buf32([5; 32]),
            kind: BatchKind::Bridging,
        };

        let signatures = ops.sign_batch(&tx).unwrap();

        let funds_vk = VerifyingKey::from_bytes(ops.own_keys.funds_key.as_bytes()).unwrap();
        let funds_sig = Signature::from_slice(&signatures.funds).unwrap();
        funds_vk.verify(tx.tx_hash.as_bytes(), &funds_sig).unwrap();

        let fee_vk = VerifyingKey::from_bytes(ops.own_keys.fee_key.as_bytes()).unwrap();
        let fee_sig = Signature::from_bytes(signatures.fee.unwrap().as_bytes());
        fee_vk.verify(tx.tx_hash.as_bytes(), &fee_sig).unwrap();
    }

    #[tokio::test]
    async fn synchronization_compares_indexer_against_contract() {
        let (_, own_keys) = seeded_wallet(1);
        let mut contract = MockBridgeContract::new();
        contract
            .expect_last_observed_block()
            .returning(|_| Ok(100));
        let ops = CardanoChainOperations::new(
            config(
                ChainKind::CardanoReactor,
                Some(committee_with(own_keys, 3)),
            ),
            Arc::new(contract),
            Arc::new(indexer(100)),
            &secrets(seeded_wallet(1).0),
            None,
        )
        .unwrap();

        assert!(ops.is_synchronized().await.unwrap());
    }

    #[tokio::test]
    async fn behind_indexer_reports_unsynchronized() {
        let (_, own_keys) = seeded_wallet(1);
        let mut contract = MockBridgeContract::new();
        contract
            .expect_last_observed_block()
            .returning(|_| Ok(200));
        let ops = CardanoChainOperations::new(
            config(
                ChainKind::CardanoReactor,
                Some(committee_with(own_keys, 3)),
            ),
            Arc::new(contract),
            Arc::new(indexer(100)),
            &secrets(seeded_wallet(1).0),
            None,
        )
        .unwrap();

        assert!(!ops.is_synchronized().await.unwrap());
    }

    #[tokio::test]
    async fn token_demand_pulls_token_inputs_into_the_batch() {
        use corridor_tx_builder::context::{TokenExchange, WrappedToken};

        let (wallet, own_keys) = seeded_wallet(1);
        let committee = committee_with(own_keys, 3);
        let policy_hex = "cc".repeat(28);

        let exchange: TokenExchange = [(
            ChainId::from(CHAIN),
            WrappedToken {
                policy: policy_hex.clone(),
                name: "wrapped".to_string(),
            },
        )]
        .into_iter()
        .collect();
        let mut cfg = config(ChainKind::CardanoSkyline, None);
        cfg.aggregator =
            AggregatorContext::skyline(CardanoNetwork::Testnet, PARAMS.min_utxo, exchange);

        let policies =
            resolve_policies(&committee, &own_keys, CardanoNetwork::Testnet).unwrap();
        let funds_address = policies.funds.address.clone();

        let mut indexer = MockIndexer::new();
        indexer
            .expect_latest_point()
            .returning(|| Ok(BlockPoint::new(75, Buf32([9; 32]))));
        indexer.expect_protocol_params().returning(|| Ok(PARAMS));
        let token_policy = policy_hex.clone();
        indexer.expect_utxos_at().returning(move |address| {
            if address == funds_address {
                Ok(vec![
                    utxo(1, 0, 90_000_000),
                    utxo_with_token(2, 0, 3_000_000, &token_policy, "wrapped", 50),
                ])
            } else {
                Ok(vec![utxo(8, 0, 4_000_000)])
            }
        });

        let ops = CardanoChainOperations::new(
            cfg,
            Arc::new(MockBridgeContract::new()),
            Arc::new(indexer),
            &secrets(wallet),
            None,
        )
        .unwrap();

        let mut transfer = confirmed_transfer(CHAIN, 4, 2_000_000);
        transfer.receivers[0].wrapped_amount = 30;
        let tx = ops
            .generate_batch(3, &[transfer], &committee)
            .await
            .unwrap();

        assert_eq!(tx.kind, BatchKind::Bridging);
        assert!(!tx.raw_tx.is_empty());
    }
}
