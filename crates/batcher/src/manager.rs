//! Composition of per-chain batching loops.

use tokio::sync::watch;
use tracing::{error, info};

use crate::{
    batcher::Batcher,
    errors::{BatcherError, BatcherResult},
};

/// Owns one [`Batcher`] per configured chain.
///
/// Pure lifecycle: spawn every loop on the runtime, propagate shutdown, join
/// them all. Loops are independent; one chain failing fatally does not stop
/// the others, it only surfaces once everything has wound down.
#[derive(Debug)]
pub struct BatcherManager {
    batchers: Vec<Batcher>,
}

impl BatcherManager {
    /// Wraps the given loops.
    pub fn new(batchers: Vec<Batcher>) -> Self {
        Self { batchers }
    }

    /// Number of chains under management.
    pub fn len(&self) -> usize {
        self.batchers.len()
    }

    /// Whether no chains are configured.
    pub fn is_empty(&self) -> bool {
        self.batchers.is_empty()
    }

    /// Runs every loop until shutdown, returning the first fatal error seen.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> BatcherResult<()> {
        info!(chains = self.batchers.len(), "starting batcher manager");

        let handles: Vec<_> = self
            .batchers
            .into_iter()
            .map(|batcher| tokio::spawn(batcher.run(shutdown.clone())))
            .collect();

        let mut first_err = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%err, "batcher loop terminated with error");
                    first_err.get_or_insert(err);
                }
                Err(join_err) => {
                    error!(%join_err, "batcher task panicked");
                    first_err.get_or_insert(BatcherError::Panicked(join_err.to_string()));
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use corridor_chain_ops::{ChainOpsError, RpcError};
    use corridor_primitives::chain::ChainId;
    use corridor_test_utils::bridge::{BridgeState, InMemoryBridge};

    use super::*;
    use crate::batcher::OpsFactory;

    fn idle_batcher(chain: &str) -> Batcher {
        let bridge = InMemoryBridge::new(BridgeState::default());
        // A factory that never manages to build clients keeps the loop
        // ticking harmlessly until shutdown.
        let factory: OpsFactory =
            Box::new(|| Err(ChainOpsError::Rpc(RpcError::new("backend offline"))));
        Batcher::new(
            ChainId::from(chain),
            Duration::from_millis(10),
            bridge,
            factory,
        )
    }

    #[tokio::test]
    async fn shutdown_stops_every_loop() {
        let manager = BatcherManager::new(vec![idle_batcher("chain-a"), idle_batcher("chain-b")]);
        assert_eq!(manager.len(), 2);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(manager.run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        handle.await.unwrap().unwrap();
    }
}
