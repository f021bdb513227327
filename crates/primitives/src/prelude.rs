//! Re-exports of the types used by nearly every consumer.

pub use crate::{
    asset::{AssetId, SumMap, TokenAmount},
    batch::{BatchKind, BatchSignatures, GeneratedBatchTx},
    bridge::{ValidatorIdx, ValidatorKeys, ValidatorTable},
    buf::{Buf32, Buf64},
    chain::{BlockPoint, ChainId, ChainKind},
    errors::{AmountError, ParseError},
    rounding::{round_with_threshold, RoundingError},
    tx::{BridgeReceiver, ConfirmedTransaction, TransactionType, TxInput, TxInputs, TxOutput, Utxo},
};
