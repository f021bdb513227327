//! The core selection algorithm.
//!
//! Selection runs in deficit rounds: while any asset demand is uncovered,
//! the round targets the asset with the largest remaining deficit and picks
//! inputs for it using a deterministic strategy stack:
//!
//! 1. bounded branch-and-bound search for an exact subset match,
//! 2. the single smallest input above the missing amount,
//! 3. largest-first accumulation.
//!
//! A final prune drops inputs made redundant by later rounds, and an optional
//! take-at-least pad deliberately sweeps additional small inputs for
//! consolidation. Every ordering has an explicit tie-break on
//! `(tx_hash, output_index)` so independent validators converge on the same
//! subset in the same order.

use corridor_primitives::{
    asset::{AssetId, SumMap},
    tx::{TxInput, TxInputs, Utxo},
};

use crate::errors::{SelectionError, SelectionResult};

/// Upper bound on nodes visited by the exact-match search before falling back
/// to the accumulation strategies.
const MAX_EXACT_SEARCH_NODES: usize = 100_000;

/// A chosen input subset and its per-asset total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Chosen UTXOs, in pick order.
    pub utxos: Vec<Utxo>,
    /// Combined holdings of the chosen UTXOs.
    pub total: SumMap,
}

/// Sums a UTXO set into one [`SumMap`].
pub fn sum_utxos(utxos: &[Utxo]) -> SelectionResult<SumMap> {
    let mut sums = SumMap::new();
    for utxo in utxos {
        sums.merge(&utxo.asset_sums()?)?;
    }
    Ok(sums)
}

/// Derives the change a batch will return: `available - planned`.
///
/// Underflow means the planned outputs exceed the inputs and is an error, not
/// a saturation.
pub fn expected_change(available: &SumMap, planned: &SumMap) -> SelectionResult<SumMap> {
    Ok(available.checked_sub(planned)?)
}

/// Converts a chosen subset into chain-native inputs plus their total,
/// preserving the given order.
pub fn into_tx_inputs(utxos: &[Utxo]) -> SelectionResult<TxInputs> {
    Ok(TxInputs {
        inputs: utxos.iter().map(TxInput::from).collect(),
        sum: sum_utxos(utxos)?,
    })
}

/// Selects a subset of `candidates` whose holdings cover `desired` for every
/// asset simultaneously.
///
/// `max_utxo_count` bounds how many inputs the batch may consume.
/// `take_at_least`, when set, pads the result up to that many inputs with the
/// smallest unused candidates; it never shrinks a sum-satisfying subset and
/// is capped by both the budget and the candidate count.
pub fn select_utxos(
    candidates: &[Utxo],
    desired: &SumMap,
    max_utxo_count: usize,
    take_at_least: Option<usize>,
) -> SelectionResult<Selection> {
    if candidates.is_empty() {
        return Err(SelectionError::NoInputs);
    }

    // Global sufficiency first: report the first uncoverable asset in asset
    // order rather than failing deep inside a round.
    let available = sum_utxos(candidates)?;
    for (asset, needed) in desired.iter() {
        let have = available.get(asset);
        if have < *needed {
            return Err(SelectionError::InsufficientFunds {
                asset: asset.to_string(),
                needed: *needed,
                available: have,
            });
        }
    }

    // Canonical working order: amount descending, then (tx_hash, index).
    let mut pool: Vec<Utxo> = candidates.to_vec();
    pool.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.tx_hash.cmp(&b.tx_hash))
            .then_with(|| a.output_index.cmp(&b.output_index))
    });

    let mut used = vec![false; pool.len()];
    let mut chosen: Vec<usize> = Vec::new();
    let mut supply = SumMap::new();

    while let Some((target_asset, missing)) = largest_deficit(&supply, desired) {
        let budget_left = max_utxo_count.saturating_sub(chosen.len());
        if budget_left == 0 {
            return Err(SelectionError::UtxoCountExceeded {
                max: max_utxo_count,
            });
        }

        let picks = pick_for_asset(&pool, &used, &target_asset, missing, budget_left).map_err(
            |err| match err {
                // Rounds after the first see only the leftover budget; report
                // the configured maximum to the caller.
                SelectionError::UtxoCountExceeded { .. } => SelectionError::UtxoCountExceeded {
                    max: max_utxo_count,
                },
                other => other,
            },
        )?;
        for idx in picks {
            used[idx] = true;
            supply.merge(&pool[idx].asset_sums()?)?;
            chosen.push(idx);
        }
    }

    // Prune inputs made redundant by later rounds, newest first, so the
    // surviving subset is minimal for the demand it covers.
    let mut keep = chosen.clone();
    let mut i = keep.len();
    while i > 0 {
        i -= 1;
        let without = supply.checked_sub(&pool[keep[i]].asset_sums()?)?;
        if without.covers(desired) {
            used[keep[i]] = false;
            supply = without;
            keep.remove(i);
        }
    }
    let mut chosen = keep;

    if let Some(floor) = take_at_least {
        let target = floor.min(max_utxo_count).min(pool.len());
        if chosen.len() < target {
            pad_with_smallest(&pool, &mut used, &mut chosen, &mut supply, target)?;
        }
    }

    Ok(Selection {
        utxos: chosen.iter().map(|&idx| pool[idx].clone()).collect(),
        total: supply,
    })
}

/// The asset with the largest uncovered demand, ties broken by asset order.
fn largest_deficit(supply: &SumMap, desired: &SumMap) -> Option<(AssetId, u64)> {
    let mut best: Option<(AssetId, u64)> = None;
    for (asset, needed) in desired.iter() {
        let missing = needed.saturating_sub(supply.get(asset));
        if missing == 0 {
            continue;
        }
        match &best {
            Some((_, best_missing)) if *best_missing >= missing => {}
            _ => best = Some((asset.clone(), missing)),
        }
    }
    best
}

/// Amount of `asset` held by one UTXO.
fn asset_amount(utxo: &Utxo, asset: &AssetId) -> u64 {
    match asset {
        AssetId::Base => utxo.amount,
        AssetId::Token { .. } => utxo
            .tokens
            .iter()
            .find(|token| token.asset_id() == *asset)
            .map(|token| token.amount)
            .unwrap_or(0),
    }
}

/// Picks pool indices that cover `missing` of `asset`, within `budget_left`.
fn pick_for_asset(
    pool: &[Utxo],
    used: &[bool],
    asset: &AssetId,
    missing: u64,
    budget_left: usize,
) -> SelectionResult<Vec<usize>> {
    // Candidates are unused inputs carrying the asset, ordered by that
    // asset's amount descending with the usual tie-break.
    let mut candidates: Vec<usize> = (0..pool.len())
        .filter(|&i| !used[i] && asset_amount(&pool[i], asset) > 0)
        .collect();
    candidates.sort_by(|&a, &b| {
        asset_amount(&pool[b], asset)
            .cmp(&asset_amount(&pool[a], asset))
            .then_with(|| pool[a].tx_hash.cmp(&pool[b].tx_hash))
            .then_with(|| pool[a].output_index.cmp(&pool[b].output_index))
    });

    let amounts: Vec<u64> = candidates
        .iter()
        .map(|&i| asset_amount(&pool[i], asset))
        .collect();

    // 1. Exact subset match within the budget.
    if let Some(subset) = exact_subset(&amounts, missing, budget_left) {
        return Ok(subset.into_iter().map(|i| candidates[i]).collect());
    }

    // 2. The single smallest input covering the whole amount on its own.
    if let Some(pos) = candidates
        .iter()
        .enumerate()
        .rev()
        .find(|&(i, _)| amounts[i] >= missing)
        .map(|(i, _)| i)
    {
        return Ok(vec![candidates[pos]]);
    }

    // 3. Largest-first accumulation.
    let mut picked = Vec::new();
    let mut sum: u64 = 0;
    for (i, &amount) in amounts.iter().enumerate() {
        if picked.len() >= budget_left {
            return Err(SelectionError::UtxoCountExceeded { max: budget_left });
        }
        picked.push(candidates[i]);
        sum = sum.saturating_add(amount);
        if sum >= missing {
            return Ok(picked);
        }
    }

    // The global sufficiency check guarantees the asset exists somewhere in
    // the unused pool, so running out of candidates means the budget was the
    // binding constraint all along.
    Err(SelectionError::UtxoCountExceeded { max: budget_left })
}

/// Bounded depth-first search for a subset of `amounts` summing exactly to
/// `target`, using at most `max_len` elements.
///
/// Prefers fewer elements, then the earliest candidates in the given order.
/// Gives up (returns `None`) once the node budget is exhausted.
fn exact_subset(amounts: &[u64], target: u64, max_len: usize) -> Option<Vec<usize>> {
    if target == 0 || amounts.is_empty() || max_len == 0 {
        return None;
    }

    // Suffix sums let the search prune branches that cannot reach the target.
    let mut suffix = vec![0u128; amounts.len() + 1];
    for i in (0..amounts.len()).rev() {
        suffix[i] = suffix[i + 1] + amounts[i] as u128;
    }

    struct Search<'a> {
        amounts: &'a [u64],
        suffix: &'a [u128],
        target: u64,
        max_len: usize,
        nodes: usize,
        current: Vec<usize>,
        best: Option<Vec<usize>>,
    }

    impl Search<'_> {
        fn run(&mut self, index: usize, sum: u64) -> bool {
            self.nodes += 1;
            if self.nodes > MAX_EXACT_SEARCH_NODES {
                return false;
            }
            if sum == self.target {
                let better = match &self.best {
                    None => true,
                    Some(best) => {
                        self.current.len() < best.len()
                            || (self.current.len() == best.len() && self.current < *best)
                    }
                };
                if better {
                    self.best = Some(self.current.clone());
                }
                return true;
            }
            if index >= self.amounts.len()
                || sum > self.target
                || self.current.len() >= self.max_len
            {
                return true;
            }
            if (sum as u128) + self.suffix[index] < self.target as u128 {
                return true;
            }

            let with = sum.saturating_add(self.amounts[index]);
            if with <= self.target {
                self.current.push(index);
                if !self.run(index + 1, with) {
                    return false;
                }
                self.current.pop();
            }
            self.run(index + 1, sum)
        }
    }

    let mut search = Search {
        amounts,
        suffix: &suffix,
        target,
        max_len,
        nodes: 0,
        current: Vec::new(),
        best: None,
    };
    // A node-budget overrun discards partial results: a truncated search is
    // not deterministic evidence that no exact match exists, but falling back
    // is, as long as every validator truncates at the same point.
    if search.run(0, 0) {
        search.best
    } else {
        None
    }
}

/// Pads the selection with the smallest unused inputs up to `target` inputs.
fn pad_with_smallest(
    pool: &[Utxo],
    used: &mut [bool],
    chosen: &mut Vec<usize>,
    supply: &mut SumMap,
    target: usize,
) -> SelectionResult<()> {
    let mut unused: Vec<usize> = (0..pool.len()).filter(|&i| !used[i]).collect();
    unused.sort_by(|&a, &b| {
        pool[a]
            .amount
            .cmp(&pool[b].amount)
            .then_with(|| pool[a].tx_hash.cmp(&pool[b].tx_hash))
            .then_with(|| pool[a].output_index.cmp(&pool[b].output_index))
    });

    for idx in unused {
        if chosen.len() >= target {
            break;
        }
        used[idx] = true;
        supply.merge(&pool[idx].asset_sums()?)?;
        chosen.push(idx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use corridor_primitives::{asset::TokenAmount, buf::Buf32};

    use super::*;

    fn utxo(tag: u8, index: u32, amount: u64) -> Utxo {
        Utxo {
            tx_hash: Buf32([tag; 32]),
            output_index: index,
            amount,
            tokens: Vec::new(),
        }
    }

    fn utxo_with_token(tag: u8, index: u32, amount: u64, token: u64) -> Utxo {
        Utxo {
            tx_hash: Buf32([tag; 32]),
            output_index: index,
            amount,
            tokens: vec![TokenAmount::new("p0", "gold", token)],
        }
    }

    fn base_desired(amount: u64) -> SumMap {
        [(AssetId::Base, amount)].into_iter().collect()
    }

    #[test]
    fn exact_match_is_preferred() {
        let candidates = vec![utxo(1, 0, 700), utxo(2, 0, 300), utxo(3, 0, 500)];

        let selection = select_utxos(&candidates, &base_desired(800), 10, None).unwrap();

        // 300 + 500 hits the target exactly; the greedy 700-first route would
        // have left surplus.
        let amounts: Vec<u64> = selection.utxos.iter().map(|u| u.amount).collect();
        assert_eq!(amounts, vec![500, 300]);
        assert_eq!(selection.total.get(&AssetId::Base), 800);
    }

    #[test]
    fn never_returns_a_shortfall_subset() {
        let candidates = vec![utxo(1, 0, 100), utxo(2, 0, 250)];

        let err = select_utxos(&candidates, &base_desired(400), 10, None).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientFunds {
                asset: "base".to_string(),
                needed: 400,
                available: 350,
            }
        );
    }

    #[test]
    fn selection_is_deterministic_regardless_of_input_order() {
        let mut candidates = vec![
            utxo(5, 1, 120),
            utxo(1, 0, 700),
            utxo(9, 3, 120),
            utxo(2, 2, 300),
            utxo(7, 0, 55),
        ];

        let first = select_utxos(&candidates, &base_desired(400), 10, None).unwrap();
        candidates.reverse();
        let second = select_utxos(&candidates, &base_desired(400), 10, None).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn token_demand_is_not_ignored() {
        // Plenty of base asset in token-free inputs, but the token demand can
        // only be met by the token-carrying input.
        let candidates = vec![
            utxo(1, 0, 10_000),
            utxo_with_token(2, 0, 1_500, 40),
            utxo(3, 0, 9_000),
        ];
        let desired: SumMap = [
            (AssetId::Base, 2_000u64),
            (AssetId::token("p0", "gold"), 30u64),
        ]
        .into_iter()
        .collect();

        let selection = select_utxos(&candidates, &desired, 10, None).unwrap();

        assert!(selection.total.covers(&desired));
        assert!(selection
            .utxos
            .iter()
            .any(|u| !u.tokens.is_empty()), "token input must be part of the subset");
    }

    #[test]
    fn insufficient_token_is_reported_per_asset() {
        let candidates = vec![utxo_with_token(1, 0, 5_000, 10)];
        let desired: SumMap = [
            (AssetId::Base, 1_000u64),
            (AssetId::token("p0", "gold"), 25u64),
        ]
        .into_iter()
        .collect();

        let err = select_utxos(&candidates, &desired, 10, None).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientFunds {
                asset: "p0.gold".to_string(),
                needed: 25,
                available: 10,
            }
        );
    }

    #[test]
    fn count_budget_is_a_distinct_error() {
        let candidates = vec![utxo(1, 0, 100), utxo(2, 0, 100), utxo(3, 0, 100)];

        let err = select_utxos(&candidates, &base_desired(300), 2, None).unwrap_err();
        assert!(matches!(err, SelectionError::UtxoCountExceeded { .. }));
    }

    #[test]
    fn take_at_least_pads_but_never_shrinks() {
        let candidates = vec![
            utxo(1, 0, 900),
            utxo(2, 0, 10),
            utxo(3, 0, 20),
            utxo(4, 0, 30),
        ];

        let selection = select_utxos(&candidates, &base_desired(850), 10, Some(3)).unwrap();
        assert_eq!(selection.utxos.len(), 3);
        // The sum-satisfying pick stays; the two smallest pad it out.
        let amounts: Vec<u64> = selection.utxos.iter().map(|u| u.amount).collect();
        assert_eq!(amounts, vec![900, 10, 20]);

        // The floor is advisory upward only: a satisfying subset larger than
        // the floor is left alone.
        let selection = select_utxos(&candidates, &base_desired(850), 10, Some(1)).unwrap();
        assert_eq!(selection.utxos.len(), 1);
    }

    #[test]
    fn take_at_least_respects_the_count_budget() {
        let candidates = vec![utxo(1, 0, 500), utxo(2, 0, 5), utxo(3, 0, 5)];

        let selection = select_utxos(&candidates, &base_desired(100), 2, Some(5)).unwrap();
        assert_eq!(selection.utxos.len(), 2);
    }

    #[test]
    fn empty_candidates_is_no_inputs() {
        assert_eq!(
            select_utxos(&[], &base_desired(1), 10, None).unwrap_err(),
            SelectionError::NoInputs
        );
    }

    #[test]
    fn into_tx_inputs_preserves_order() {
        let utxos = vec![utxo(9, 2, 50), utxo(1, 0, 10)];

        let inputs = into_tx_inputs(&utxos).unwrap();

        assert_eq!(inputs.inputs[0].tx_hash, Buf32([9; 32]));
        assert_eq!(inputs.inputs[1].tx_hash, Buf32([1; 32]));
        assert_eq!(inputs.sum.get(&AssetId::Base), 60);
    }

    #[test]
    fn expected_change_subtracts_planned_outputs() {
        let available: SumMap = [(AssetId::Base, 1_000u64)].into_iter().collect();
        let planned: SumMap = [(AssetId::Base, 750u64)].into_iter().collect();

        let change = expected_change(&available, &planned).unwrap();
        assert_eq!(change.get(&AssetId::Base), 250);
    }
}
