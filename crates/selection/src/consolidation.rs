//! Input allocation for out-of-band UTXO consolidation.
//!
//! Consolidation periodically sweeps validator-owned addresses whose UTXO
//! sets have grown too large. The global input budget is apportioned across
//! addresses proportionally to how many UTXOs each holds, with the remainder
//! going to the most fragmented addresses first. Rebuilt fresh every
//! consolidation cycle; nothing here is persisted.

use corridor_primitives::tx::Utxo;

/// One validator-owned address with the UTXOs eligible for consolidation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressConsolidationData {
    /// The address holding the UTXOs.
    pub address: String,
    /// Its spendable UTXOs, as reported by the indexer.
    pub utxos: Vec<Utxo>,
}

impl AddressConsolidationData {
    /// Creates a new group.
    pub fn new(address: impl Into<String>, utxos: Vec<Utxo>) -> Self {
        Self {
            address: address.into(),
            utxos,
        }
    }
}

/// Apportions `max_total` consolidation inputs across the given addresses.
///
/// When the combined UTXO count fits the budget, the groups are returned
/// unchanged. Otherwise each address receives a share proportional to its
/// UTXO count; leftover slots from rounding go one-by-one to the addresses
/// with the most UTXOs (stable address order on ties), and no address with at
/// least one UTXO ends up with zero slots. Within an address the smallest
/// UTXOs are kept, since those are the ones worth merging.
pub fn allocate_inputs_for_consolidation(
    groups: Vec<AddressConsolidationData>,
    max_total: usize,
) -> Vec<AddressConsolidationData> {
    let total: usize = groups.iter().map(|g| g.utxos.len()).sum();
    if total <= max_total || max_total == 0 {
        return groups;
    }

    let mut allocations: Vec<usize> = groups
        .iter()
        .map(|g| g.utxos.len() * max_total / total)
        .collect();
    let assigned: usize = allocations.iter().sum();

    // Hand out the rounding remainder, most-fragmented address first. Ties
    // resolve by position, which follows the caller's stable address order.
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| groups[b].utxos.len().cmp(&groups[a].utxos.len()).then(a.cmp(&b)));
    let mut remainder = max_total - assigned;
    for &idx in &order {
        if remainder == 0 {
            break;
        }
        if allocations[idx] < groups[idx].utxos.len() {
            allocations[idx] += 1;
            remainder -= 1;
        }
    }

    // An address that holds UTXOs must be able to consolidate at least one;
    // borrow a slot from the largest allocation to make that true.
    for idx in 0..groups.len() {
        if allocations[idx] == 0 && !groups[idx].utxos.is_empty() {
            if let Some(donor) = (0..groups.len())
                .filter(|&d| allocations[d] > 1)
                .max_by(|&a, &b| allocations[a].cmp(&allocations[b]).then(b.cmp(&a)))
            {
                allocations[donor] -= 1;
                allocations[idx] += 1;
            }
        }
    }

    groups
        .into_iter()
        .zip(allocations)
        .map(|(mut group, allocation)| {
            group.utxos.sort_by(|a, b| {
                a.amount
                    .cmp(&b.amount)
                    .then_with(|| a.tx_hash.cmp(&b.tx_hash))
                    .then_with(|| a.output_index.cmp(&b.output_index))
            });
            group.utxos.truncate(allocation);
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use corridor_primitives::buf::Buf32;

    use super::*;

    fn utxos(count: usize, tag: u8) -> Vec<Utxo> {
        (0..count)
            .map(|i| Utxo {
                tx_hash: Buf32([tag; 32]),
                output_index: i as u32,
                amount: 1_000 + i as u64,
                tokens: Vec::new(),
            })
            .collect()
    }

    fn counts(groups: &[AddressConsolidationData]) -> Vec<usize> {
        groups.iter().map(|g| g.utxos.len()).collect()
    }

    #[test]
    fn under_budget_returns_inputs_unchanged() {
        let groups = vec![
            AddressConsolidationData::new("addr_a", utxos(5, 1)),
            AddressConsolidationData::new("addr_b", utxos(10, 2)),
            AddressConsolidationData::new("addr_c", utxos(20, 3)),
        ];
        let original = groups.clone();

        let allocated = allocate_inputs_for_consolidation(groups, 50);
        assert_eq!(allocated, original);
    }

    #[test]
    fn over_budget_allocates_proportionally() {
        let groups = vec![
            AddressConsolidationData::new("addr_a", utxos(10, 1)),
            AddressConsolidationData::new("addr_b", utxos(20, 2)),
            AddressConsolidationData::new("addr_c", utxos(30, 3)),
        ];

        let allocated = allocate_inputs_for_consolidation(groups, 50);

        let allocation = counts(&allocated);
        assert_eq!(allocation.iter().sum::<usize>(), 50);
        // Floors are 8/16/25; the leftover slot lands on the address with the
        // most UTXOs.
        assert_eq!(allocation, vec![8, 16, 26]);
    }

    #[test]
    fn no_allocation_exceeds_available_utxos() {
        let groups = vec![
            AddressConsolidationData::new("addr_a", utxos(2, 1)),
            AddressConsolidationData::new("addr_b", utxos(60, 2)),
        ];

        let allocated = allocate_inputs_for_consolidation(groups, 40);

        let allocation = counts(&allocated);
        assert_eq!(allocation.iter().sum::<usize>(), 40);
        assert!(allocation[0] <= 2);
        assert!(allocation[1] <= 60);
    }

    #[test]
    fn single_utxo_address_is_never_starved() {
        let groups = vec![
            AddressConsolidationData::new("addr_a", utxos(1, 1)),
            AddressConsolidationData::new("addr_b", utxos(99, 2)),
        ];

        let allocated = allocate_inputs_for_consolidation(groups, 10);

        let allocation = counts(&allocated);
        assert_eq!(allocation.iter().sum::<usize>(), 10);
        assert_eq!(allocation[0], 1);
    }

    #[test]
    fn smallest_utxos_are_kept_for_merging() {
        let mut many = utxos(4, 1);
        many[0].amount = 5_000;
        many[1].amount = 10;
        many[2].amount = 7_000;
        many[3].amount = 20;
        let groups = vec![
            AddressConsolidationData::new("addr_a", many),
            AddressConsolidationData::new("addr_b", utxos(4, 2)),
        ];

        let allocated = allocate_inputs_for_consolidation(groups, 4);

        let kept: Vec<u64> = allocated[0].utxos.iter().map(|u| u.amount).collect();
        assert_eq!(kept, vec![10, 20]);
    }
}
