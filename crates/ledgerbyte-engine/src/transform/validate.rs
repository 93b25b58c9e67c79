//! Validation gate: stable partition of cleaned records.

use ledgerbyte_types::record::{AcceptedRecord, CleanedRecord, RejectedRecord};
use rayon::prelude::*;

use super::rules::SchemaContract;

/// Both sides of the partition, each in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateOutcome {
    pub accepted: Vec<AcceptedRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Admit or reject every record against `contract`.
///
/// Batches larger than `parallel_threshold` are evaluated on the rayon pool.
/// Output order is the input order either way.
#[must_use]
pub fn validate(
    records: Vec<CleanedRecord>,
    contract: &SchemaContract,
    parallel_threshold: usize,
) -> GateOutcome {
    let admissions: Vec<Result<AcceptedRecord, RejectedRecord>> =
        if records.len() > parallel_threshold {
            records
                .into_par_iter()
                .map(|record| contract.admit(record))
                .collect()
        } else {
            records
                .into_iter()
                .map(|record| contract.admit(record))
                .collect()
        };

    let mut outcome = GateOutcome {
        accepted: Vec::with_capacity(admissions.len()),
        rejected: Vec::new(),
    };
    for admission in admissions {
        match admission {
            Ok(accepted) => outcome.accepted.push(accepted),
            Err(rejected) => outcome.rejected.push(rejected),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(order_id: i64) -> CleanedRecord {
        CleanedRecord {
            order_id,
            customer_key: Some(format!("CUST_{order_id}")),
            customer_name: "Ann".into(),
            region: "EU".into(),
            price_usd: 10.0,
            quantity: 1,
            total_sale: 10.0,
            creation_timestamp: "2024-01-15 10:30:00".into(),
        }
    }

    fn interleaved(n: i64) -> Vec<CleanedRecord> {
        (0..n)
            .map(|i| cleaned(if i % 3 == 0 { 900 + i } else { 2000 + i }))
            .collect()
    }

    #[test]
    fn partition_is_disjoint_and_stable() {
        let outcome = validate(interleaved(9), &SchemaContract::default(), 10_000);
        let accepted: Vec<i64> = outcome.accepted.iter().map(|r| r.order_id).collect();
        let rejected: Vec<i64> = outcome.rejected.iter().map(|r| r.order_id()).collect();
        assert_eq!(accepted, vec![2001, 2002, 2004, 2005, 2007, 2008]);
        assert_eq!(rejected, vec![900, 903, 906]);
    }

    #[test]
    fn parallel_path_matches_sequential_path() {
        let contract = SchemaContract::default();
        let sequential = validate(interleaved(500), &contract, usize::MAX);
        let parallel = validate(interleaved(500), &contract, 1);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn empty_input_is_empty_outcome() {
        let outcome = validate(Vec::new(), &SchemaContract::default(), 1);
        assert_eq!(outcome, GateOutcome::default());
    }
}
