//! The transform stage: merge, repair, derive, validate.
//!
//! [`clean_and_transform`] is the single entry point. It owns its inputs,
//! performs no I/O and reports to the caller's [`DiagnosticsSink`].

pub mod derive;
pub mod merge;
pub mod repair;
pub mod rules;
pub mod validate;

use ledgerbyte_types::error::TransformError;
use ledgerbyte_types::record::{AcceptedRecord, RawTables, RejectedRecord};
use serde::Serialize;

use crate::diagnostics::{DiagnosticEvent, DiagnosticsSink};

pub use rules::{parse_timestamp, SchemaContract, DEFAULT_MIN_ORDER_ID};

/// Rows above which validation fans out to the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Tunables of one transform invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// `order_id` must be strictly greater than this.
    pub min_order_id: i64,
    pub parallel_threshold: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            min_order_id: DEFAULT_MIN_ORDER_ID,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Counts reported by a completed transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub input_orders: usize,
    pub unmatched_orders: usize,
    pub duplicates_removed: usize,
    pub quantities_imputed: usize,
    pub regions_imputed: usize,
    pub customer_names_imputed: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Clean output, rejections and counts of one transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub accepted: Vec<AcceptedRecord>,
    pub rejected: Vec<RejectedRecord>,
    pub report: TransformReport,
}

/// Turn the two raw tables into validated analytics records.
///
/// # Errors
///
/// Returns a [`TransformError`] when the customer set holds a duplicate
/// key. Per-record problems never fail the call; they come back in
/// [`TransformOutput::rejected`].
pub fn clean_and_transform(
    tables: RawTables,
    options: &TransformOptions,
    sink: &mut dyn DiagnosticsSink,
) -> Result<TransformOutput, TransformError> {
    let input_orders = tables.orders.len();

    let merged = merge::merge(tables.orders, tables.customers)?;
    sink.emit(DiagnosticEvent::Merged {
        orders: input_orders,
        unmatched: merged.unmatched,
    });

    let (repaired, counts) = repair::repair(merged.records);
    sink.emit(DiagnosticEvent::DuplicatesRemoved {
        count: counts.duplicates_removed,
    });
    for (field, count) in [
        ("quantity", counts.quantities_imputed),
        ("region", counts.regions_imputed),
        ("customer_name", counts.customer_names_imputed),
    ] {
        sink.emit(DiagnosticEvent::Imputed { field, count });
    }

    let cleaned = derive::derive_all(repaired);
    let contract = SchemaContract::new(options.min_order_id);
    let outcome = validate::validate(cleaned, &contract, options.parallel_threshold);

    for rejected in &outcome.rejected {
        sink.emit(DiagnosticEvent::Rejected {
            order_id: rejected.order_id(),
            reason: rejected.reason(),
        });
    }
    sink.emit(DiagnosticEvent::ValidationSummary {
        accepted: outcome.accepted.len(),
        rejected: outcome.rejected.len(),
    });

    let report = TransformReport {
        input_orders,
        unmatched_orders: merged.unmatched,
        duplicates_removed: counts.duplicates_removed,
        quantities_imputed: counts.quantities_imputed,
        regions_imputed: counts.regions_imputed,
        customer_names_imputed: counts.customer_names_imputed,
        accepted: outcome.accepted.len(),
        rejected: outcome.rejected.len(),
    };

    Ok(TransformOutput {
        accepted: outcome.accepted,
        rejected: outcome.rejected,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use ledgerbyte_types::record::{
        RawCustomer, RawOrder, INVALID_CUSTOMER, MISSING_ORDER_ID, UNKNOWN_REGION,
    };
    use ledgerbyte_types::rule::RuleId;

    fn order(order_id: i64, key: &str, raw_price: f64, quantity: Option<i64>) -> RawOrder {
        RawOrder {
            order_id,
            customer_key: Some(key.into()),
            raw_price,
            quantity,
            creation_timestamp: "2024-01-15 10:30:00".into(),
        }
    }

    fn customer(key: &str, name: &str, region: Option<&str>) -> RawCustomer {
        RawCustomer {
            customer_key: key.into(),
            customer_name: name.into(),
            region: region.map(Into::into),
            email_address: Some(format!("{}@example.com", key.to_lowercase())),
        }
    }

    fn run(tables: RawTables) -> (TransformOutput, RecordingSink) {
        let mut sink = RecordingSink::new();
        let output = clean_and_transform(tables, &TransformOptions::default(), &mut sink).unwrap();
        (output, sink)
    }

    #[test]
    fn duplicate_order_keeps_first_occurrence() {
        let (output, sink) = run(RawTables {
            orders: vec![
                order(1049, "CUST_001", 50.0, Some(2)),
                order(1049, "CUST_001", 75.0, Some(4)),
            ],
            customers: vec![customer("CUST_001", "Ann", Some("EU"))],
        });

        assert_eq!(output.report.duplicates_removed, 1);
        assert_eq!(output.accepted.len(), 1);
        assert!((output.accepted[0].total_sale - 100.0).abs() < 1e-3);
        assert!(sink
            .events
            .contains(&DiagnosticEvent::DuplicatesRemoved { count: 1 }));
    }

    #[test]
    fn negative_price_and_missing_quantity_are_repaired() {
        let (output, sink) = run(RawTables {
            orders: vec![order(1200, "CUST_001", -20.0, None)],
            customers: vec![customer("CUST_001", "Ann", Some("EU"))],
        });

        let record = &output.accepted[0];
        assert!((record.price_usd - 20.0).abs() < f64::EPSILON);
        assert_eq!(record.quantity, 1);
        assert!((record.total_sale - 20.0).abs() < 1e-3);
        assert_eq!(sink.imputed("quantity"), Some(1));
    }

    #[test]
    fn unknown_customer_is_flagged_not_dropped() {
        let (output, _) = run(RawTables {
            orders: vec![
                order(1100, "CUST_999", 30.0, Some(1)),
                order(1101, "CUST_001", 30.0, Some(1)),
            ],
            customers: vec![customer("CUST_001", "Ann", None)],
        });

        assert_eq!(output.report.unmatched_orders, 1);
        assert_eq!(output.accepted[0].customer_name, INVALID_CUSTOMER);
        assert_eq!(output.accepted[0].region, UNKNOWN_REGION);
        assert_eq!(output.accepted[1].region, UNKNOWN_REGION);
        assert_eq!(output.report.regions_imputed, 2);
    }

    #[test]
    fn low_order_id_is_rejected_with_reason() {
        let (output, sink) = run(RawTables {
            orders: vec![
                order(500, "CUST_001", 30.0, Some(1)),
                order(1001, "CUST_001", 30.0, Some(1)),
            ],
            customers: vec![customer("CUST_001", "Ann", Some("EU"))],
        });

        assert_eq!(output.report.accepted, 1);
        assert_eq!(output.report.rejected, 1);
        assert_eq!(output.rejected[0].violations[0].rule, RuleId::OrderIdThreshold);
        assert!(output.rejected[0].reason().contains("order_id"));
        assert_eq!(sink.rejected_order_ids(), vec![500]);
        assert_eq!(
            sink.events.last(),
            Some(&DiagnosticEvent::ValidationSummary {
                accepted: 1,
                rejected: 1,
            })
        );
    }

    #[test]
    fn empty_customer_fields_are_accepted() {
        let (output, sink) = run(RawTables {
            orders: vec![order(1001, "CUST_001", 30.0, Some(1))],
            customers: vec![customer("CUST_001", "", Some(""))],
        });

        assert_eq!(output.report.accepted, 1);
        assert_eq!(output.report.rejected, 0);
        assert_eq!(output.accepted[0].customer_name, "");
        assert_eq!(output.accepted[0].region, UNKNOWN_REGION);
        assert_eq!(sink.imputed("region"), Some(1));
    }

    #[test]
    fn keyless_order_is_rejected_not_dropped() {
        let mut keyless = order(1002, "CUST_001", 30.0, Some(1));
        keyless.customer_key = None;
        let (output, _) = run(RawTables {
            orders: vec![order(1001, "CUST_001", 30.0, Some(1)), keyless],
            customers: vec![customer("CUST_001", "Ann", Some("EU"))],
        });

        assert_eq!(output.report.unmatched_orders, 1);
        assert_eq!(output.report.accepted, 1);
        assert_eq!(output.rejected[0].order_id(), 1002);
        assert_eq!(output.rejected[0].violations[0].rule, RuleId::CustomerKeyPresent);
        assert_eq!(output.rejected[0].record.customer_name, INVALID_CUSTOMER);
    }

    #[test]
    fn missing_order_id_is_rejected_and_counted() {
        let (output, sink) = run(RawTables {
            orders: vec![
                order(MISSING_ORDER_ID, "CUST_001", 30.0, Some(1)),
                order(1001, "CUST_001", 30.0, Some(1)),
            ],
            customers: vec![customer("CUST_001", "Ann", Some("EU"))],
        });

        assert_eq!(output.report.accepted, 1);
        assert_eq!(output.report.rejected, 1);
        assert_eq!(output.rejected[0].violations[0].rule, RuleId::OrderIdThreshold);
        assert_eq!(sink.rejected_order_ids(), vec![MISSING_ORDER_ID]);
    }

    #[test]
    fn duplicate_customer_key_fails_the_transform() {
        let mut sink = RecordingSink::new();
        let err = clean_and_transform(
            RawTables {
                orders: vec![order(1001, "CUST_001", 1.0, Some(1))],
                customers: vec![
                    customer("CUST_001", "Ann", None),
                    customer("CUST_001", "Anne", Some("EU")),
                ],
            },
            &TransformOptions::default(),
            &mut sink,
        )
        .unwrap_err();

        assert!(matches!(err, TransformError::DuplicateCustomerKey { .. }));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let (output, _) = run(RawTables::default());
        assert!(output.accepted.is_empty());
        assert!(output.rejected.is_empty());
        assert_eq!(output.report, TransformReport::default());
    }
}
