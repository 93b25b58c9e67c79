//! Per-run diagnostics surface of the transform stage.
//!
//! The transform never logs through a global facade. It reports to the
//! [`DiagnosticsSink`] its caller passes in: [`TracingSink`] forwards to
//! `tracing`, [`RecordingSink`] keeps events in memory for assertions.

/// Something the transform observed while processing one run.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// Orders joined onto customers.
    Merged { orders: usize, unmatched: usize },
    /// Orders dropped because an earlier order had the same `order_id`.
    DuplicatesRemoved { count: usize },
    /// Absent values filled with a default.
    Imputed { field: &'static str, count: usize },
    /// One record refused by the validation gate.
    Rejected { order_id: i64, reason: String },
    /// Gate totals for the run.
    ValidationSummary { accepted: usize, rejected: usize },
}

/// Receiver of transform diagnostics for a single run.
pub trait DiagnosticsSink {
    fn emit(&mut self, event: DiagnosticEvent);
}

/// Sink that forwards every event to `tracing`.
///
/// Stage counts go out at `info`, rejections at `warn`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    pipeline: String,
}

impl TracingSink {
    #[must_use]
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
        }
    }
}

impl DiagnosticsSink for TracingSink {
    fn emit(&mut self, event: DiagnosticEvent) {
        let pipeline = self.pipeline.as_str();
        match event {
            DiagnosticEvent::Merged { orders, unmatched } => {
                tracing::info!(pipeline, orders, unmatched, "Merged orders with customers");
            }
            DiagnosticEvent::DuplicatesRemoved { count } => {
                tracing::info!(pipeline, duplicates_removed = count, "Removed duplicate orders");
            }
            DiagnosticEvent::Imputed { field, count } => {
                tracing::info!(pipeline, field, imputed = count, "Imputed missing values");
            }
            DiagnosticEvent::Rejected { order_id, reason } => {
                tracing::warn!(pipeline, order_id, reason = %reason, "Record rejected by schema contract");
            }
            DiagnosticEvent::ValidationSummary { accepted, rejected } => {
                if rejected > 0 {
                    tracing::warn!(pipeline, accepted, rejected, "Validation complete with rejections");
                } else {
                    tracing::info!(pipeline, accepted, rejected, "Validation complete");
                }
            }
        }
    }
}

/// Sink that keeps every event, in emission order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<DiagnosticEvent>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `order_id`s of rejected records, in the order they were reported.
    #[must_use]
    pub fn rejected_order_ids(&self) -> Vec<i64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                DiagnosticEvent::Rejected { order_id, .. } => Some(*order_id),
                _ => None,
            })
            .collect()
    }

    /// Count reported for an imputed field, if the event was emitted.
    #[must_use]
    pub fn imputed(&self, field: &str) -> Option<usize> {
        self.events.iter().find_map(|event| match event {
            DiagnosticEvent::Imputed { field: f, count } if *f == field => Some(*count),
            _ => None,
        })
    }
}

impl DiagnosticsSink for RecordingSink {
    fn emit(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.emit(DiagnosticEvent::Rejected {
            order_id: 7,
            reason: "a".into(),
        });
        sink.emit(DiagnosticEvent::Imputed {
            field: "region",
            count: 3,
        });
        sink.emit(DiagnosticEvent::Rejected {
            order_id: 3,
            reason: "b".into(),
        });

        assert_eq!(sink.rejected_order_ids(), vec![7, 3]);
        assert_eq!(sink.imputed("region"), Some(3));
        assert_eq!(sink.imputed("quantity"), None);
    }

    #[test]
    fn tracing_sink_accepts_every_event_without_subscriber() {
        let mut sink = TracingSink::new("sales");
        sink.emit(DiagnosticEvent::Merged {
            orders: 2,
            unmatched: 1,
        });
        sink.emit(DiagnosticEvent::ValidationSummary {
            accepted: 1,
            rejected: 1,
        });
    }
}
