//! Structural errors that abort a transform.
//!
//! Individual bad values never surface here; they become rejected records.
//! A [`TransformError`] means the input shape itself makes any partial
//! output meaningless.

/// Precondition violation of the transform input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The customer set is keyed by `customer_key` and must be unique,
    /// otherwise the join would fan orders out.
    #[error("customer_key '{key}' appears {occurrences} times in the customer set; join is ambiguous")]
    DuplicateCustomerKey { key: String, occurrences: usize },

    /// A required column is absent from an extracted table.
    #[error("table '{table}' is missing required column(s): {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },
}
