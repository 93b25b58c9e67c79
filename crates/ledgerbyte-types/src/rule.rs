//! Schema contract rule identifiers and structured violations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named rule of the analytics schema contract.
///
/// [`RuleId::ALL`] lists the rules in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// `order_id` strictly above the configured minimum.
    OrderIdThreshold,
    /// `price_usd` finite and not negative.
    PriceNonNegative,
    /// `quantity` fits the 32-bit integer target column.
    QuantityInteger,
    CustomerKeyPresent,
    CustomerNamePresent,
    RegionPresent,
    /// `total_sale` is a finite number.
    TotalSaleNumber,
    /// `creation_timestamp` parses as a timestamp.
    CreationTimestampValid,
}

impl RuleId {
    pub const ALL: [RuleId; 8] = [
        Self::OrderIdThreshold,
        Self::PriceNonNegative,
        Self::QuantityInteger,
        Self::CustomerKeyPresent,
        Self::CustomerNamePresent,
        Self::RegionPresent,
        Self::TotalSaleNumber,
        Self::CreationTimestampValid,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderIdThreshold => "order_id_threshold",
            Self::PriceNonNegative => "price_non_negative",
            Self::QuantityInteger => "quantity_integer",
            Self::CustomerKeyPresent => "customer_key_present",
            Self::CustomerNamePresent => "customer_name_present",
            Self::RegionPresent => "region_present",
            Self::TotalSaleNumber => "total_sale_number",
            Self::CreationTimestampValid => "creation_timestamp_valid",
        }
    }

    /// Record field the rule inspects.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Self::OrderIdThreshold => "order_id",
            Self::PriceNonNegative => "price_usd",
            Self::QuantityInteger => "quantity",
            Self::CustomerKeyPresent => "customer_key",
            Self::CustomerNamePresent => "customer_name",
            Self::RegionPresent => "region",
            Self::TotalSaleNumber => "total_sale",
            Self::CreationTimestampValid => "creation_timestamp",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed rule for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleId,
    pub message: String,
}

impl Violation {
    #[must_use]
    pub fn new(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn field(&self) -> &'static str {
        self.rule.field()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) failed: {}", self.rule, self.field(), self.message)
    }
}
