use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use crate::domain::catalog::ProductId;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One product within an order: an immutable quantity/price snapshot.
/// The unit price is frozen at order time and never re-read from the
/// catalog afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Price per unit in minor units, as submitted with the order.
    pub unit_price: i64,
}

impl OrderLine {
    pub fn subtotal(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Canonical storage form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Customer-facing label, kept from the storefront's original wire
    /// strings so existing clients keep rendering correctly.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Đang xử lý",
            Self::Completed => "Hoàn thành",
            Self::Cancelled => "Đã huỷ",
        }
    }

    /// Parse a status submitted over the wire. Accepts the canonical
    /// names and the legacy labels; anything else is rejected rather
    /// than stored as a free-form string.
    pub fn parse(input: &str) -> Result<Self, OrderError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(OrderError::BlankStatus);
        }

        match trimmed.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => match trimmed {
                "Đang xử lý" => Ok(Self::Pending),
                "Hoàn thành" => Ok(Self::Completed),
                "Đã huỷ" => Ok(Self::Cancelled),
                other => Err(OrderError::UnknownStatus(other.to_string())),
            },
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply a percentage discount to an amount in minor units. Integer
/// division truncates, which is the one rounding rule used everywhere.
pub fn discounted_total(original: i64, percent: i32) -> i64 {
    original - original * i64::from(percent) / 100
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_line_subtotal() {
        let line = OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 3,
            unit_price: 120_000,
        };
        assert_eq!(line.subtotal(), 360_000);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
            assert_eq!(OrderStatus::parse(status.label()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(
            OrderStatus::parse("  Completed ").unwrap(),
            OrderStatus::Completed
        );
        assert_eq!(OrderStatus::parse("CANCELLED").unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_status_parse_rejects_blank_and_unknown() {
        assert!(matches!(
            OrderStatus::parse("   "),
            Err(OrderError::BlankStatus)
        ));
        assert!(matches!(
            OrderStatus::parse("shipped"),
            Err(OrderError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn test_discount_math_truncates() {
        assert_eq!(discounted_total(200_000, 10), 180_000);
        assert_eq!(discounted_total(200_000, 0), 200_000);
        // 999 * 15 / 100 = 149 (truncated), total 850
        assert_eq!(discounted_total(999, 15), 850);
    }
}
