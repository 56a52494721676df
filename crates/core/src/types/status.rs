//! Status enums for orders and payments.
//!
//! The string forms (serde, `Display`, `FromStr`) are the wire and database
//! representation and must stay in sync with each other.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders are created `Pending` (gateway payment outstanding) or `Confirmed`
/// (cash on delivery). Later transitions (`InProcess` through `Delivered` or
/// `Rejected`) are driven by fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    InProcess,
    InShipping,
    Delivered,
    Rejected,
}

impl OrderStatus {
    /// Whether an order in this status counts as a completed purchase for
    /// the review gate.
    #[must_use]
    pub const fn qualifies_for_review(self) -> bool {
        matches!(self, Self::Confirmed | Self::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::InProcess => write!(f, "inProcess"),
            Self::InShipping => write!(f, "inShipping"),
            Self::Delivered => write!(f, "delivered"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "inProcess" => Ok(Self::InProcess),
            "inShipping" => Ok(Self::InShipping),
            "delivered" => Ok(Self::Delivered),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    /// Cash on delivery: payment collected at the door.
    #[default]
    Pending,
    /// Gateway order awaiting capture.
    Unpaid,
    /// Payment captured.
    Paid,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Unpaid => write!(f, "unpaid"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// Accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    /// PayFast web checkout.
    Payfast,
}

impl PaymentMethod {
    /// Initial order and payment status for a freshly placed order.
    ///
    /// Cash-on-delivery orders are confirmed immediately; gateway orders
    /// stay pending until the payment is captured.
    #[must_use]
    pub const fn initial_statuses(self) -> (OrderStatus, PaymentStatus) {
        match self {
            Self::Cod => (OrderStatus::Confirmed, PaymentStatus::Pending),
            Self::Payfast => (OrderStatus::Pending, PaymentStatus::Unpaid),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "cod"),
            Self::Payfast => write!(f, "payfast"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "payfast" => Ok(Self::Payfast),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
