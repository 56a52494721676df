//! Address book domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clementine_core::{AddressId, UserId};

/// A user's saved shipping address.
///
/// A user may hold at most [`Address::MAX_PER_USER`]; the limit is enforced
/// by the address repository, not the checkout core - orders only ever see
/// a frozen [`super::AddressSnapshot`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub phone: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Maximum number of saved addresses per user.
    pub const MAX_PER_USER: i64 = 3;
}
