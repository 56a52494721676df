//! Address repository.
//!
//! Enforces the per-user address limit. Orders never reference these rows
//! directly - checkout freezes an [`crate::models::AddressSnapshot`].

use sqlx::PgPool;

use clementine_core::{AddressId, UserId};

use super::StoreError;
use crate::models::Address;

/// Input for creating or updating an address.
#[derive(Debug, Clone)]
pub struct AddressInput {
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Repository for address operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an address for the user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` when the user already holds the
    /// maximum number of addresses.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM shop.addresses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        if count >= Address::MAX_PER_USER {
            return Err(StoreError::Conflict(format!(
                "a user may hold at most {} addresses",
                Address::MAX_PER_USER
            )));
        }

        let address = sqlx::query_as::<_, Address>(
            r"
            INSERT INTO shop.addresses (user_id, address, city, pincode, phone, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, address, city, pincode, phone, notes, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.pincode)
        .bind(&input.phone)
        .bind(&input.notes)
        .fetch_one(self.pool)
        .await?;

        Ok(address)
    }

    /// List the user's addresses, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, StoreError> {
        let addresses = sqlx::query_as::<_, Address>(
            r"
            SELECT id, user_id, address, city, pincode, phone, notes, created_at, updated_at
            FROM shop.addresses
            WHERE user_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// Update one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AddressNotFound` when the address does not exist
    /// or belongs to another user.
    pub async fn update(
        &self,
        user_id: UserId,
        address_id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, StoreError> {
        let updated = sqlx::query_as::<_, Address>(
            r"
            UPDATE shop.addresses
            SET address = $1, city = $2, pincode = $3, phone = $4, notes = $5,
                updated_at = NOW()
            WHERE id = $6 AND user_id = $7
            RETURNING id, user_id, address, city, pincode, phone, notes, created_at, updated_at
            ",
        )
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.pincode)
        .bind(&input.phone)
        .bind(&input.notes)
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        updated.ok_or(StoreError::AddressNotFound(address_id))
    }

    /// Delete one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AddressNotFound` when the address does not exist
    /// or belongs to another user.
    pub async fn delete(&self, user_id: UserId, address_id: AddressId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM shop.addresses WHERE id = $1 AND user_id = $2")
            .bind(address_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AddressNotFound(address_id));
        }

        Ok(())
    }
}
