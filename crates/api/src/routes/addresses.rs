//! Saved address handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use clementine_core::{AddressId, UserId};

use super::{ApiResponse, created, ok};
use crate::db::addresses::{AddressInput, AddressRepository};
use crate::error::{ApiError, Result};
use crate::models::Address;
use crate::state::AppState;

/// Body for creating or updating an address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBody {
    pub user_id: UserId,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub phone: String,
    pub notes: Option<String>,
}

impl AddressBody {
    fn validate(&self) -> Result<AddressInput> {
        let mut errors = Vec::new();
        for (value, field) in [
            (&self.address, "address"),
            (&self.city, "city"),
            (&self.pincode, "pincode"),
            (&self.phone, "phone"),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{field} is required"));
            }
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors.join("; ")));
        }

        Ok(AddressInput {
            address: self.address.clone(),
            city: self.city.clone(),
            pincode: self.pincode.clone(),
            phone: self.phone.clone(),
            notes: self.notes.clone(),
        })
    }
}

/// `POST /api/addresses` - create an address (max 3 per user).
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<AddressBody>,
) -> Result<(StatusCode, Json<ApiResponse<Address>>)> {
    let input = body.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(body.user_id, &input)
        .await?;
    Ok(created(address))
}

/// `GET /api/addresses/{userId}` - the user's addresses.
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<Vec<Address>>>> {
    let addresses = AddressRepository::new(state.pool()).list(user_id).await?;
    Ok(ok(addresses))
}

/// `PUT /api/addresses/{userId}/{addressId}` - update an address.
pub async fn update(
    State(state): State<AppState>,
    Path((user_id, address_id)): Path<(UserId, AddressId)>,
    Json(body): Json<AddressBody>,
) -> Result<Json<ApiResponse<Address>>> {
    let input = body.validate()?;
    let address = AddressRepository::new(state.pool())
        .update(user_id, address_id, &input)
        .await?;
    Ok(ok(address))
}

/// `DELETE /api/addresses/{userId}/{addressId}` - delete an address.
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, address_id)): Path<(UserId, AddressId)>,
) -> Result<Json<ApiResponse<Value>>> {
    AddressRepository::new(state.pool())
        .delete(user_id, address_id)
        .await?;
    Ok(ok(json!({ "deleted": true })))
}
