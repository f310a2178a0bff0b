//! Warehouse inventory endpoint

use api_types::{
    Envelope,
    inventory::{InventoryEntryView, InventoryView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use engine::Staff;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

/// Handle requests for the stock of a warehouse
pub async fn get(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(warehouse_id), _): WithRejection<Path<Uuid>, ServerError>,
) -> Result<Json<Envelope<InventoryView>>, ServerError> {
    let entries = state
        .engine
        .warehouse_inventory(warehouse_id, &user.id)
        .await?;

    Ok(Json(Envelope::ok(
        "Inventory found",
        InventoryView {
            warehouse: warehouse_id,
            inventory: entries
                .into_iter()
                .map(|entry| InventoryEntryView {
                    commodity: entry.commodity_id,
                    quantity: entry.quantity,
                    weight: entry.weight,
                })
                .collect(),
        },
    )))
}
