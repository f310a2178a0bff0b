use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{Capability, EngineError, InventoryEntry, Movement, ResultEngine, inventory};

use super::{Engine, with_tx};

impl Engine {
    /// Applies `movement` to the ledger inside `db`.
    ///
    /// Existing entries are adjusted with a single guarded `UPDATE`, so
    /// concurrent settlements against the same warehouse cannot overwrite each
    /// other. A missing entry is created by a credit; a debit never creates
    /// one and never drives stock below zero.
    pub(super) async fn apply_movement_in(
        &self,
        db: &DatabaseTransaction,
        movement: &Movement,
    ) -> ResultEngine<()> {
        let warehouse_id = movement.warehouse_id.to_string();
        let commodity_id = movement.commodity_id.to_string();

        let (min_quantity, max_quantity) = inventory::accepted_range(movement.quantity);
        let (min_grams, max_grams) = inventory::accepted_range(movement.grams);

        let updated = inventory::Entity::update_many()
            .col_expr(
                inventory::Column::Quantity,
                Expr::col(inventory::Column::Quantity).add(movement.quantity),
            )
            .col_expr(
                inventory::Column::WeightGrams,
                Expr::col(inventory::Column::WeightGrams).add(movement.grams),
            )
            .filter(inventory::Column::WarehouseId.eq(warehouse_id.clone()))
            .filter(inventory::Column::CommodityId.eq(commodity_id.clone()))
            .filter(inventory::Column::Quantity.between(min_quantity, max_quantity))
            .filter(inventory::Column::WeightGrams.between(min_grams, max_grams))
            .exec(db)
            .await?;
        if updated.rows_affected > 0 {
            return Ok(());
        }

        let current = inventory::Entity::find_by_id((warehouse_id.clone(), commodity_id.clone()))
            .one(db)
            .await?;
        let (quantity, grams) = movement.apply_to(
            current
                .as_ref()
                .map(|entry| (entry.quantity, entry.weight_grams)),
        )?;
        if current.is_some() {
            // The guarded update refused it, the stock changed under us.
            return Err(EngineError::InsufficientStock(format!(
                "warehouse {warehouse_id} stock of commodity {commodity_id} changed concurrently"
            )));
        }

        inventory::ActiveModel {
            warehouse_id: ActiveValue::Set(warehouse_id),
            commodity_id: ActiveValue::Set(commodity_id),
            quantity: ActiveValue::Set(quantity),
            weight_grams: ActiveValue::Set(grams),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    /// Applies a stock movement outside of any dispatch (opening stock,
    /// corrections).
    pub async fn apply_movement(&self, movement: Movement) -> ResultEngine<InventoryEntry> {
        with_tx!(self, |db_tx| {
            self.require_warehouse(&db_tx, movement.warehouse_id).await?;
            self.require_commodity(&db_tx, movement.commodity_id).await?;
            self.apply_movement_in(&db_tx, &movement).await?;

            let entry = inventory::Entity::find_by_id((
                movement.warehouse_id.to_string(),
                movement.commodity_id.to_string(),
            ))
            .one(&db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("inventory entry not exists".to_string()))?;
            tracing::info!(
                warehouse = %movement.warehouse_id,
                commodity = %movement.commodity_id,
                quantity = entry.quantity,
                grams = entry.weight_grams,
                "stock adjusted"
            );
            InventoryEntry::try_from(entry)
        })
    }

    /// Current stock of a warehouse, one entry per commodity.
    pub async fn warehouse_inventory(
        &self,
        warehouse_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<InventoryEntry>> {
        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, user_id, Capability::ViewInventory)
                .await?;
            self.require_warehouse(&db_tx, warehouse_id).await?;

            inventory::Entity::find()
                .filter(inventory::Column::WarehouseId.eq(warehouse_id.to_string()))
                .order_by_asc(inventory::Column::CommodityId)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(InventoryEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Stock of a single commodity, `None` when the warehouse never held it.
    pub async fn inventory_entry(
        &self,
        warehouse_id: Uuid,
        commodity_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Option<InventoryEntry>> {
        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, user_id, Capability::ViewInventory)
                .await?;
            self.require_warehouse(&db_tx, warehouse_id).await?;

            inventory::Entity::find_by_id((warehouse_id.to_string(), commodity_id.to_string()))
                .one(&db_tx)
                .await?
                .map(InventoryEntry::try_from)
                .transpose()
        })
    }
}
