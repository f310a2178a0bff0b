//! The inventory ledger: per-warehouse stock of each commodity.
//!
//! A row exists per `(warehouse, commodity)` pair that has ever been stocked.
//! Rows are only touched by dispatch settlement (and by the admin bootstrap
//! tooling), always through a [`Movement`]. Weights are kept in whole grams
//! so repeated settlements add up exactly.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// Stock of one commodity inside one warehouse. `weight` is in kilograms.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryEntry {
    pub commodity_id: Uuid,
    pub quantity: i64,
    pub weight: f64,
}

/// Kilograms to the whole grams the ledger stores.
///
/// Out of range values saturate; the ledger then refuses them as an overflow.
pub(crate) fn kilograms_to_grams(kilograms: f64) -> i64 {
    (kilograms * 1000.0).round() as i64
}

pub(crate) fn grams_to_kilograms(grams: i64) -> f64 {
    grams as f64 / 1000.0
}

/// Range `current` must lie in for `current + delta` to stay within
/// `0..=i64::MAX`.
pub(crate) fn accepted_range(delta: i64) -> (i64, i64) {
    (delta.saturating_neg(), i64::MAX - delta.max(0))
}

/// A signed change to a warehouse's stock of a commodity.
///
/// `quantity` counts bags, `grams` is the weight. Positive values credit the
/// warehouse, negative values debit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Movement {
    pub warehouse_id: Uuid,
    pub commodity_id: Uuid,
    pub quantity: i64,
    pub grams: i64,
}

impl Movement {
    /// `weight` in kilograms.
    pub fn credit(warehouse_id: Uuid, commodity_id: Uuid, quantity: i64, weight: f64) -> Self {
        Self {
            warehouse_id,
            commodity_id,
            quantity,
            grams: kilograms_to_grams(weight),
        }
    }

    /// `weight` in kilograms.
    pub fn debit(warehouse_id: Uuid, commodity_id: Uuid, quantity: i64, weight: f64) -> Self {
        Self {
            warehouse_id,
            commodity_id,
            quantity: quantity.saturating_neg(),
            grams: kilograms_to_grams(weight).saturating_neg(),
        }
    }

    pub fn is_debit(&self) -> bool {
        self.quantity < 0 || self.grams < 0
    }

    /// Resulting `(quantity, grams)` when applied on top of `current`.
    ///
    /// `None` means the warehouse holds no entry for the commodity yet. A debit
    /// can never create an entry nor drive stock below zero.
    pub fn apply_to(&self, current: Option<(i64, i64)>) -> ResultEngine<(i64, i64)> {
        let (quantity, grams) = match current {
            Some(stock) => stock,
            None if self.is_debit() => {
                return Err(EngineError::InsufficientStock(format!(
                    "warehouse {} holds no commodity {}",
                    self.warehouse_id, self.commodity_id
                )));
            }
            None => (0, 0),
        };

        let (Some(quantity), Some(grams)) = (
            quantity.checked_add(self.quantity),
            grams.checked_add(self.grams),
        ) else {
            return Err(EngineError::Validation(format!(
                "stock of commodity {} in warehouse {} would overflow",
                self.commodity_id, self.warehouse_id
            )));
        };
        if quantity < 0 || grams < 0 {
            return Err(EngineError::InsufficientStock(format!(
                "warehouse {} cannot release {} bags / {} kg of commodity {}",
                self.warehouse_id,
                self.quantity.saturating_neg(),
                grams_to_kilograms(self.grams.saturating_neg()),
                self.commodity_id
            )));
        }
        Ok((quantity, grams))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub warehouse_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub commodity_id: String,
    pub quantity: i64,
    pub weight_grams: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouses::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Warehouses,
    #[sea_orm(
        belongs_to = "super::commodities::Entity",
        from = "Column::CommodityId",
        to = "super::commodities::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Commodities,
}

impl Related<super::warehouses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouses.def()
    }
}

impl Related<super::commodities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commodities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for InventoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            commodity_id: parse_uuid(&model.commodity_id, "commodity")?,
            quantity: model.quantity,
            weight: grams_to_kilograms(model.weight_grams),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn credit_creates_missing_entry() {
        let (warehouse, commodity) = ids();
        let movement = Movement::credit(warehouse, commodity, 20, 400.0);
        assert_eq!(movement.apply_to(None).unwrap(), (20, 400_000));
    }

    #[test]
    fn credit_increments_existing_entry() {
        let (warehouse, commodity) = ids();
        let movement = Movement::credit(warehouse, commodity, 50, 1000.0);
        assert_eq!(
            movement.apply_to(Some((10, 200_000))).unwrap(),
            (60, 1_200_000)
        );
    }

    #[test]
    fn debit_decrements_existing_entry() {
        let (warehouse, commodity) = ids();
        let movement = Movement::debit(warehouse, commodity, 20, 400.0);
        assert!(movement.is_debit());
        assert_eq!(
            movement.apply_to(Some((100, 2_000_000))).unwrap(),
            (80, 1_600_000)
        );
    }

    #[test]
    fn debit_to_exactly_zero_is_allowed() {
        let (warehouse, commodity) = ids();
        let movement = Movement::debit(warehouse, commodity, 20, 400.0);
        assert_eq!(movement.apply_to(Some((20, 400_000))).unwrap(), (0, 0));
    }

    #[test]
    fn fractional_weights_drain_to_zero() {
        let (warehouse, commodity) = ids();
        let stock = Movement::credit(warehouse, commodity, 2, 0.3)
            .apply_to(None)
            .unwrap();
        let stock = Movement::debit(warehouse, commodity, 1, 0.1)
            .apply_to(Some(stock))
            .unwrap();
        assert_eq!(stock, (1, 200));
        let stock = Movement::debit(warehouse, commodity, 1, 0.2)
            .apply_to(Some(stock))
            .unwrap();
        assert_eq!(stock, (0, 0));
    }

    #[test]
    fn weights_round_to_the_gram() {
        assert_eq!(kilograms_to_grams(100.3), 100_300);
        assert_eq!(kilograms_to_grams(0.0004), 0);
        assert_eq!(grams_to_kilograms(1_250), 1.25);
    }

    #[test]
    fn debit_without_entry_fails() {
        let (warehouse, commodity) = ids();
        let err = Movement::debit(warehouse, commodity, 1, 1.0)
            .apply_to(None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    #[test]
    fn overdraw_fails() {
        let (warehouse, commodity) = ids();
        let err = Movement::debit(warehouse, commodity, 30, 100.0)
            .apply_to(Some((20, 400_000)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    #[test]
    fn overflowing_credit_is_a_validation_error() {
        let (warehouse, commodity) = ids();
        let err = Movement::credit(warehouse, commodity, 1, 1.0)
            .apply_to(Some((i64::MAX, 0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn accepted_range_bounds_both_sides() {
        assert_eq!(accepted_range(5), (-5, i64::MAX - 5));
        assert_eq!(accepted_range(-5), (5, i64::MAX));
    }
}
