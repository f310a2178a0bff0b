//! Initial schema.
//!
//! - `users`: staff and their role
//! - `warehouses`: storage sites, each run by at most one manager
//! - `commodities`: graded goods
//! - `clients`: external buyers of Trading dispatches
//! - `inventory_entries`: stock per warehouse and commodity
//! - `dispatches`: goods movement requests

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    Role,
}

#[derive(Iden)]
enum Warehouses {
    Table,
    Id,
    Name,
    Location,
    ManagerId,
}

#[derive(Iden)]
enum Commodities {
    Table,
    Id,
    Name,
    Grade,
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    Name,
    Email,
    Phone,
}

#[derive(Iden)]
enum InventoryEntries {
    Table,
    WarehouseId,
    CommodityId,
    Quantity,
    WeightGrams,
}

#[derive(Iden)]
enum Dispatches {
    Table,
    Id,
    Kind,
    CommodityId,
    ClientId,
    WarehouseId,
    GrossWeight,
    NetWeight,
    NumBags,
    Driver,
    TruckNum,
    Status,
    IsApproved,
    IsReceived,
    CreatedBy,
    ApprovedBy,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Warehouses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Warehouses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Warehouses::Name).string().not_null())
                    .col(ColumnDef::new(Warehouses::Location).string())
                    .col(ColumnDef::new(Warehouses::ManagerId).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-warehouses-manager_id")
                            .from(Warehouses::Table, Warehouses::ManagerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-warehouses-manager_id-unique")
                    .table(Warehouses::Table)
                    .col(Warehouses::ManagerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Commodities and clients
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Commodities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Commodities::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Commodities::Name).string().not_null())
                    .col(ColumnDef::new(Commodities::Grade).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string())
                    .col(ColumnDef::new(Clients::Phone).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Inventory
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InventoryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryEntries::WarehouseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::CommodityId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEntries::WeightGrams)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(InventoryEntries::WarehouseId)
                            .col(InventoryEntries::CommodityId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_entries-warehouse_id")
                            .from(InventoryEntries::Table, InventoryEntries::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_entries-commodity_id")
                            .from(InventoryEntries::Table, InventoryEntries::CommodityId)
                            .to(Commodities::Table, Commodities::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Dispatches
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Dispatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Dispatches::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Dispatches::Kind).string().not_null())
                    .col(ColumnDef::new(Dispatches::CommodityId).string().not_null())
                    .col(ColumnDef::new(Dispatches::ClientId).string())
                    .col(ColumnDef::new(Dispatches::WarehouseId).string())
                    .col(ColumnDef::new(Dispatches::GrossWeight).double().not_null())
                    .col(ColumnDef::new(Dispatches::NetWeight).double())
                    .col(ColumnDef::new(Dispatches::NumBags).big_integer().not_null())
                    .col(ColumnDef::new(Dispatches::Driver).string().not_null())
                    .col(ColumnDef::new(Dispatches::TruckNum).string().not_null())
                    .col(
                        ColumnDef::new(Dispatches::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Dispatches::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Dispatches::IsReceived).boolean())
                    .col(ColumnDef::new(Dispatches::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Dispatches::ApprovedBy).string())
                    .col(
                        ColumnDef::new(Dispatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Dispatches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispatches-commodity_id")
                            .from(Dispatches::Table, Dispatches::CommodityId)
                            .to(Commodities::Table, Commodities::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispatches-client_id")
                            .from(Dispatches::Table, Dispatches::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispatches-warehouse_id")
                            .from(Dispatches::Table, Dispatches::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispatches-created_by")
                            .from(Dispatches::Table, Dispatches::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-dispatches-created_by")
                    .table(Dispatches::Table)
                    .col(Dispatches::CreatedBy)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-dispatches-status")
                    .table(Dispatches::Table)
                    .col(Dispatches::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Dispatches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commodities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
