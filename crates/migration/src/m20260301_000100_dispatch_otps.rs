use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum DispatchOtps {
    Table,
    Id,
    DispatchId,
    Otp,
    ExpireIn,
}

#[derive(Iden)]
enum Dispatches {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DispatchOtps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DispatchOtps::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DispatchOtps::DispatchId).string().not_null())
                    .col(ColumnDef::new(DispatchOtps::Otp).string().not_null())
                    .col(
                        ColumnDef::new(DispatchOtps::ExpireIn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-dispatch_otps-dispatch_id")
                            .from(DispatchOtps::Table, DispatchOtps::DispatchId)
                            .to(Dispatches::Table, Dispatches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One outstanding passcode per dispatch.
        manager
            .create_index(
                Index::create()
                    .name("idx-dispatch_otps-dispatch_id-unique")
                    .table(DispatchOtps::Table)
                    .col(DispatchOtps::DispatchId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DispatchOtps::Table).to_owned())
            .await?;
        Ok(())
    }
}
