//! A `Warehouse` stores commodities and is run by a single manager. Its stock
//! lives in [`inventory`](super::inventory).

use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "warehouses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub manager_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventory,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ManagerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Manager,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn new_active(
    name: String,
    location: Option<String>,
    manager_id: Option<String>,
) -> (Uuid, ActiveModel) {
    let id = Uuid::new_v4();
    let model = ActiveModel {
        id: ActiveValue::Set(id.to_string()),
        name: ActiveValue::Set(name),
        location: ActiveValue::Set(location),
        manager_id: ActiveValue::Set(manager_id),
    };
    (id, model)
}
