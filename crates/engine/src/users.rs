//! Users table.
//!
//! Identity is asserted upstream; the engine only needs the user's role and
//! the address notifications go to.

use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine, Role};

/// A staff member as seen by the workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
}

impl Model {
    pub fn role(&self) -> ResultEngine<Role> {
        Role::try_from(self.role.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::warehouses::Entity")]
    Warehouses,
}

impl Related<super::warehouses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Staff {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let role = model.role()?;
        Ok(Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role,
        })
    }
}
