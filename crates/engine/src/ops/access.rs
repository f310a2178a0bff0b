use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Capability, Dispatch, EngineError, ResultEngine, Staff, clients, commodities, dispatches,
    users, warehouses,
};

use super::{Engine, with_tx};

/// Generates a `require_*` lookup returning the model or `KeyNotFound`.
macro_rules! impl_require {
    ($require_fn:ident, $entity:path, $model:path, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require!(
        require_warehouse,
        warehouses::Entity,
        warehouses::Model,
        "warehouse not exists"
    );

    impl_require!(
        require_commodity,
        commodities::Entity,
        commodities::Model,
        "commodity not exists"
    );

    impl_require!(
        require_client,
        clients::Entity,
        clients::Model,
        "client not exists"
    );

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Resolves `user_id` and checks its role grants `capability`.
    pub(super) async fn require_capability(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        capability: Capability,
    ) -> ResultEngine<Staff> {
        let staff = Staff::try_from(self.require_user(db, user_id).await?)?;
        if !staff.role.can(capability) {
            return Err(EngineError::Forbidden(format!(
                "{} cannot {capability}",
                staff.role
            )));
        }
        Ok(staff)
    }

    /// The warehouse run by `user_id`, i.e. the source of their dispatches.
    pub(super) async fn managed_warehouse(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<warehouses::Model> {
        warehouses::Entity::find()
            .filter(warehouses::Column::ManagerId.eq(user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("no warehouse managed by {user_id}"))
            })
    }

    pub(super) async fn require_dispatch(
        &self,
        db: &DatabaseTransaction,
        dispatch_id: Uuid,
    ) -> ResultEngine<Dispatch> {
        let model = dispatches::Entity::find_by_id(dispatch_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("dispatch not exists".to_string()))?;
        Dispatch::try_from(model)
    }

    /// Resolve the identity asserted on a request.
    pub async fn user(&self, user_id: &str) -> ResultEngine<Staff> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            Staff::try_from(model)
        })
    }
}
