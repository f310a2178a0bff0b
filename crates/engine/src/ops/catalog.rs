//! Bootstrap operations for the records dispatches point at.
//!
//! These back the admin tooling; the HTTP surface does not expose them.

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Role, clients, commodities, users,
    util::{normalize_optional_text, normalize_required_text},
    warehouses,
};

use super::{Engine, with_tx};

/// Whether a managed warehouse lookup came back empty. Any other failure is
/// returned as is.
fn runs_no_warehouse(lookup: ResultEngine<warehouses::Model>) -> ResultEngine<bool> {
    match lookup {
        Ok(_) => Ok(false),
        Err(EngineError::KeyNotFound(_)) => Ok(true),
        Err(err) => Err(err),
    }
}

impl Engine {
    /// Registers a staff member and returns their id.
    pub async fn new_user(
        &self,
        name: &str,
        email: Option<&str>,
        role: Role,
    ) -> ResultEngine<String> {
        let name = normalize_required_text(name, "user name")?;
        let email = normalize_optional_text(email);
        with_tx!(self, |db_tx| {
            if let Some(email) = email.as_deref() {
                let taken = users::Entity::find()
                    .filter(Expr::cust("LOWER(email)").eq(email.to_lowercase()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(email.to_string()));
                }
            }

            let id = Uuid::new_v4().to_string();
            users::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                name: ActiveValue::Set(name),
                email: ActiveValue::Set(email),
                role: ActiveValue::Set(role.as_str().to_string()),
            }
            .insert(&db_tx)
            .await?;
            Ok(id)
        })
    }

    /// Creates a warehouse, optionally run by `manager_id`.
    ///
    /// A manager runs at most one warehouse: it is the source of every
    /// dispatch they create.
    pub async fn new_warehouse(
        &self,
        name: &str,
        location: Option<&str>,
        manager_id: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "warehouse name")?;
        let location = normalize_optional_text(location);
        with_tx!(self, |db_tx| {
            let exists = warehouses::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            if let Some(manager_id) = manager_id {
                let manager = self.require_user(&db_tx, manager_id).await?;
                if manager.role()? != Role::WarehouseManager {
                    return Err(EngineError::Validation(format!(
                        "{manager_id} is not a warehouse manager"
                    )));
                }
                if !runs_no_warehouse(self.managed_warehouse(&db_tx, manager_id).await)? {
                    return Err(EngineError::ExistingKey(format!(
                        "warehouse managed by {manager_id}"
                    )));
                }
            }

            let (id, model) =
                warehouses::new_active(name, location, manager_id.map(ToString::to_string));
            model.insert(&db_tx).await?;
            Ok(id)
        })
    }

    pub async fn new_commodity(&self, name: &str, grade: Option<&str>) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "commodity name")?;
        let grade = normalize_optional_text(grade);
        with_tx!(self, |db_tx| {
            let exists = commodities::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .filter(match grade.as_deref() {
                    Some(grade) => commodities::Column::Grade.eq(grade),
                    None => commodities::Column::Grade.is_null(),
                })
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let id = Uuid::new_v4();
            commodities::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                name: ActiveValue::Set(name),
                grade: ActiveValue::Set(grade),
            }
            .insert(&db_tx)
            .await?;
            Ok(id)
        })
    }

    pub async fn new_client(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_text(name, "client name")?;
        let email = normalize_optional_text(email);
        let phone = normalize_optional_text(phone);
        with_tx!(self, |db_tx| {
            let id = Uuid::new_v4();
            clients::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                name: ActiveValue::Set(name),
                email: ActiveValue::Set(email),
                phone: ActiveValue::Set(phone),
            }
            .insert(&db_tx)
            .await?;
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_managed_warehouse_means_free() {
        let lookup = Err(EngineError::KeyNotFound("no warehouse".to_string()));
        assert_eq!(runs_no_warehouse(lookup), Ok(true));
    }

    #[test]
    fn found_managed_warehouse_means_taken() {
        let model = warehouses::Model {
            id: Uuid::new_v4().to_string(),
            name: "Eldoret".to_string(),
            location: None,
            manager_id: Some("otieno".to_string()),
        };
        assert_eq!(runs_no_warehouse(Ok(model)), Ok(false));
    }

    #[test]
    fn lookup_failure_is_propagated() {
        let lookup = Err(EngineError::Database(DbErr::Custom(
            "database is locked".to_string(),
        )));
        assert!(matches!(
            runs_no_warehouse(lookup),
            Err(EngineError::Database(_))
        ));
    }
}
