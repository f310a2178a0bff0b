//! The module contains the `Dispatch` record and its status lifecycle.
//!
//! A dispatch moves a quantity of a commodity out of the requester's
//! warehouse, either to another warehouse (`InterWarehouse`) or to an external
//! client (`Trading`). Every status change goes through
//! [`DispatchStatus::apply`], which owns the transition table:
//!
//! | from       | event                | kind            | to          |
//! |------------|----------------------|-----------------|-------------|
//! | `Pending`  | `Approve`            | any             | `Approved`  |
//! | `Pending`  | `Reject`             | any             | `Rejected`  |
//! | `Approved` | `Verify`             | `Trading`       | `Verified`  |
//! | `Verified` | `Settle`             | `Trading`       | `Completed` |
//! | `Approved` | `ConfirmReceived`    | `InterWarehouse`| `Completed` |
//! | `Approved` | `ConfirmNotReceived` | `InterWarehouse`| `Rejected`  |

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

/// Where the goods are going.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    InterWarehouse,
    Trading,
}

impl DispatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InterWarehouse => "Inter warehouse",
            Self::Trading => "Trading",
        }
    }
}

impl TryFrom<&str> for DispatchKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            v if v.eq_ignore_ascii_case("Inter warehouse") => Ok(Self::InterWarehouse),
            v if v.eq_ignore_ascii_case("Trading") => Ok(Self::Trading),
            other => Err(EngineError::Validation(format!(
                "invalid dispatch type: {other}"
            ))),
        }
    }
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    Pending,
    Approved,
    Rejected,
    Verified,
    Completed,
}

/// Workflow events that may move a dispatch between statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchEvent {
    Approve,
    Reject,
    Verify,
    Settle,
    ConfirmReceived,
    ConfirmNotReceived,
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Verify => "verify",
            Self::Settle => "settle",
            Self::ConfirmReceived | Self::ConfirmNotReceived => "confirm",
        };
        f.write_str(label)
    }
}

impl DispatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Verified => "VERIFIED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Next status for `event` on a dispatch of `kind`, or
    /// [`EngineError::InvalidTransition`] when the table has no such edge.
    pub fn apply(self, kind: DispatchKind, event: DispatchEvent) -> ResultEngine<Self> {
        use DispatchEvent as E;
        use DispatchKind as K;
        use DispatchStatus as S;

        match (self, event, kind) {
            (S::Pending, E::Approve, _) => Ok(S::Approved),
            (S::Pending, E::Reject, _) => Ok(S::Rejected),
            (S::Approved, E::Verify, K::Trading) => Ok(S::Verified),
            (S::Verified, E::Settle, K::Trading) => Ok(S::Completed),
            (S::Approved, E::ConfirmReceived, K::InterWarehouse) => Ok(S::Completed),
            (S::Approved, E::ConfirmNotReceived, K::InterWarehouse) => Ok(S::Rejected),
            (status, event, kind) => Err(EngineError::InvalidTransition(format!(
                "cannot {event} a {status} {kind} dispatch"
            ))),
        }
    }
}

impl TryFrom<&str> for DispatchStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "VERIFIED" => Ok(Self::Verified),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(EngineError::Validation(format!(
                "invalid dispatch status: {other}"
            ))),
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dispatch is headed. Encodes the "exactly one of client/warehouse"
/// rule in the type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    Warehouse(Uuid),
    Client(Uuid),
}

impl Destination {
    pub fn kind(&self) -> DispatchKind {
        match self {
            Self::Warehouse(_) => DispatchKind::InterWarehouse,
            Self::Client(_) => DispatchKind::Trading,
        }
    }
}

/// A goods movement request.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub id: Uuid,
    pub destination: Destination,
    pub commodity_id: Uuid,
    pub gross_weight: f64,
    pub net_weight: Option<f64>,
    pub num_bags: i64,
    pub driver: String,
    pub truck_num: String,
    pub status: DispatchStatus,
    pub is_approved: bool,
    pub is_received: Option<bool>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dispatch {
    pub fn kind(&self) -> DispatchKind {
        self.destination.kind()
    }

    pub fn client_id(&self) -> Option<Uuid> {
        match self.destination {
            Destination::Client(id) => Some(id),
            Destination::Warehouse(_) => None,
        }
    }

    pub fn warehouse_id(&self) -> Option<Uuid> {
        match self.destination {
            Destination::Warehouse(id) => Some(id),
            Destination::Client(_) => None,
        }
    }

    /// Moves the dispatch along the transition table.
    pub fn transition(&mut self, event: DispatchEvent, at: DateTime<Utc>) -> ResultEngine<()> {
        self.status = self.status.apply(self.kind(), event)?;
        self.updated_at = at;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dispatches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub commodity_id: String,
    pub client_id: Option<String>,
    pub warehouse_id: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub gross_weight: f64,
    #[sea_orm(column_type = "Double", nullable)]
    pub net_weight: Option<f64>,
    pub num_bags: i64,
    pub driver: String,
    pub truck_num: String,
    pub status: String,
    pub is_approved: bool,
    pub is_received: Option<bool>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::otps::Entity")]
    Otps,
}

impl Related<super::otps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Otps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Dispatch> for ActiveModel {
    fn from(value: &Dispatch) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            kind: ActiveValue::Set(value.kind().as_str().to_string()),
            commodity_id: ActiveValue::Set(value.commodity_id.to_string()),
            client_id: ActiveValue::Set(value.client_id().map(|id| id.to_string())),
            warehouse_id: ActiveValue::Set(value.warehouse_id().map(|id| id.to_string())),
            gross_weight: ActiveValue::Set(value.gross_weight),
            net_weight: ActiveValue::Set(value.net_weight),
            num_bags: ActiveValue::Set(value.num_bags),
            driver: ActiveValue::Set(value.driver.clone()),
            truck_num: ActiveValue::Set(value.truck_num.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            is_approved: ActiveValue::Set(value.is_approved),
            is_received: ActiveValue::Set(value.is_received),
            created_by: ActiveValue::Set(value.created_by.clone()),
            approved_by: ActiveValue::Set(value.approved_by.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Dispatch {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = DispatchKind::try_from(model.kind.as_str())?;
        let destination = match (kind, model.client_id, model.warehouse_id) {
            (DispatchKind::Trading, Some(client), None) => {
                Destination::Client(parse_uuid(&client, "client")?)
            }
            (DispatchKind::InterWarehouse, None, Some(warehouse)) => {
                Destination::Warehouse(parse_uuid(&warehouse, "warehouse")?)
            }
            _ => {
                return Err(EngineError::Validation(format!(
                    "dispatch {} has an inconsistent destination",
                    model.id
                )));
            }
        };

        Ok(Self {
            id: parse_uuid(&model.id, "dispatch")?,
            destination,
            commodity_id: parse_uuid(&model.commodity_id, "commodity")?,
            gross_weight: model.gross_weight,
            net_weight: model.net_weight,
            num_bags: model.num_bags,
            driver: model.driver,
            truck_num: model.truck_num,
            status: DispatchStatus::try_from(model.status.as_str())?,
            is_approved: model.is_approved,
            is_received: model.is_received,
            created_by: model.created_by,
            approved_by: model.approved_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use DispatchEvent as E;
    use DispatchKind as K;
    use DispatchStatus as S;

    fn dispatch(destination: Destination) -> Dispatch {
        let now = Utc::now();
        Dispatch {
            id: Uuid::new_v4(),
            destination,
            commodity_id: Uuid::new_v4(),
            gross_weight: 1000.0,
            net_weight: None,
            num_bags: 50,
            driver: "Otieno".to_string(),
            truck_num: "KDA 123X".to_string(),
            status: S::Pending,
            is_approved: false,
            is_received: None,
            created_by: "manager".to_string(),
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn trading_happy_path() {
        let mut status = S::Pending;
        for event in [E::Approve, E::Verify, E::Settle] {
            status = status.apply(K::Trading, event).unwrap();
        }
        assert_eq!(status, S::Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn inter_warehouse_paths() {
        let approved = S::Pending.apply(K::InterWarehouse, E::Approve).unwrap();
        assert_eq!(
            approved.apply(K::InterWarehouse, E::ConfirmReceived).unwrap(),
            S::Completed
        );
        assert_eq!(
            approved
                .apply(K::InterWarehouse, E::ConfirmNotReceived)
                .unwrap(),
            S::Rejected
        );
    }

    #[test]
    fn rejection_is_terminal() {
        let rejected = S::Pending.apply(K::Trading, E::Reject).unwrap();
        assert!(rejected.is_terminal());
        assert!(rejected.apply(K::Trading, E::Approve).is_err());
    }

    #[test]
    fn verify_pending_is_rejected() {
        assert_eq!(
            S::Pending.apply(K::Trading, E::Verify),
            Err(EngineError::InvalidTransition(
                "cannot verify a PENDING Trading dispatch".to_string()
            ))
        );
    }

    #[test]
    fn double_approval_is_rejected() {
        assert!(S::Approved.apply(K::Trading, E::Approve).is_err());
    }

    #[test]
    fn paths_do_not_cross() {
        assert!(S::Approved.apply(K::InterWarehouse, E::Verify).is_err());
        assert!(S::Approved.apply(K::Trading, E::ConfirmReceived).is_err());
    }

    #[test]
    fn transition_touches_updated_at() {
        let mut dispatch = dispatch(Destination::Client(Uuid::new_v4()));
        let later = dispatch.updated_at + chrono::Duration::seconds(5);
        dispatch.transition(E::Approve, later).unwrap();
        assert_eq!(dispatch.status, S::Approved);
        assert_eq!(dispatch.updated_at, later);
    }

    #[test]
    fn destination_determines_kind() {
        let trading = dispatch(Destination::Client(Uuid::new_v4()));
        assert_eq!(trading.kind(), K::Trading);
        assert!(trading.warehouse_id().is_none());

        let transfer = dispatch(Destination::Warehouse(Uuid::new_v4()));
        assert_eq!(transfer.kind(), K::InterWarehouse);
        assert!(transfer.client_id().is_none());
    }

    #[test]
    fn model_round_trip_keeps_destination() {
        let original = dispatch(Destination::Warehouse(Uuid::new_v4()));
        let active: ActiveModel = (&original).into();
        let model = Model {
            id: active.id.unwrap(),
            kind: active.kind.unwrap(),
            commodity_id: active.commodity_id.unwrap(),
            client_id: active.client_id.unwrap(),
            warehouse_id: active.warehouse_id.unwrap(),
            gross_weight: active.gross_weight.unwrap(),
            net_weight: active.net_weight.unwrap(),
            num_bags: active.num_bags.unwrap(),
            driver: active.driver.unwrap(),
            truck_num: active.truck_num.unwrap(),
            status: active.status.unwrap(),
            is_approved: active.is_approved.unwrap(),
            is_received: active.is_received.unwrap(),
            created_by: active.created_by.unwrap(),
            approved_by: active.approved_by.unwrap(),
            created_at: active.created_at.unwrap(),
            updated_at: active.updated_at.unwrap(),
        };
        assert_eq!(Dispatch::try_from(model).unwrap(), original);
    }

    #[test]
    fn inconsistent_model_is_rejected() {
        let original = dispatch(Destination::Client(Uuid::new_v4()));
        let active: ActiveModel = (&original).into();
        let model = Model {
            id: active.id.unwrap(),
            kind: "Inter warehouse".to_string(),
            commodity_id: active.commodity_id.unwrap(),
            client_id: active.client_id.unwrap(),
            warehouse_id: None,
            gross_weight: 1.0,
            net_weight: None,
            num_bags: 1,
            driver: "d".to_string(),
            truck_num: "t".to_string(),
            status: "PENDING".to_string(),
            is_approved: false,
            is_received: None,
            created_by: "m".to_string(),
            approved_by: None,
            created_at: original.created_at,
            updated_at: original.updated_at,
        };
        assert!(matches!(
            Dispatch::try_from(model),
            Err(EngineError::Validation(_))
        ));
    }
}
