use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Capability, Destination, Dispatch, DispatchEvent, DispatchKind, DispatchNotice,
    DispatchStatus, EngineError, Movement, NewDispatchCmd, ResultEngine, Staff, dispatches,
    util::{normalize_required_text, parse_uuid},
};

use super::{Engine, TradingSettlement, with_tx};

/// Validated creation input, before any lookup.
#[derive(Debug, PartialEq)]
struct Draft {
    destination: Destination,
    commodity_id: Uuid,
    gross_weight: f64,
    net_weight: Option<f64>,
    num_bags: i64,
    driver: String,
    truck_num: String,
}

fn required<T>(value: Option<T>, field: &str) -> ResultEngine<T> {
    value.ok_or_else(|| EngineError::Validation(format!("{field} is required")))
}

fn draft(cmd: NewDispatchCmd) -> ResultEngine<Draft> {
    let kind = required(cmd.kind, "type")?;
    let destination = match (kind, cmd.client_id, cmd.warehouse_id) {
        (DispatchKind::Trading, Some(client), None) => Destination::Client(client),
        (DispatchKind::InterWarehouse, None, Some(warehouse)) => Destination::Warehouse(warehouse),
        (DispatchKind::Trading, None, _) => {
            return Err(EngineError::Validation(
                "client is required for a Trading dispatch".to_string(),
            ));
        }
        (DispatchKind::InterWarehouse, _, None) => {
            return Err(EngineError::Validation(
                "warehouse is required for an Inter warehouse dispatch".to_string(),
            ));
        }
        (kind, Some(_), Some(_)) => {
            return Err(EngineError::Validation(format!(
                "a {kind} dispatch takes either a client or a warehouse, not both"
            )));
        }
    };

    let commodity_id = required(cmd.commodity_id, "commodity")?;

    let num_bags = required(cmd.num_bags, "num_bags")?;
    if num_bags <= 0 {
        return Err(EngineError::Validation(
            "num_bags must be greater than zero".to_string(),
        ));
    }

    let gross_weight = required(cmd.gross_weight, "gross_weight")?;
    if !gross_weight.is_finite() || gross_weight <= 0.0 {
        return Err(EngineError::Validation(
            "gross_weight must be greater than zero".to_string(),
        ));
    }

    if let Some(net) = cmd.net_weight
        && (!net.is_finite() || net < 0.0 || net > gross_weight)
    {
        return Err(EngineError::Validation(
            "net_weight must be between zero and gross_weight".to_string(),
        ));
    }

    let driver = normalize_required_text(&required(cmd.driver, "driver")?, "driver")?;
    let truck_num = normalize_required_text(&required(cmd.truck_num, "truck_num")?, "truck_num")?;

    Ok(Draft {
        destination,
        commodity_id,
        gross_weight,
        net_weight: cmd.net_weight,
        num_bags,
        driver,
        truck_num,
    })
}

impl Engine {
    /// Persists `dispatch` only if its stored status is still `expected`.
    ///
    /// Two requests racing on the same dispatch both pass their transition
    /// check; the loser fails here instead of overwriting the winner.
    async fn save_dispatch(
        &self,
        db: &DatabaseTransaction,
        dispatch: &Dispatch,
        expected: DispatchStatus,
    ) -> ResultEngine<()> {
        let mut active: dispatches::ActiveModel = dispatch.into();
        active.id = ActiveValue::NotSet;
        active.created_at = ActiveValue::NotSet;

        let result = dispatches::Entity::update_many()
            .set(active)
            .filter(dispatches::Column::Id.eq(dispatch.id.to_string()))
            .filter(dispatches::Column::Status.eq(expected.as_str()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::InvalidTransition(format!(
                "dispatch {} was modified concurrently",
                dispatch.id
            )));
        }
        Ok(())
    }

    /// Human readable target of a dispatch: the destination warehouse name or
    /// the client name.
    async fn dispatch_for(
        &self,
        db: &DatabaseTransaction,
        dispatch: &Dispatch,
    ) -> ResultEngine<String> {
        match dispatch.destination {
            Destination::Warehouse(id) => Ok(self.require_warehouse(db, id).await?.name),
            Destination::Client(id) => Ok(self.require_client(db, id).await?.name),
        }
    }

    /// The warehouse a dispatch leaves from.
    async fn source_warehouse(
        &self,
        db: &DatabaseTransaction,
        dispatch: &Dispatch,
    ) -> ResultEngine<Uuid> {
        let warehouse = self.managed_warehouse(db, &dispatch.created_by).await?;
        parse_uuid(&warehouse.id, "warehouse")
    }

    async fn notice(
        &self,
        db: &DatabaseTransaction,
        dispatch: &Dispatch,
        approver: &Staff,
        otp: Option<String>,
    ) -> ResultEngine<DispatchNotice> {
        let label = self.dispatch_for(db, dispatch).await?;
        let creator = self.require_user(db, &dispatch.created_by).await?;

        let (subject, message) = match otp {
            Some(_) => (
                "Dispatch approved".to_string(),
                format!(
                    "Your dispatch of {} bags for {label} has been approved by {}.",
                    dispatch.num_bags, approver.name
                ),
            ),
            None => (
                "Dispatch rejected".to_string(),
                format!(
                    "Your dispatch of {} bags for {label} has been rejected by {}.",
                    dispatch.num_bags, approver.name
                ),
            ),
        };

        Ok(DispatchNotice {
            dispatch_id: dispatch.id,
            recipient_id: creator.id,
            recipient_email: creator.email,
            subject,
            message,
            otp,
        })
    }

    /// Records a dispatch request from a warehouse manager.
    ///
    /// The requester's own warehouse is the source. The new dispatch is
    /// `PENDING` and not approved.
    pub async fn create_dispatch(&self, cmd: NewDispatchCmd) -> ResultEngine<Dispatch> {
        let user_id = cmd.user_id.clone();
        let draft = draft(cmd)?;
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, &user_id, Capability::CreateDispatch)
                .await?;
            self.require_commodity(&db_tx, draft.commodity_id).await?;
            let source = self.managed_warehouse(&db_tx, &user_id).await?;

            match draft.destination {
                Destination::Client(client_id) => {
                    self.require_client(&db_tx, client_id).await?;
                }
                Destination::Warehouse(warehouse_id) => {
                    self.require_warehouse(&db_tx, warehouse_id).await?;
                    if warehouse_id.to_string() == source.id {
                        return Err(EngineError::Validation(
                            "destination warehouse must differ from the source".to_string(),
                        ));
                    }
                }
            }

            let dispatch = Dispatch {
                id: Uuid::new_v4(),
                destination: draft.destination,
                commodity_id: draft.commodity_id,
                gross_weight: draft.gross_weight,
                net_weight: draft.net_weight,
                num_bags: draft.num_bags,
                driver: draft.driver,
                truck_num: draft.truck_num,
                status: DispatchStatus::Pending,
                is_approved: false,
                is_received: None,
                created_by: user_id.clone(),
                approved_by: None,
                created_at: now,
                updated_at: now,
            };
            dispatches::ActiveModel::from(&dispatch)
                .insert(&db_tx)
                .await?;

            tracing::info!(
                dispatch = %dispatch.id,
                kind = %dispatch.kind(),
                user = %user_id,
                "dispatch created"
            );
            Ok(dispatch)
        })
    }

    /// Approves or rejects a `PENDING` dispatch.
    ///
    /// Approval issues a one-time passcode. Either way the creator is told
    /// once the transaction has committed.
    pub async fn approve_dispatch(
        &self,
        dispatch_id: Uuid,
        approve: bool,
        user_id: &str,
    ) -> ResultEngine<Dispatch> {
        let now = Utc::now();
        let (dispatch, notice) = with_tx!(self, |db_tx| {
            let approver = self
                .require_capability(&db_tx, user_id, Capability::ApproveDispatch)
                .await?;
            let mut dispatch = self.require_dispatch(&db_tx, dispatch_id).await?;
            let previous = dispatch.status;

            let event = if approve {
                DispatchEvent::Approve
            } else {
                DispatchEvent::Reject
            };
            dispatch.transition(event, now)?;
            dispatch.is_approved = approve;
            dispatch.approved_by = Some(approver.id.clone());
            self.save_dispatch(&db_tx, &dispatch, previous).await?;

            let otp = if approve {
                Some(self.issue_otp(&db_tx, dispatch.id, now).await?)
            } else {
                None
            };
            let notice = self.notice(&db_tx, &dispatch, &approver, otp).await?;

            tracing::info!(
                dispatch = %dispatch.id,
                status = %dispatch.status,
                user = %approver.id,
                "dispatch treated"
            );
            Ok::<_, EngineError>((dispatch, notice))
        })?;

        self.notifier.deliver(notice);
        Ok(dispatch)
    }

    /// Replaces the passcode of an approved Trading dispatch, e.g. after the
    /// first one expired, and sends the new one to the creator.
    pub async fn reissue_otp(&self, dispatch_id: Uuid, user_id: &str) -> ResultEngine<Dispatch> {
        let now = Utc::now();
        let (dispatch, notice) = with_tx!(self, |db_tx| {
            let approver = self
                .require_capability(&db_tx, user_id, Capability::ApproveDispatch)
                .await?;
            let dispatch = self.require_dispatch(&db_tx, dispatch_id).await?;
            if dispatch.status != DispatchStatus::Approved
                || dispatch.kind() != DispatchKind::Trading
            {
                return Err(EngineError::InvalidTransition(format!(
                    "cannot reissue an otp for a {} {} dispatch",
                    dispatch.status,
                    dispatch.kind()
                )));
            }

            let otp = self.issue_otp(&db_tx, dispatch.id, now).await?;
            let notice = self.notice(&db_tx, &dispatch, &approver, Some(otp)).await?;
            tracing::info!(dispatch = %dispatch.id, user = %approver.id, "otp reissued");
            Ok::<_, EngineError>((dispatch, notice))
        })?;

        self.notifier.deliver(notice);
        Ok(dispatch)
    }

    /// Redeems the passcode of an approved Trading dispatch and settles it.
    ///
    /// The passcode is consumed, the source warehouse's stock moves according
    /// to the configured [`TradingSettlement`] and the dispatch ends
    /// `COMPLETED`. Everything happens in one transaction: a failed settlement
    /// leaves the dispatch `APPROVED` with its passcode intact.
    pub async fn verify_dispatch(
        &self,
        dispatch_id: Uuid,
        otp: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<Dispatch> {
        let Some(otp) = otp.map(str::trim).filter(|otp| !otp.is_empty()) else {
            return Err(EngineError::Validation("otp is required".to_string()));
        };
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, user_id, Capability::VerifyDispatch)
                .await?;
            let mut dispatch = self.require_dispatch(&db_tx, dispatch_id).await?;
            // A settled or rejected dispatch has no passcode left; let the
            // lookup below report that.
            if !dispatch.status.is_terminal() {
                dispatch.status.apply(dispatch.kind(), DispatchEvent::Verify)?;
            }

            let record = self.redeem_otp(&db_tx, dispatch.id, otp, now).await?;

            dispatch.transition(DispatchEvent::Verify, now)?;
            self.save_dispatch(&db_tx, &dispatch, DispatchStatus::Approved)
                .await?;
            record.delete(&db_tx).await?;

            let source = self.source_warehouse(&db_tx, &dispatch).await?;
            let movement = match self.trading_settlement {
                TradingSettlement::Debit => Movement::debit(
                    source,
                    dispatch.commodity_id,
                    dispatch.num_bags,
                    dispatch.gross_weight,
                ),
                TradingSettlement::Credit => Movement::credit(
                    source,
                    dispatch.commodity_id,
                    dispatch.num_bags,
                    dispatch.gross_weight,
                ),
            };
            self.apply_movement_in(&db_tx, &movement).await?;

            dispatch.transition(DispatchEvent::Settle, now)?;
            self.save_dispatch(&db_tx, &dispatch, DispatchStatus::Verified)
                .await?;

            tracing::info!(
                dispatch = %dispatch.id,
                warehouse = %source,
                settlement = ?self.trading_settlement,
                "trading dispatch verified and settled"
            );
            Ok(dispatch)
        })
    }

    /// Closes an approved Inter warehouse dispatch.
    ///
    /// When the goods arrived, the source warehouse is debited and the
    /// destination credited in the same transaction, so the commodity total
    /// is conserved. Otherwise the dispatch is rejected and no stock moves.
    pub async fn confirm_dispatch(
        &self,
        dispatch_id: Uuid,
        is_received: bool,
        user_id: &str,
    ) -> ResultEngine<Dispatch> {
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, user_id, Capability::ConfirmDispatch)
                .await?;
            let mut dispatch = self.require_dispatch(&db_tx, dispatch_id).await?;
            let event = if is_received {
                DispatchEvent::ConfirmReceived
            } else {
                DispatchEvent::ConfirmNotReceived
            };
            dispatch.transition(event, now)?;
            dispatch.is_received = Some(is_received);

            if let (true, Some(destination)) = (is_received, dispatch.warehouse_id()) {
                let source = self.source_warehouse(&db_tx, &dispatch).await?;
                for movement in [
                    Movement::debit(
                        source,
                        dispatch.commodity_id,
                        dispatch.num_bags,
                        dispatch.gross_weight,
                    ),
                    Movement::credit(
                        destination,
                        dispatch.commodity_id,
                        dispatch.num_bags,
                        dispatch.gross_weight,
                    ),
                ] {
                    self.apply_movement_in(&db_tx, &movement).await?;
                }
            }

            self.discard_otps(&db_tx, dispatch.id).await?;
            self.save_dispatch(&db_tx, &dispatch, DispatchStatus::Approved)
                .await?;

            tracing::info!(
                dispatch = %dispatch.id,
                status = %dispatch.status,
                user = %user_id,
                "inter warehouse dispatch confirmed"
            );
            Ok(dispatch)
        })
    }

    /// Reads a single dispatch.
    pub async fn dispatch(&self, dispatch_id: Uuid, user_id: &str) -> ResultEngine<Dispatch> {
        with_tx!(self, |db_tx| {
            self.require_capability(&db_tx, user_id, Capability::ViewDispatch)
                .await?;
            self.require_dispatch(&db_tx, dispatch_id).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trading() -> NewDispatchCmd {
        NewDispatchCmd::trading("manager", Uuid::new_v4())
            .commodity(Uuid::new_v4())
            .load(50, 1000.0)
            .transport("Otieno", "KDA 123X")
    }

    fn validation(message: &str) -> EngineError {
        EngineError::Validation(message.to_string())
    }

    #[test]
    fn complete_trading_request_is_accepted() {
        let cmd = trading();
        let client = cmd.client_id.unwrap();
        let draft = draft(cmd).unwrap();
        assert_eq!(draft.destination, Destination::Client(client));
        assert_eq!(draft.num_bags, 50);
        assert_eq!(draft.driver, "Otieno");
    }

    #[test]
    fn type_is_required() {
        let mut cmd = trading();
        cmd.kind = None;
        assert_eq!(draft(cmd), Err(validation("type is required")));
    }

    #[test]
    fn trading_needs_a_client() {
        let mut cmd = trading();
        cmd.client_id = None;
        assert_eq!(
            draft(cmd),
            Err(validation("client is required for a Trading dispatch"))
        );
    }

    #[test]
    fn inter_warehouse_needs_a_warehouse() {
        let mut cmd = trading();
        cmd.kind = Some(DispatchKind::InterWarehouse);
        assert_eq!(
            draft(cmd),
            Err(validation("warehouse is required for an Inter warehouse dispatch"))
        );
    }

    #[test]
    fn both_destinations_are_rejected() {
        let mut cmd = trading();
        cmd.warehouse_id = Some(Uuid::new_v4());
        assert!(matches!(draft(cmd), Err(EngineError::Validation(_))));
    }

    #[test]
    fn missing_load_fields_are_reported() {
        let mut cmd = trading();
        cmd.num_bags = None;
        assert_eq!(draft(cmd), Err(validation("num_bags is required")));

        let mut cmd = trading();
        cmd.commodity_id = None;
        assert_eq!(draft(cmd), Err(validation("commodity is required")));

        let mut cmd = trading();
        cmd.truck_num = Some("   ".to_string());
        assert_eq!(draft(cmd), Err(validation("truck_num must not be empty")));
    }

    #[test]
    fn weights_are_checked() {
        let cmd = trading().load(10, 0.0);
        assert_eq!(
            draft(cmd),
            Err(validation("gross_weight must be greater than zero"))
        );

        let cmd = trading().net_weight(1200.0);
        assert_eq!(
            draft(cmd),
            Err(validation("net_weight must be between zero and gross_weight"))
        );

        let cmd = trading().net_weight(980.0);
        assert_eq!(draft(cmd).unwrap().net_weight, Some(980.0));
    }

    #[test]
    fn bags_must_be_positive() {
        let cmd = trading().load(0, 10.0);
        assert_eq!(
            draft(cmd),
            Err(validation("num_bags must be greater than zero"))
        );
    }
}
