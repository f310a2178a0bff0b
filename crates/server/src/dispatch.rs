//! Dispatch API endpoints

use api_types::{
    Envelope,
    dispatch::{
        DispatchApprove, DispatchConfirm, DispatchNew, DispatchStatus, DispatchType,
        DispatchVerify, DispatchView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Dispatch, DispatchKind, NewDispatchCmd, Staff};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

type DispatchResponse = Json<Envelope<DispatchView>>;
type DispatchId = WithRejection<Path<Uuid>, ServerError>;

fn view(dispatch: Dispatch) -> DispatchView {
    DispatchView {
        id: dispatch.id,
        kind: match dispatch.kind() {
            DispatchKind::InterWarehouse => DispatchType::InterWarehouse,
            DispatchKind::Trading => DispatchType::Trading,
        },
        commodity: dispatch.commodity_id,
        client: dispatch.client_id(),
        warehouse: dispatch.warehouse_id(),
        gross_weight: dispatch.gross_weight,
        net_weight: dispatch.net_weight,
        num_bags: dispatch.num_bags,
        driver: dispatch.driver,
        truck_num: dispatch.truck_num,
        status: match dispatch.status {
            engine::DispatchStatus::Pending => DispatchStatus::Pending,
            engine::DispatchStatus::Approved => DispatchStatus::Approved,
            engine::DispatchStatus::Rejected => DispatchStatus::Rejected,
            engine::DispatchStatus::Verified => DispatchStatus::Verified,
            engine::DispatchStatus::Completed => DispatchStatus::Completed,
        },
        is_approved: dispatch.is_approved,
        is_received: dispatch.is_received,
        created_by: dispatch.created_by,
        approved_by: dispatch.approved_by,
        created_at: dispatch.created_at,
        updated_at: dispatch.updated_at,
    }
}

/// Handle requests for creating a new `Dispatch`
pub async fn create(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<DispatchNew>, ServerError>,
) -> Result<(StatusCode, DispatchResponse), ServerError> {
    let cmd = NewDispatchCmd {
        kind: payload.kind.map(|kind| match kind {
            DispatchType::InterWarehouse => DispatchKind::InterWarehouse,
            DispatchType::Trading => DispatchKind::Trading,
        }),
        commodity_id: payload.commodity,
        client_id: payload.client,
        warehouse_id: payload.warehouse,
        gross_weight: payload.gross_weight,
        net_weight: payload.net_weight,
        num_bags: payload.num_bags,
        driver: payload.driver,
        truck_num: payload.truck_num,
        user_id: user.id,
    };

    let dispatch = state.engine.create_dispatch(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("Dispatch created", view(dispatch))),
    ))
}

/// Handle requests for approving or rejecting a pending `Dispatch`
pub async fn approve(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): DispatchId,
    WithRejection(Json(payload), _): WithRejection<Json<DispatchApprove>, ServerError>,
) -> Result<DispatchResponse, ServerError> {
    let Some(approve) = payload.is_approved else {
        return Err(ServerError::Generic("isApproved is required".to_string()));
    };

    let dispatch = state.engine.approve_dispatch(id, approve, &user.id).await?;
    let message = if approve {
        "Dispatch approved"
    } else {
        "Dispatch rejected"
    };
    Ok(Json(Envelope::ok(message, view(dispatch))))
}

/// Handle requests redeeming the passcode of a Trading `Dispatch`
pub async fn verify(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): DispatchId,
    WithRejection(Json(payload), _): WithRejection<Json<DispatchVerify>, ServerError>,
) -> Result<DispatchResponse, ServerError> {
    let dispatch = state
        .engine
        .verify_dispatch(id, payload.otp.as_deref(), &user.id)
        .await?;
    Ok(Json(Envelope::ok("Dispatch verified", view(dispatch))))
}

/// Handle requests confirming receipt of an Inter warehouse `Dispatch`
pub async fn confirm(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): DispatchId,
    WithRejection(Json(payload), _): WithRejection<Json<DispatchConfirm>, ServerError>,
) -> Result<DispatchResponse, ServerError> {
    let Some(received) = payload.is_received else {
        return Err(ServerError::Generic("isReceived is required".to_string()));
    };

    let dispatch = state
        .engine
        .confirm_dispatch(id, received, &user.id)
        .await?;
    let message = if received {
        "Dispatch received"
    } else {
        "Dispatch not received"
    };
    Ok(Json(Envelope::ok(message, view(dispatch))))
}

pub async fn resend_otp(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): DispatchId,
) -> Result<DispatchResponse, ServerError> {
    let dispatch = state.engine.reissue_otp(id, &user.id).await?;
    Ok(Json(Envelope::ok("OTP sent", view(dispatch))))
}

pub async fn get(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): DispatchId,
) -> Result<DispatchResponse, ServerError> {
    let dispatch = state.engine.dispatch(id, &user.id).await?;
    Ok(Json(Envelope::ok("Dispatch found", view(dispatch))))
}
