use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, dispatch, inventory, presence, presence::PresenceDirectory};
use engine::{Engine, EngineError};

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub presence: Arc<PresenceDirectory>,
}

/// `TypedHeader` for the asserted caller identity
///
/// Authentication happens upstream; requests carry the authenticated user id
/// in the "x-user-id" entry of the header.
#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(UserIdHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

async fn identity(
    user_header: Option<TypedHeader<UserIdHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_header else {
        return Err(ServerError::Unauthorized(
            "x-user-id header is required".to_string(),
        ));
    };

    let user = match state.engine.user(&user_id).await {
        Ok(user) => user,
        Err(EngineError::KeyNotFound(_)) | Err(EngineError::InvalidRole(_)) => {
            return Err(ServerError::Unauthorized(format!("unknown user {user_id}")));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn app(state: ServerState) -> Router {
    Router::new()
        .route("/api/dispatch", post(dispatch::create))
        .route("/api/dispatch/{id}", get(dispatch::get))
        .route("/api/dispatch/approve/{id}", patch(dispatch::approve))
        .route("/api/dispatch/verify/{id}", patch(dispatch::verify))
        .route("/api/dispatch/confirm/{id}", patch(dispatch::confirm))
        .route("/api/dispatch/resend-otp/{id}", patch(dispatch::resend_otp))
        .route("/api/warehouse/{id}/inventory", get(inventory::get))
        .route("/api/ws", get(presence::connect))
        .route_layer(middleware::from_fn_with_state(state.clone(), identity))
        .with_state(state)
}

/// Build the HTTP router around `engine`.
///
/// `presence` must be the same directory the engine's notifier pushes to.
pub fn router(engine: Arc<Engine>, presence: Arc<PresenceDirectory>) -> Router {
    app(ServerState { engine, presence })
}

pub async fn run(engine: Engine, presence: Arc<PresenceDirectory>, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, presence, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    presence: Arc<PresenceDirectory>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine), presence)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    presence: Arc<PresenceDirectory>,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, presence, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
