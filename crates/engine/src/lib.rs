//! Dispatch workflow engine.
//!
//! The engine owns the dispatch lifecycle (create, approve/reject,
//! verify/confirm), the one-time passcodes guarding Trading dispatches and the
//! per-warehouse inventory ledger that settled dispatches move. All state is
//! kept in the database; every workflow operation runs in a single database
//! transaction.

pub use commands::NewDispatchCmd;
pub use dispatches::{Destination, Dispatch, DispatchEvent, DispatchKind, DispatchStatus};
pub use error::EngineError;
pub use inventory::{InventoryEntry, Movement};
pub use notify::{
    DISPATCH_TREATED, DispatchNotice, LiveChannel, LiveEvent, LivePayload, LogMailer, Mail,
    Mailer, Notifier, NotifyError, Offline, RetryPolicy,
};
pub use ops::{Engine, EngineBuilder, TradingSettlement};
pub use otps::DEFAULT_OTP_TTL;
pub use roles::{Capability, Role};
pub use users::Staff;

mod clients;
mod commands;
mod commodities;
mod dispatches;
mod error;
mod inventory;
mod notify;
mod ops;
mod otps;
mod roles;
mod users;
mod util;
mod warehouses;

type ResultEngine<T> = Result<T, EngineError>;
