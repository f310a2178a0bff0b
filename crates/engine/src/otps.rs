//! One-time passcodes gating the final step of a Trading dispatch.
//!
//! Only the argon2 PHC string of a code is stored. The plaintext leaves the
//! engine once, through the notifier, when the dispatch is approved.

use std::time::Duration;

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
    password_hash::{Error::Password, SaltString},
};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine};

/// Default lifetime of an issued passcode.
pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(5 * 60);

const CODE_MIN: u32 = 1000;
const CODE_SPAN: u32 = 9000;

fn random_bytes<const N: usize>() -> ResultEngine<[u8; N]> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|err| EngineError::Hashing(format!("random source failed: {err}")))?;
    Ok(bytes)
}

/// Draws a uniformly distributed 4-digit code (`1000..=9999`).
pub fn generate_code() -> ResultEngine<String> {
    // Largest multiple of CODE_SPAN that fits in u32, to avoid modulo bias.
    let zone = u32::MAX - (u32::MAX % CODE_SPAN);
    loop {
        let value = u32::from_le_bytes(random_bytes::<4>()?);
        if value < zone {
            return Ok((CODE_MIN + value % CODE_SPAN).to_string());
        }
    }
}

/// This is cpu bound, call it with [`tokio::task::spawn_blocking`].
pub fn hash_code(code: &str) -> ResultEngine<String> {
    let salt = SaltString::encode_b64(&random_bytes::<16>()?)
        .map_err(|err| EngineError::Hashing(err.to_string()))?;
    Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::Hashing(err.to_string()))
}

/// This is cpu bound, call it with [`tokio::task::spawn_blocking`].
///
/// A malformed stored hash is an internal error, not a mismatch.
pub fn verify_code(code: &str, hashed: &str) -> ResultEngine<bool> {
    let parsed = PasswordHash::new(hashed).map_err(|err| EngineError::Hashing(err.to_string()))?;
    match Argon2::default().verify_password(code.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(Password) => Ok(false),
        Err(err) => Err(EngineError::Hashing(err.to_string())),
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "dispatch_otps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub dispatch_id: String,
    pub otp: String,
    pub expire_in: DateTimeUtc,
}

impl Model {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expire_in
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dispatches::Entity",
        from = "Column::DispatchId",
        to = "super::dispatches::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Dispatches,
}

impl Related<super::dispatches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dispatches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
