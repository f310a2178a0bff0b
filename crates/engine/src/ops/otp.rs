use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    otps::{self, generate_code, hash_code, verify_code},
};

use super::Engine;

/// Runs argon2 work off the async workers.
async fn blocking<T, F>(work: F) -> ResultEngine<T>
where
    T: Send + 'static,
    F: FnOnce() -> ResultEngine<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| EngineError::Hashing(format!("hashing task failed: {err}")))?
}

impl Engine {
    /// Issues a fresh passcode for `dispatch_id`, replacing any outstanding
    /// one, and returns the plaintext for out-of-band delivery.
    pub(super) async fn issue_otp(
        &self,
        db: &DatabaseTransaction,
        dispatch_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        let code = generate_code()?;
        let hashed = {
            let code = code.clone();
            blocking(move || hash_code(&code)).await?
        };

        self.discard_otps(db, dispatch_id).await?;
        otps::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            dispatch_id: ActiveValue::Set(dispatch_id.to_string()),
            otp: ActiveValue::Set(hashed),
            expire_in: ActiveValue::Set(now + self.otp_ttl),
        }
        .insert(db)
        .await?;

        Ok(code)
    }

    /// Checks `code` against the outstanding passcode of `dispatch_id`.
    ///
    /// Returns the record on a match; the caller deletes it once the
    /// transition it guards has gone through. A missing or expired passcode is
    /// `KeyNotFound`, a wrong one `Authentication`.
    pub(super) async fn redeem_otp(
        &self,
        db: &DatabaseTransaction,
        dispatch_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<otps::Model> {
        let record = otps::Entity::find()
            .filter(otps::Column::DispatchId.eq(dispatch_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("otp not exists".to_string()))?;

        if record.is_expired(now) {
            return Err(EngineError::KeyNotFound("otp expired".to_string()));
        }

        let matches = {
            let code = code.to_string();
            let hashed = record.otp.clone();
            blocking(move || verify_code(&code, &hashed)).await?
        };
        if !matches {
            return Err(EngineError::Authentication("invalid otp".to_string()));
        }
        Ok(record)
    }

    pub(super) async fn discard_otps(
        &self,
        db: &DatabaseTransaction,
        dispatch_id: Uuid,
    ) -> ResultEngine<u64> {
        let result = otps::Entity::delete_many()
            .filter(otps::Column::DispatchId.eq(dispatch_id.to_string()))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
