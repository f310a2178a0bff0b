use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of every dispatch API response.
///
/// `error` is `false` on success; `data` is omitted on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

pub mod dispatch {
    use chrono::{DateTime, Utc};

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum DispatchType {
        #[serde(rename = "Inter warehouse")]
        InterWarehouse,
        Trading,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum DispatchStatus {
        Pending,
        Approved,
        Rejected,
        Verified,
        Completed,
    }

    /// Request body for creating a dispatch.
    ///
    /// Every field is optional on the wire; the server reports the missing
    /// ones. Exactly one of `client` (Trading) or `warehouse` (Inter
    /// warehouse, the destination) must be set.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DispatchNew {
        #[serde(rename = "type")]
        pub kind: Option<DispatchType>,
        pub commodity: Option<Uuid>,
        pub client: Option<Uuid>,
        pub warehouse: Option<Uuid>,
        pub gross_weight: Option<f64>,
        pub net_weight: Option<f64>,
        pub num_bags: Option<i64>,
        pub driver: Option<String>,
        pub truck_num: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispatchApprove {
        #[serde(rename = "isApproved")]
        pub is_approved: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispatchVerify {
        pub otp: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispatchConfirm {
        #[serde(rename = "isReceived")]
        pub is_received: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispatchView {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: DispatchType,
        pub commodity: Uuid,
        pub client: Option<Uuid>,
        pub warehouse: Option<Uuid>,
        pub gross_weight: f64,
        pub net_weight: Option<f64>,
        pub num_bags: i64,
        pub driver: String,
        pub truck_num: String,
        pub status: DispatchStatus,
        #[serde(rename = "isApproved")]
        pub is_approved: bool,
        #[serde(rename = "isReceived")]
        pub is_received: Option<bool>,
        #[serde(rename = "createdBy")]
        pub created_by: String,
        #[serde(rename = "approvedBy")]
        pub approved_by: Option<String>,
        #[serde(rename = "createdAt")]
        pub created_at: DateTime<Utc>,
        #[serde(rename = "updatedAt")]
        pub updated_at: DateTime<Utc>,
    }
}

pub mod inventory {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InventoryEntryView {
        pub commodity: Uuid,
        pub quantity: i64,
        pub weight: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InventoryView {
        pub warehouse: Uuid,
        pub inventory: Vec<InventoryEntryView>,
    }
}

pub mod live {
    use super::*;

    /// Frame pushed over the live connection, e.g. `dispatch-treated`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LiveFrame {
        pub event: String,
        pub data: LiveData,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LiveData {
        pub message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub otp: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch::*, *};

    #[test]
    fn dispatch_type_uses_display_names() {
        let body: DispatchNew = serde_json::from_str(
            r#"{"type": "Inter warehouse", "num_bags": 20, "gross_weight": 400}"#,
        )
        .unwrap();
        assert_eq!(body.kind, Some(DispatchType::InterWarehouse));
        assert_eq!(body.num_bags, Some(20));
        assert!(body.client.is_none());
    }

    #[test]
    fn error_envelope_omits_data() {
        let json = serde_json::to_value(Envelope::error("dispatch not exists")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": true, "message": "dispatch not exists"})
        );
    }

    #[test]
    fn approve_body_is_camel_case() {
        let body: DispatchApprove = serde_json::from_str(r#"{"isApproved": false}"#).unwrap();
        assert_eq!(body.is_approved, Some(false));
    }
}
