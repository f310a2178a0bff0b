//! Command structs for engine operations.
//!
//! Dispatch creation arrives straight from a request body, so every field is
//! optional here and the engine reports what is missing.

use uuid::Uuid;

use crate::DispatchKind;

/// Create a dispatch on behalf of `user_id`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewDispatchCmd {
    pub kind: Option<DispatchKind>,
    pub commodity_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub gross_weight: Option<f64>,
    pub net_weight: Option<f64>,
    pub num_bags: Option<i64>,
    pub driver: Option<String>,
    pub truck_num: Option<String>,
    pub user_id: String,
}

impl NewDispatchCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// A Trading dispatch towards `client_id`.
    #[must_use]
    pub fn trading(user_id: impl Into<String>, client_id: Uuid) -> Self {
        let mut cmd = Self::new(user_id);
        cmd.kind = Some(DispatchKind::Trading);
        cmd.client_id = Some(client_id);
        cmd
    }

    /// An Inter warehouse dispatch towards `warehouse_id`.
    #[must_use]
    pub fn inter_warehouse(user_id: impl Into<String>, warehouse_id: Uuid) -> Self {
        let mut cmd = Self::new(user_id);
        cmd.kind = Some(DispatchKind::InterWarehouse);
        cmd.warehouse_id = Some(warehouse_id);
        cmd
    }

    #[must_use]
    pub fn commodity(mut self, commodity_id: Uuid) -> Self {
        self.commodity_id = Some(commodity_id);
        self
    }

    #[must_use]
    pub fn load(mut self, num_bags: i64, gross_weight: f64) -> Self {
        self.num_bags = Some(num_bags);
        self.gross_weight = Some(gross_weight);
        self
    }

    #[must_use]
    pub fn net_weight(mut self, net_weight: f64) -> Self {
        self.net_weight = Some(net_weight);
        self
    }

    #[must_use]
    pub fn transport(mut self, driver: impl Into<String>, truck_num: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self.truck_num = Some(truck_num.into());
        self
    }
}
