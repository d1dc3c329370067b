//! Sales namespace events.

use chrono::NaiveDate;
use common::TenantId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events that can occur on the sales channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SalesEvent {
    /// The rolling daily totals for a business date changed.
    DailySalesUpdated(DailySalesUpdatedData),
}

impl SalesEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SalesEvent::DailySalesUpdated(_) => "DailySalesUpdated",
        }
    }

    pub fn daily_sales_updated(
        tenant: TenantId,
        business_date: NaiveDate,
        orders: u64,
        gross_total: Decimal,
        net_total: Decimal,
    ) -> Self {
        SalesEvent::DailySalesUpdated(DailySalesUpdatedData {
            tenant,
            business_date,
            orders,
            gross_total,
            net_total,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySalesUpdatedData {
    pub tenant: TenantId,
    pub business_date: NaiveDate,
    pub orders: u64,
    pub gross_total: Decimal,
    pub net_total: Decimal,
}
