//! Driver coupon administration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::format;
use crate::domain::{EntityId, ListScreen};

/// Collection endpoint.
pub const COUPONS_PATH: &str = "/admin/coupons";

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// `value` is a percentage of the fare.
    Percentage,
    /// `value` is an absolute amount.
    Fixed,
}

/// Coupon as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRow {
    /// Backend id.
    pub id: EntityId,
    /// Redemption code.
    pub code: String,
    /// Discount type; absent means a fixed amount.
    #[serde(default, alias = "type")]
    pub discount_type: Option<DiscountKind>,
    /// Discount value.
    #[serde(default, alias = "value")]
    pub discount_value: Option<f64>,
    /// Remaining redemptions.
    #[serde(default)]
    pub usage_limit: Option<u32>,
    /// Times redeemed.
    #[serde(default)]
    pub used_count: u32,
    /// Last valid day.
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    /// Whether drivers can redeem it.
    #[serde(default = "active_by_default")]
    pub active: bool,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn active_by_default() -> bool {
    true
}

/// Row shown in the coupons table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponView {
    /// Backend id.
    pub id: EntityId,
    /// Redemption code.
    pub code: String,
    /// `15%` or `500.00`.
    pub discount: String,
    /// `used / limit`, or just `used` when unlimited.
    pub usage: String,
    /// Expiry day.
    pub expires: String,
    /// `Active` or `Inactive`.
    pub state: &'static str,
}

/// Paginated coupons screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponList;

impl ListScreen for CouponList {
    type Row = CouponRow;
    type View = CouponView;

    fn label(&self) -> &'static str {
        "Coupon"
    }

    fn collection_path(&self) -> String {
        COUPONS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "coupons"
    }

    fn project(&self, row: &CouponRow) -> CouponView {
        let discount = match (row.discount_type, row.discount_value) {
            (_, None) => format::MISSING.to_owned(),
            (Some(DiscountKind::Percentage), Some(value)) => format!("{value}%"),
            (_, Some(value)) => format::amount(Some(value)),
        };
        let usage = row.usage_limit.map_or_else(
            || row.used_count.to_string(),
            |limit| format!("{} / {limit}", row.used_count),
        );
        CouponView {
            id: row.id.clone(),
            code: row.code.clone(),
            discount,
            usage,
            expires: row
                .expires_on
                .map_or_else(|| format::MISSING.to_owned(), |day| day.to_string()),
            state: if row.active { "Active" } else { "Inactive" },
        }
    }
}
