//! Vouchers: single-use redemption codes generated against a bundle.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::bundle::Bundle;
use crate::error::CoreError;
use crate::types::{lenient_timestamp, DbId, Guid, Timestamp};
use crate::validation::FieldErrors;

/// Vouchers generated when no count is given.
pub const DEFAULT_GENERATE_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Guid,
    pub code: String,
    pub bundle_id: Guid,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub used_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub created_at: Option<Timestamp>,
}

impl Voucher {
    pub fn status(&self) -> VoucherStatus {
        VoucherStatus::derive(self.is_active, self.used_at.is_some())
    }

    /// Used vouchers can no longer change state.
    pub fn ensure_mutable(&self) -> Result<(), CoreError> {
        if self.used_at.is_some() {
            return Err(CoreError::Conflict(format!(
                "Voucher {} has already been used",
                self.code
            )));
        }
        Ok(())
    }
}

/// Derived voucher state. Never stored; always computed from
/// `is_active` and `used_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    Available,
    Used,
    Inactive,
}

impl VoucherStatus {
    pub fn derive(is_active: bool, used: bool) -> Self {
        if used {
            Self::Used
        } else if is_active {
            Self::Available
        } else {
            Self::Inactive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Used => "Used",
            Self::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "used" => Ok(Self::Used),
            "inactive" => Ok(Self::Inactive),
            _ => Err(CoreError::Validation(format!(
                "Invalid voucher status '{s}'. Must be one of: Available, Used, Inactive"
            ))),
        }
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A voucher joined with the display names of its bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherRow {
    pub voucher: Voucher,
    pub status: VoucherStatus,
    pub bundle_name: String,
    pub bundle_name_primary: String,
    pub bundle_name_en: String,
}

/// Join loaded vouchers with the loaded bundle list by `bundle_id`.
pub fn enrich(vouchers: Vec<Voucher>, bundles: &[Bundle]) -> Vec<VoucherRow> {
    let by_id: HashMap<Guid, &Bundle> = bundles.iter().map(|b| (b.id, b)).collect();
    vouchers
        .into_iter()
        .map(|voucher| {
            let bundle = by_id.get(&voucher.bundle_id);
            let bundle_name = bundle
                .map(|b| b.display_name().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown Bundle".to_string());
            VoucherRow {
                status: voucher.status(),
                bundle_name_primary: bundle.map(|b| b.name.clone()).unwrap_or_default(),
                bundle_name_en: bundle.and_then(|b| b.name_en.clone()).unwrap_or_default(),
                bundle_name,
                voucher,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Pre-aggregated counts from `/vouchers/stats/{grade|bundle}/{id}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStats {
    #[serde(rename = "total_vouchers", default)]
    pub total: u64,
    #[serde(rename = "available_vouchers", default)]
    pub available: u64,
    #[serde(rename = "used_vouchers", default)]
    pub used: u64,
    #[serde(rename = "inactive_vouchers", default)]
    pub inactive: u64,
}

/// Where voucher statistics come from for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    Bundle(Guid),
    Grade(DbId),
    /// No scope: every count is zero and nothing is fetched.
    None,
}

impl StatsSource {
    pub fn select(grade_id: Option<DbId>, bundle_id: Option<Guid>) -> Self {
        match (grade_id, bundle_id) {
            (None, _) => Self::None,
            (Some(_), Some(bundle)) => Self::Bundle(bundle),
            (Some(grade), None) => Self::Grade(grade),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /bundles/{id}/vouchers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Validate)]
pub struct GenerateVouchers {
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Voucher count must be between 1 and 10000"
    ))]
    pub count: u32,
}

impl Default for GenerateVouchers {
    fn default() -> Self {
        Self {
            count: DEFAULT_GENERATE_COUNT,
        }
    }
}

impl GenerateVouchers {
    pub fn new(count: u32) -> Result<Self, FieldErrors> {
        let request = Self { count };
        request.validate().map_err(FieldErrors::from)?;
        Ok(request)
    }
}

/// Body of `POST /vouchers/bulk/set-active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSetActive {
    pub voucher_ids: Vec<Guid>,
    pub is_active: bool,
}

impl BulkSetActive {
    pub fn new(voucher_ids: Vec<Guid>, is_active: bool) -> Result<Self, CoreError> {
        if voucher_ids.is_empty() {
            return Err(CoreError::Validation(
                "Select at least one voucher".to_string(),
            ));
        }
        Ok(Self {
            voucher_ids,
            is_active,
        })
    }
}

/// Body of the unused-voucher bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleVouchersRequest {
    pub bundle_id: Guid,
}

/// Body of `POST /vouchers/export`; the response is raw xlsx bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportVouchersRequest {
    pub grade_id: DbId,
    pub bundle_guids: Option<Vec<Guid>>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub is_used: Option<bool>,
}

impl ExportVouchersRequest {
    /// Export every voucher of a grade, optionally narrowed to one bundle.
    pub fn for_selection(grade_id: DbId, bundle_id: Option<Guid>) -> Self {
        Self {
            grade_id,
            bundle_guids: bundle_id.map(|b| vec![b]),
            created_from: None,
            created_to: None,
            is_used: None,
        }
    }
}
