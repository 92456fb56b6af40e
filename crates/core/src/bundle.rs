//! Bundles: priced subscription packages with a time- or day-based term.
//!
//! A bundle's term is governed by its `type`: `Duration` bundles carry a
//! start and expiry date, `ExpiryDays` bundles carry a day count. The
//! payload sent to the backend always contains all three keys, with the
//! ones not used by the type set to `null`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::form::has_unsaved_input;
use crate::types::{lenient_timestamp, DbId, Guid, Timestamp};
use crate::validation::FieldErrors;

// ---------------------------------------------------------------------------
// Bundle type and term
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleType {
    /// Access between a start and an expiry date.
    #[default]
    Duration,
    /// Access for a number of days after activation.
    ExpiryDays,
}

impl BundleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Duration => "Duration",
            Self::ExpiryDays => "ExpiryDays",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Duration" | "duration" => Ok(Self::Duration),
            "ExpiryDays" | "expiry_days" | "expiry-days" => Ok(Self::ExpiryDays),
            _ => Err(CoreError::Validation(format!(
                "Invalid bundle type '{s}'. Must be one of: Duration, ExpiryDays"
            ))),
        }
    }
}

/// The populated half of a bundle's term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleTerm {
    Duration { start_at: NaiveDate, expire_at: NaiveDate },
    ExpiryDays(u32),
}

impl BundleTerm {
    pub fn bundle_type(&self) -> BundleType {
        match self {
            Self::Duration { .. } => BundleType::Duration,
            Self::ExpiryDays(_) => BundleType::ExpiryDays,
        }
    }
}

/// Midnight UTC of a calendar day; the backend stores term dates as days.
pub fn day_start(date: NaiveDate) -> Timestamp {
    date.and_time(NaiveTime::MIN).and_utc()
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// A subject service attached to a bundle, as returned by `GET /bundles/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleSubjectService {
    #[serde(alias = "id")]
    pub subject_service_id: DbId,
    pub subject_id: DbId,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Guid,
    pub name: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default, alias = "image_Url")]
    pub image_url: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub discount: i32,
    #[serde(rename = "type", default)]
    pub bundle_type: BundleType,
    #[serde(
        rename = "startAt",
        default,
        deserialize_with = "lenient_timestamp::deserialize"
    )]
    pub start_at: Option<Timestamp>,
    #[serde(
        rename = "expireAt",
        default,
        deserialize_with = "lenient_timestamp::deserialize"
    )]
    pub expire_at: Option<Timestamp>,
    #[serde(rename = "expiryDays", default)]
    pub expiry_days: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "subjectServiceIds", default)]
    pub subject_service_ids: Vec<DbId>,
    #[serde(rename = "subjectServices", default)]
    pub subject_services: Vec<BundleSubjectService>,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub updated_at: Option<Timestamp>,
}

impl Bundle {
    /// Display name, preferring the secondary-locale name when present.
    pub fn display_name(&self) -> &str {
        self.name_en
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }

    pub fn final_price(&self) -> f64 {
        final_price(self.price, self.discount)
    }

    /// The term as stored, if the populated fields match the type.
    pub fn term(&self) -> Option<BundleTerm> {
        match self.bundle_type {
            BundleType::Duration => match (self.start_at, self.expire_at) {
                (Some(start), Some(expire)) => Some(BundleTerm::Duration {
                    start_at: start.date_naive(),
                    expire_at: expire.date_naive(),
                }),
                _ => None,
            },
            BundleType::ExpiryDays => self
                .expiry_days
                .and_then(|d| u32::try_from(d).ok())
                .map(BundleTerm::ExpiryDays),
        }
    }

    /// Active bundles must be deactivated before they are edited or deleted.
    pub fn ensure_mutable(&self) -> Result<(), CoreError> {
        if self.is_active {
            return Err(CoreError::Conflict(format!(
                "Bundle '{}' is active; deactivate it before editing or deleting",
                self.display_name()
            )));
        }
        Ok(())
    }
}

/// `price` after a percentage `discount`.
pub fn final_price(price: f64, discount: i32) -> f64 {
    price - (price * f64::from(discount) / 100.0)
}

/// Two-decimal rendering used for prices and totals.
pub fn format_price(value: f64) -> String {
    format!("{value:.2}")
}

// ---------------------------------------------------------------------------
// Write payload
// ---------------------------------------------------------------------------

/// Body of `POST /bundles` and `PUT /bundles/{id}`.
///
/// The term fields are private so the type invariant cannot be broken:
/// exactly one of {`startAt`+`expireAt`} or {`expiryDays`} is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundlePayload {
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub description_en: String,
    // Backend key casing.
    #[serde(rename = "image_Url")]
    pub image_url: String,
    pub price: f64,
    pub discount: i32,
    #[serde(rename = "type")]
    bundle_type: BundleType,
    #[serde(rename = "startAt")]
    start_at: Option<Timestamp>,
    #[serde(rename = "expireAt")]
    expire_at: Option<Timestamp>,
    #[serde(rename = "expiryDays")]
    expiry_days: Option<u32>,
    #[serde(rename = "subjectServiceIds")]
    pub subject_service_ids: Vec<DbId>,
    #[serde(rename = "voucherCount", skip_serializing_if = "Option::is_none")]
    pub voucher_count: Option<u32>,
}

impl BundlePayload {
    pub fn new(
        name: impl Into<String>,
        price: f64,
        discount: i32,
        term: BundleTerm,
        subject_service_ids: Vec<DbId>,
    ) -> Self {
        let mut payload = Self {
            name: name.into(),
            name_en: String::new(),
            description: String::new(),
            description_en: String::new(),
            image_url: String::new(),
            price,
            discount,
            bundle_type: term.bundle_type(),
            start_at: None,
            expire_at: None,
            expiry_days: None,
            subject_service_ids,
            voucher_count: None,
        };
        payload.set_term(term);
        payload
    }

    /// Replace the term, nulling the fields the new type does not use.
    pub fn set_term(&mut self, term: BundleTerm) {
        self.bundle_type = term.bundle_type();
        match term {
            BundleTerm::Duration {
                start_at,
                expire_at,
            } => {
                self.start_at = Some(day_start(start_at));
                self.expire_at = Some(day_start(expire_at));
                self.expiry_days = None;
            }
            BundleTerm::ExpiryDays(days) => {
                self.start_at = None;
                self.expire_at = None;
                self.expiry_days = Some(days);
            }
        }
    }

    pub fn bundle_type(&self) -> BundleType {
        self.bundle_type
    }

    pub fn start_at(&self) -> Option<Timestamp> {
        self.start_at
    }

    pub fn expire_at(&self) -> Option<Timestamp> {
        self.expire_at
    }

    pub fn expiry_days(&self) -> Option<u32> {
        self.expiry_days
    }
}

// ---------------------------------------------------------------------------
// Create / edit form
// ---------------------------------------------------------------------------

/// Fields that carry their own validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleField {
    Name,
    Description,
    Price,
    Discount,
    ExpiryDays,
    StartAt,
    ExpireAt,
    Subjects,
    Services,
}

impl BundleField {
    pub const ALL: [BundleField; 9] = [
        BundleField::Name,
        BundleField::Description,
        BundleField::Price,
        BundleField::Discount,
        BundleField::ExpiryDays,
        BundleField::StartAt,
        BundleField::ExpireAt,
        BundleField::Subjects,
        BundleField::Services,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::Discount => "discount",
            Self::ExpiryDays => "expiryDays",
            Self::StartAt => "startAt",
            Self::ExpireAt => "expireAt",
            Self::Subjects => "subjects",
            Self::Services => "services",
        }
    }
}

/// Raw form state for creating or editing a bundle.
///
/// Inputs are kept as typed text so that validation can report exactly
/// what is wrong with them; [`BundleForm::to_create_payload`] and
/// [`BundleForm::to_update_payload`] turn a valid form into a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleForm {
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub description_en: String,
    pub image_url: String,
    pub price: String,
    pub discount: String,
    pub bundle_type: BundleType,
    pub expiry_days: String,
    pub start_at: String,
    pub expire_at: String,
    pub voucher_count: String,
    pub subject_ids: Vec<DbId>,
    pub service_ids: Vec<DbId>,
}

impl Default for BundleForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            name_en: String::new(),
            description: String::new(),
            description_en: String::new(),
            image_url: String::new(),
            price: String::new(),
            discount: "0".to_string(),
            bundle_type: BundleType::Duration,
            expiry_days: String::new(),
            start_at: String::new(),
            expire_at: String::new(),
            voucher_count: "0".to_string(),
            subject_ids: Vec::new(),
            service_ids: Vec::new(),
        }
    }
}

impl BundleForm {
    /// Prefill an edit form from a loaded bundle.
    pub fn from_bundle(bundle: &Bundle) -> Self {
        let date_input = |ts: Option<Timestamp>| {
            ts.map(|t| t.date_naive().format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        let mut subject_ids: Vec<DbId> = Vec::new();
        for ss in &bundle.subject_services {
            if !subject_ids.contains(&ss.subject_id) {
                subject_ids.push(ss.subject_id);
            }
        }
        let service_ids = if bundle.subject_services.is_empty() {
            bundle.subject_service_ids.clone()
        } else {
            bundle
                .subject_services
                .iter()
                .map(|ss| ss.subject_service_id)
                .collect()
        };

        Self {
            name: bundle.name.clone(),
            name_en: bundle.name_en.clone().unwrap_or_default(),
            description: bundle.description.clone().unwrap_or_default(),
            description_en: bundle.description_en.clone().unwrap_or_default(),
            image_url: bundle.image_url.clone().unwrap_or_default(),
            price: bundle.price.to_string(),
            discount: bundle.discount.to_string(),
            bundle_type: bundle.bundle_type,
            expiry_days: bundle
                .expiry_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
            start_at: date_input(bundle.start_at),
            expire_at: date_input(bundle.expire_at),
            voucher_count: "0".to_string(),
            subject_ids,
            service_ids,
        }
    }

    /// Validate one field, as done when it loses focus.
    pub fn validate_field(&self, field: BundleField) -> Option<String> {
        match field {
            BundleField::Name => self
                .name
                .trim()
                .is_empty()
                .then(|| "Name is required".to_string()),
            BundleField::Description => self
                .description
                .trim()
                .is_empty()
                .then(|| "Description is required".to_string()),
            BundleField::Price => self.parse_price().err(),
            BundleField::Discount => self.parse_discount().err(),
            BundleField::ExpiryDays => match self.bundle_type {
                BundleType::ExpiryDays => self.parse_expiry_days().err(),
                BundleType::Duration => None,
            },
            BundleField::StartAt => match self.bundle_type {
                BundleType::Duration => self.parse_start().err(),
                BundleType::ExpiryDays => None,
            },
            BundleField::ExpireAt => match self.bundle_type {
                BundleType::Duration => self.check_expire().err(),
                BundleType::ExpiryDays => None,
            },
            BundleField::Subjects => self
                .subject_ids
                .is_empty()
                .then(|| "At least one subject must be selected".to_string()),
            BundleField::Services => self
                .service_ids
                .is_empty()
                .then(|| "At least one service must be selected".to_string()),
        }
    }

    /// Validate every field, as done on submit.
    pub fn validate_all(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in BundleField::ALL {
            errors.set(field.key(), self.validate_field(field));
        }
        errors
    }

    /// Whether cancelling would lose typed input.
    pub fn has_unsaved_data(&self) -> bool {
        has_unsaved_input(
            &[
                &self.name,
                &self.name_en,
                &self.description,
                &self.description_en,
                &self.price,
                &self.image_url,
            ],
            self.subject_ids.len() + self.service_ids.len(),
        )
    }

    pub fn to_create_payload(&self) -> Result<BundlePayload, FieldErrors> {
        let mut payload = self.to_update_payload()?;
        let count = self.voucher_count.trim();
        payload.voucher_count = Some(if count.is_empty() {
            0
        } else {
            count.parse::<u32>().map_err(|_| {
                let mut errors = FieldErrors::new();
                errors.insert("voucherCount", "Voucher count must be a whole number");
                errors
            })?
        });
        Ok(payload)
    }

    pub fn to_update_payload(&self) -> Result<BundlePayload, FieldErrors> {
        self.validate_all().into_result()?;

        let (price, discount, term) = match (self.parse_price(), self.parse_discount(), self.term())
        {
            (Ok(p), Ok(d), Ok(t)) => (p, d, t),
            _ => return Err(self.validate_all()),
        };

        let mut payload = BundlePayload::new(
            self.name.trim(),
            price,
            discount,
            term,
            self.service_ids.clone(),
        );
        payload.name_en = self.name_en.trim().to_string();
        payload.description = self.description.trim().to_string();
        payload.description_en = self.description_en.trim().to_string();
        payload.image_url = self.image_url.trim().to_string();
        Ok(payload)
    }

    /// The parsed term for the selected type.
    pub fn term(&self) -> Result<BundleTerm, String> {
        match self.bundle_type {
            BundleType::ExpiryDays => self.parse_expiry_days().map(BundleTerm::ExpiryDays),
            BundleType::Duration => {
                let expire_at = self.check_expire()?;
                let start_at = self.parse_start()?;
                Ok(BundleTerm::Duration {
                    start_at,
                    expire_at,
                })
            }
        }
    }

    fn parse_price(&self) -> Result<f64, String> {
        let raw = self.price.trim();
        if raw.is_empty() {
            return Err("Price is required".to_string());
        }
        let price: f64 = raw
            .parse()
            .map_err(|_| "Price must be a number".to_string())?;
        if !price.is_finite() {
            return Err("Price must be a number".to_string());
        }
        if price < 0.0 {
            return Err("Price must be positive".to_string());
        }
        Ok(price)
    }

    fn parse_discount(&self) -> Result<i32, String> {
        let raw = self.discount.trim();
        let discount: i32 = if raw.is_empty() {
            0
        } else {
            raw.parse()
                .map_err(|_| "Discount must be a whole number".to_string())?
        };
        if !(0..=100).contains(&discount) {
            return Err("Discount must be between 0 and 100".to_string());
        }
        Ok(discount)
    }

    fn parse_expiry_days(&self) -> Result<u32, String> {
        match self.expiry_days.trim().parse::<i64>() {
            Ok(days) if days >= 1 => {
                u32::try_from(days).map_err(|_| "Expiry days is too large".to_string())
            }
            _ => Err("Expiry days is required (minimum 1)".to_string()),
        }
    }

    fn parse_start(&self) -> Result<NaiveDate, String> {
        parse_date(&self.start_at, "Start date is required", "Start date")
    }

    fn check_expire(&self) -> Result<NaiveDate, String> {
        let expire = parse_date(&self.expire_at, "Expiration date is required", "Expiration date")?;
        if let Ok(start) = self.parse_start() {
            if expire <= start {
                return Err("Expiration must be after start date".to_string());
            }
        }
        Ok(expire)
    }
}

fn parse_date(raw: &str, missing: &str, label: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(missing.to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("{label} must be a valid date (YYYY-MM-DD)"))
}
