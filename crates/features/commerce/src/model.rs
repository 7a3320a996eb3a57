use chrono::NaiveDate;
use feq_derive::api_model;
use feq_kernel::server::validate::{self, Validate};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u64 = 24;
pub const MAX_PAGE_SIZE: u64 = 100;

// --- Parts ---

#[api_model(deny_unknown_fields = false)]
pub struct Part {
    pub id: Uuid,
    pub slug: String,
    pub sku: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(skip_serializing)]
    pub stripe_price_id: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    pub image_url: Option<String>,
}

pub(crate) const PART_COLUMNS: &str =
    "id,slug,sku,name,brand,category,description,price_cents,stripe_price_id,in_stock,image_url";

/// Catalog search parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PartsQuery {
    /// Free text matched against name, SKU and brand
    pub q: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    /// 1 to 100, default 24
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PartsQuery {
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Search text reduced to characters that cannot alter the filter expression.
    #[must_use]
    pub fn search_text(&self) -> Option<String> {
        let cleaned: String = self
            .q
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-'))
            .take(64)
            .collect();
        let cleaned = cleaned.trim();
        (!cleaned.is_empty()).then(|| cleaned.to_owned())
    }
}

impl Validate for PartsQuery {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit()) {
            return Err(format!("limit must be between 1 and {MAX_PAGE_SIZE}").into());
        }
        for (field, value) in [("category", &self.category), ("brand", &self.brand)] {
            if let Some(value) = value {
                validate::max_len(field, value, 128)?;
            }
        }
        Ok(())
    }
}

#[api_model]
pub struct PartsPage {
    pub items: Vec<Part>,
    /// Matching parts ignoring limit and offset
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

// --- Rentals ---

#[api_model]
pub struct RentalRequest {
    /// e.g. `electric forklift`, `scissor lift`
    pub equipment_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub zip: Option<String>,
    pub notes: Option<String>,
}

impl Validate for RentalRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::non_blank("equipment_type", &self.equipment_type)?;
        validate::max_len("equipment_type", &self.equipment_type, 128)?;
        validate::non_blank("name", &self.name)?;
        validate::max_len("name", &self.name, 256)?;
        validate::email("email", &self.email)?;
        if self.end_date < self.start_date {
            return Err("end_date must not be before start_date".into());
        }
        if let Some(phone) = &self.phone {
            validate::max_len("phone", phone, 32)?;
        }
        if let Some(zip) = &self.zip {
            validate::max_len("zip", zip, 16)?;
        }
        if let Some(notes) = &self.notes {
            validate::max_len("notes", notes, 4000)?;
        }
        Ok(())
    }
}

#[api_model(deny_unknown_fields = false)]
pub struct RentalReceipt {
    pub id: Uuid,
}

// --- Checkout ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutKind {
    Parts,
    Training,
}

impl CheckoutKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parts => "parts",
            Self::Training => "training",
        }
    }
}

#[api_model]
pub struct CartItem {
    pub slug: String,
    pub quantity: u32,
}

#[api_model]
pub struct CheckoutRequest {
    pub kind: CheckoutKind,
    /// Parts orders
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Training orders
    pub course_slug: Option<String>,
    /// Training seats, default 1
    pub seats: Option<u32>,
    /// Buy the seats for this organization
    pub org_id: Option<Uuid>,
    /// Receipt address when not signed in
    pub email: Option<String>,
}

pub const MAX_CART_ITEMS: usize = 50;
pub const MAX_SEATS: u32 = 500;

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        if let Some(email) = &self.email {
            validate::email("email", email)?;
        }
        match self.kind {
            CheckoutKind::Parts => {
                if self.items.is_empty() || self.items.len() > MAX_CART_ITEMS {
                    return Err(format!("between 1 and {MAX_CART_ITEMS} items are required").into());
                }
                if self.items.iter().any(|item| !(1..=99).contains(&item.quantity)) {
                    return Err("quantity must be between 1 and 99".into());
                }
            },
            CheckoutKind::Training => {
                let slug = self.course_slug.as_deref().unwrap_or_default();
                validate::non_blank("course_slug", slug)?;
                if !(1..=MAX_SEATS).contains(&self.seats.unwrap_or(1)) {
                    return Err(format!("seats must be between 1 and {MAX_SEATS}").into());
                }
            },
        }
        Ok(())
    }
}

/// A hosted checkout page.
#[api_model(deny_unknown_fields = false)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[api_model]
pub struct WebhookAck {
    pub received: bool,
}
