//! Company and financial domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A company principals can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for company listings (substring match on name).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyQuery {
    pub name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A financial ledger scoped to one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Financial {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub company_uuid: Uuid,
    /// Public uuid of the principal that opened the ledger.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One line item of a financial ledger.
///
/// `value_cents` is a signed amount in minor currency units; negative values
/// are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialDetail {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub financial_uuid: Uuid,
    pub value_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A ledger together with its line items, oldest item first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialWithDetails {
    #[serde(flatten)]
    pub financial: Financial,
    pub details: Vec<FinancialDetail>,
}

/// Filter for financial listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinancialQuery {
    pub company: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
