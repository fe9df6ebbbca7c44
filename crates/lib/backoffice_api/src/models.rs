//! Request and response bodies.

use backoffice_core::auth::lifecycle::SignUp;
use backoffice_core::models::auth::PrincipalProfile;
use backoffice_core::models::company::{Company, Financial};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error body shared by every failing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub password_confirmation: String,
}

impl From<SignUpRequest> for SignUp {
    fn from(r: SignUpRequest) -> Self {
        SignUp {
            email: r.email,
            name: r.name,
            password: r.password,
            password_confirmation: r.password_confirmation,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverEmailRequest {
    pub email: String,
}

/// New password plus confirmation, for reset and change.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFinancialRequest {
    pub company: Uuid,
}

/// Line item amount in minor currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFinancialDetailRequest {
    pub value_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PrincipalProfile>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyListResponse {
    pub companies: Vec<Company>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialListResponse {
    pub financials: Vec<Financial>,
    pub total: i64,
}
