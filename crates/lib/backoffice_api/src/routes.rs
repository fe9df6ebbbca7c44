//! Route table: one entry per (method, path) with its access requirement.

use axum::routing::{MethodFilter, MethodRouter, on};
use backoffice_core::auth::guard::Access;
use backoffice_core::models::auth::Role;

use crate::AppState;
use crate::handlers::{auth, companies, financials, users};

pub const POST_AUTH_SIGNUP: &str = "/auth/signup";
pub const POST_AUTH_SIGNIN: &str = "/auth/signin";
pub const POST_AUTH_REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const GET_AUTH_CONFIRM_TOKEN: &str = "/auth/confirm/{token}";
pub const POST_AUTH_SEND_RECOVER_EMAIL: &str = "/auth/send-recover-email";
pub const PATCH_AUTH_RESET_PASSWORD_TOKEN: &str = "/auth/reset-password/{token}";
pub const PATCH_AUTH_UUID_CHANGE_PASSWORD: &str = "/auth/{uuid}/change-password";
pub const USERS: &str = "/users";
pub const USERS_UUID: &str = "/users/{uuid}";
pub const COMPANIES: &str = "/companies";
pub const GET_COMPANIES_ME: &str = "/companies/me";
pub const COMPANIES_UUID: &str = "/companies/{uuid}";
pub const POST_COMPANIES_UUID_USERS_USER_UUID: &str = "/companies/{uuid}/users/{user_uuid}";
pub const FINANCIALS: &str = "/financials";
pub const FINANCIALS_UUID: &str = "/financials/{uuid}";
pub const POST_FINANCIALS_UUID_DETAILS: &str = "/financials/{uuid}/details";

const ADMIN: Access = Access::Role(Role::Admin);

/// Handler behind a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SignUp,
    SignIn,
    RefreshToken,
    Me,
    ConfirmEmail,
    SendRecoverEmail,
    ResetPassword,
    ChangePassword,
    CreateAdmin,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
    CreateCompany,
    ListCompanies,
    MyCompanies,
    GetCompany,
    UpdateCompany,
    DeleteCompany,
    LinkUser,
    CreateFinancial,
    ListFinancials,
    GetFinancial,
    DeleteFinancial,
    CreateFinancialDetail,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub endpoint: Endpoint,
    pub method: MethodFilter,
    pub path: &'static str,
    pub access: Access,
}

const fn spec(
    endpoint: Endpoint,
    method: MethodFilter,
    path: &'static str,
    access: Access,
) -> RouteSpec {
    RouteSpec {
        endpoint,
        method,
        path,
        access,
    }
}

/// Every route the API serves.
pub const ROUTES: &[RouteSpec] = &[
    // Accounts
    spec(Endpoint::SignUp, MethodFilter::POST, POST_AUTH_SIGNUP, Access::Public),
    spec(Endpoint::SignIn, MethodFilter::POST, POST_AUTH_SIGNIN, Access::Public),
    spec(Endpoint::RefreshToken, MethodFilter::POST, POST_AUTH_REFRESH_TOKEN, Access::Public),
    spec(Endpoint::Me, MethodFilter::GET, GET_AUTH_ME, Access::Profile),
    spec(Endpoint::ConfirmEmail, MethodFilter::GET, GET_AUTH_CONFIRM_TOKEN, Access::Public),
    spec(Endpoint::SendRecoverEmail, MethodFilter::POST, POST_AUTH_SEND_RECOVER_EMAIL, Access::Public),
    spec(Endpoint::ResetPassword, MethodFilter::PATCH, PATCH_AUTH_RESET_PASSWORD_TOKEN, Access::Public),
    spec(Endpoint::ChangePassword, MethodFilter::PATCH, PATCH_AUTH_UUID_CHANGE_PASSWORD, Access::Authenticated),
    // Users
    spec(Endpoint::CreateAdmin, MethodFilter::POST, USERS, ADMIN),
    spec(Endpoint::ListUsers, MethodFilter::GET, USERS, ADMIN),
    spec(Endpoint::GetUser, MethodFilter::GET, USERS_UUID, ADMIN),
    spec(Endpoint::UpdateUser, MethodFilter::PATCH, USERS_UUID, Access::Authenticated),
    spec(Endpoint::DeleteUser, MethodFilter::DELETE, USERS_UUID, ADMIN),
    // Companies
    spec(Endpoint::CreateCompany, MethodFilter::POST, COMPANIES, ADMIN),
    spec(Endpoint::ListCompanies, MethodFilter::GET, COMPANIES, ADMIN),
    spec(Endpoint::MyCompanies, MethodFilter::GET, GET_COMPANIES_ME, Access::Authenticated),
    spec(Endpoint::GetCompany, MethodFilter::GET, COMPANIES_UUID, Access::Authenticated),
    spec(Endpoint::UpdateCompany, MethodFilter::PATCH, COMPANIES_UUID, ADMIN),
    spec(Endpoint::DeleteCompany, MethodFilter::DELETE, COMPANIES_UUID, ADMIN),
    spec(Endpoint::LinkUser, MethodFilter::POST, POST_COMPANIES_UUID_USERS_USER_UUID, ADMIN),
    // Financials
    spec(Endpoint::CreateFinancial, MethodFilter::POST, FINANCIALS, Access::Authenticated),
    spec(Endpoint::ListFinancials, MethodFilter::GET, FINANCIALS, ADMIN),
    spec(Endpoint::GetFinancial, MethodFilter::GET, FINANCIALS_UUID, Access::Authenticated),
    spec(Endpoint::DeleteFinancial, MethodFilter::DELETE, FINANCIALS_UUID, ADMIN),
    spec(Endpoint::CreateFinancialDetail, MethodFilter::POST, POST_FINANCIALS_UUID_DETAILS, Access::Authenticated),
];

/// Method router for a single table entry, without its access layer.
pub fn method_router(route: &RouteSpec) -> MethodRouter<AppState> {
    let m = route.method;
    match route.endpoint {
        Endpoint::SignUp => on(m, auth::sign_up),
        Endpoint::SignIn => on(m, auth::sign_in),
        Endpoint::RefreshToken => on(m, auth::refresh_token),
        Endpoint::Me => on(m, auth::me),
        Endpoint::ConfirmEmail => on(m, auth::confirm_email),
        Endpoint::SendRecoverEmail => on(m, auth::send_recover_email),
        Endpoint::ResetPassword => on(m, auth::reset_password),
        Endpoint::ChangePassword => on(m, auth::change_password),
        Endpoint::CreateAdmin => on(m, users::create_admin),
        Endpoint::ListUsers => on(m, users::list_users),
        Endpoint::GetUser => on(m, users::get_user),
        Endpoint::UpdateUser => on(m, users::update_user),
        Endpoint::DeleteUser => on(m, users::delete_user),
        Endpoint::CreateCompany => on(m, companies::create_company),
        Endpoint::ListCompanies => on(m, companies::list_companies),
        Endpoint::MyCompanies => on(m, companies::my_companies),
        Endpoint::GetCompany => on(m, companies::get_company),
        Endpoint::UpdateCompany => on(m, companies::update_company),
        Endpoint::DeleteCompany => on(m, companies::delete_company),
        Endpoint::LinkUser => on(m, companies::link_user),
        Endpoint::CreateFinancial => on(m, financials::create_financial),
        Endpoint::ListFinancials => on(m, financials::list_financials),
        Endpoint::GetFinancial => on(m, financials::get_financial),
        Endpoint::DeleteFinancial => on(m, financials::delete_financial),
        Endpoint::CreateFinancialDetail => on(m, financials::create_financial_detail),
    }
}
