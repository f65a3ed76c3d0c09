//! Access to the remote REST API.
//!
//! [`SessionApi`] lists the endpoints the session manager depends on;
//! [`HttpApiClient`] implements it over `reqwest` and also offers the generic
//! JSON helpers the rest of the front-end uses for its own resources.

pub mod client;
#[cfg(test)]
pub(crate) mod mock;

pub use client::{DeleteResponse, HttpApiClient};

use crate::errors::SessionResult;
use crate::models::{
    Authenticated, Company, LoginRequest, MemberData, MembershipRequest, RegistrationRequest,
    UserAccount,
};
use async_trait::async_trait;

/// Endpoints consumed by the session manager.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// `POST users`
    async fn register(&self, payload: &RegistrationRequest) -> SessionResult<Authenticated>;

    /// `POST users/sign_in`
    async fn sign_in(&self, payload: &LoginRequest) -> SessionResult<Authenticated>;

    /// `GET member_data`, authenticated with an externally supplied token.
    async fn member_data(&self, token: &str) -> SessionResult<MemberData>;

    /// `GET accounts/{user_id}/validated_companies_accounts`
    async fn validated_companies(&self, user_id: i64) -> SessionResult<Vec<Company>>;

    /// `GET accounts/{user_id}/companies/{company_id}/fetch_account`
    async fn fetch_account(&self, user_id: i64, company_id: i64) -> SessionResult<UserAccount>;

    /// `GET accounts/{user_id}/pending_requests`
    async fn pending_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>>;

    /// `GET accounts/{user_id}/access_requests`
    async fn access_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>>;

    /// Called whenever the session's bearer token changes so later requests
    /// can carry it. Implementations without authenticated requests ignore it.
    fn set_bearer_token(&self, _token: Option<&str>) {}
}
