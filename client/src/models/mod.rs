//! Data structures exchanged with the REST API and held in the session.
//!
//! Server records are decoded leniently: fields the session does not use are
//! kept in an `extra` map so they survive a round trip through durable storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Signed-in operator. The empty form has every field unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    /// Id usable as a path parameter; unset and zero ids are not.
    pub fn valid_id(&self) -> Option<i64> {
        self.id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Company {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: None,
            email: None,
            phone: None,
            extra: Map::new(),
        }
    }
}

/// Status of a membership between a user and a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MembershipStatus {
    Pending,
    Accepted,
    Rejected,
    Other(String),
}

impl From<String> for MembershipStatus {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Other(value),
        }
    }
}

impl From<MembershipStatus> for String {
    fn from(status: MembershipStatus) -> Self {
        match status {
            MembershipStatus::Pending => "pending".to_string(),
            MembershipStatus::Accepted => "accepted".to_string(),
            MembershipStatus::Rejected => "rejected".to_string(),
            MembershipStatus::Other(value) => value,
        }
    }
}

/// Membership record binding the user to a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<i64>,
    pub status: MembershipStatus,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserAccount {
    /// Accepted members and owners may act under the company.
    pub fn is_validated(&self) -> bool {
        self.status == MembershipStatus::Accepted || self.is_owner
    }
}

/// Pending or incoming access request shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_owner_rights: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1-255 characters"
    ))]
    pub username: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

/// Body of `POST users`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(nested)]
    pub user: NewUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginCredentials {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body of `POST users/sign_in`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(nested)]
    pub user: LoginCredentials,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: LoginCredentials {
                email: email.into(),
                password: password.into(),
            },
        }
    }
}

/// Body of a successful registration or sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded sign-in/registration answer together with the bearer token taken
/// from the `Authorization` response header.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub response: AuthResponse,
    pub token: String,
}

/// Answer of `GET member_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberData {
    pub resource_owner: Value,
    pub token: String,
    pub refresh_token: String,
}

/// Result of [`crate::session::SessionManager::login_user`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthResponse>,
}

impl LoginOutcome {
    pub fn success(data: AuthResponse) -> Self {
        Self {
            success: true,
            message: "Login successful".to_string(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Whether the role for the selected company can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// No company selected or never resolved.
    #[default]
    Unknown,
    /// The selected company changed and its account fetch has not landed.
    Resolving,
    Member,
    Owner,
}

impl Ownership {
    pub fn from_is_owner(is_owner: bool) -> Self {
        if is_owner { Self::Owner } else { Self::Member }
    }

    pub fn is_owner(self) -> bool {
        self == Self::Owner
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Member | Self::Owner)
    }
}

/// Result of [`crate::session::SessionManager::set_selected_company`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The account is accepted or owned; the company is now selected.
    Selected { is_owner: bool },
    /// The account is not validated; the selection was cleared.
    Rejected,
    /// The account fetch failed; state is unchanged.
    Failed(crate::errors::ErrorKind),
    /// A newer selection committed before this one finished.
    Superseded,
}
