//! In-memory session fields.

use crate::models::{Company, MembershipRequest, Ownership, User, UserAccount};

/// Everything the session manager knows about the signed-in operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub auth_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: User,
    pub companies: Vec<Company>,
    pub selected_company: Option<Company>,
    pub user_account: Option<UserAccount>,
    pub ownership: Ownership,
    pub pending_requests: Vec<MembershipRequest>,
    pub access_requests: Vec<MembershipRequest>,
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        self.auth_token.is_some()
    }

    pub fn is_owner(&self) -> bool {
        self.ownership.is_owner()
    }

    pub fn selected_company_id(&self) -> Option<i64> {
        self.selected_company.as_ref().map(|company| company.id)
    }

    /// True when some login pathway already produced a credential.
    pub fn holds_any_token(&self) -> bool {
        self.auth_token.is_some() || self.access_token.is_some() || self.refresh_token.is_some()
    }
}
