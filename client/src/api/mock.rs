//! Scripted [`SessionApi`] for tests: canned replies per endpoint plus a log
//! of every call made.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::SessionApi;
use crate::errors::{SessionError, SessionResult};
use crate::models::{
    AuthResponse, Authenticated, Company, LoginRequest, MemberData, MembershipRequest,
    MembershipStatus, RegistrationRequest, User, UserAccount,
};

/// Clonable stand-in for a [`SessionError`].
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Rejected(u16, String),
    Transport(String),
}

impl From<Failure> for SessionError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Rejected(status, message) => SessionError::rejected(status, message),
            Failure::Transport(message) => SessionError::transport(message),
        }
    }
}

type Reply<T> = Result<T, Failure>;

pub(crate) struct MockApi {
    auth: Mutex<Reply<Authenticated>>,
    member: Mutex<Reply<MemberData>>,
    companies: Mutex<Reply<Vec<Company>>>,
    accounts: Mutex<HashMap<i64, Reply<UserAccount>>>,
    account_delays: Mutex<HashMap<i64, Duration>>,
    pending: Mutex<Vec<MembershipRequest>>,
    access: Mutex<Vec<MembershipRequest>>,
    calls: Mutex<Vec<String>>,
    bearer: Mutex<Option<String>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            auth: Mutex::new(Err(Failure::Rejected(401, "Invalid Email or password.".into()))),
            member: Mutex::new(Err(Failure::Rejected(401, "Unauthorized".into()))),
            companies: Mutex::new(Ok(Vec::new())),
            accounts: Mutex::new(HashMap::new()),
            account_delays: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            access: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            bearer: Mutex::new(None),
        }
    }
}

pub(crate) fn user(id: i64) -> User {
    User {
        id: Some(id),
        username: Some(format!("user{}", id)),
        email: Some(format!("user{}@acme.fr", id)),
    }
}

pub(crate) fn account(company_id: i64, status: MembershipStatus, is_owner: bool) -> UserAccount {
    UserAccount {
        id: Some(100 + company_id),
        user_id: Some(7),
        company_id: Some(company_id),
        status,
        is_owner,
        extra: Default::default(),
    }
}

pub(crate) fn request(id: i64, company_name: &str) -> MembershipRequest {
    MembershipRequest {
        id: Some(id),
        company_id: None,
        company_name: Some(company_name.to_string()),
        requester_email: Some("user7@acme.fr".to_string()),
        requested_owner_rights: Some(false),
        request_status: Some("pending".to_string()),
        extra: Default::default(),
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sign_in(self, user: User, token: &str) -> Self {
        *self.auth.lock().unwrap() = Ok(Authenticated {
            response: AuthResponse {
                user,
                extra: Default::default(),
            },
            token: token.to_string(),
        });
        self
    }

    pub fn with_auth_failure(self, failure: Failure) -> Self {
        *self.auth.lock().unwrap() = Err(failure);
        self
    }

    pub fn with_member_data(self, data: MemberData) -> Self {
        *self.member.lock().unwrap() = Ok(data);
        self
    }

    pub fn with_companies(self, companies: Vec<Company>) -> Self {
        *self.companies.lock().unwrap() = Ok(companies);
        self
    }

    pub fn with_companies_failure(self, failure: Failure) -> Self {
        *self.companies.lock().unwrap() = Err(failure);
        self
    }

    pub fn with_account(self, company_id: i64, account: UserAccount) -> Self {
        self.set_account(company_id, Ok(account));
        self
    }

    pub fn with_account_failure(self, company_id: i64, failure: Failure) -> Self {
        self.set_account(company_id, Err(failure));
        self
    }

    pub fn with_account_delay(self, company_id: i64, delay: Duration) -> Self {
        self.account_delays.lock().unwrap().insert(company_id, delay);
        self
    }

    pub fn with_pending(self, requests: Vec<MembershipRequest>) -> Self {
        *self.pending.lock().unwrap() = requests;
        self
    }

    pub fn with_access(self, requests: Vec<MembershipRequest>) -> Self {
        *self.access.lock().unwrap() = requests;
        self
    }

    pub fn set_account(&self, company_id: i64, reply: Reply<UserAccount>) {
        self.accounts.lock().unwrap().insert(company_id, reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn bearer(&self) -> Option<String> {
        self.bearer.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SessionApi for MockApi {
    async fn register(&self, _payload: &RegistrationRequest) -> SessionResult<Authenticated> {
        self.record("register".to_string());
        let reply = self.auth.lock().unwrap().clone();
        reply.map_err(Into::into)
    }

    async fn sign_in(&self, _payload: &LoginRequest) -> SessionResult<Authenticated> {
        self.record("sign_in".to_string());
        let reply = self.auth.lock().unwrap().clone();
        reply.map_err(Into::into)
    }

    async fn member_data(&self, token: &str) -> SessionResult<MemberData> {
        self.record(format!("member_data:{}", token));
        let reply = self.member.lock().unwrap().clone();
        reply.map_err(Into::into)
    }

    async fn validated_companies(&self, user_id: i64) -> SessionResult<Vec<Company>> {
        self.record(format!("validated_companies:{}", user_id));
        let reply = self.companies.lock().unwrap().clone();
        reply.map_err(Into::into)
    }

    async fn fetch_account(&self, user_id: i64, company_id: i64) -> SessionResult<UserAccount> {
        self.record(format!("fetch_account:{}:{}", user_id, company_id));
        let delay = self.account_delays.lock().unwrap().get(&company_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .accounts
            .lock()
            .unwrap()
            .get(&company_id)
            .cloned()
            .unwrap_or_else(|| Err(Failure::Rejected(404, "Account not found".into())));
        reply.map_err(Into::into)
    }

    async fn pending_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>> {
        self.record(format!("pending_requests:{}", user_id));
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn access_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>> {
        self.record(format!("access_requests:{}", user_id));
        Ok(self.access.lock().unwrap().clone())
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        *self.bearer.lock().unwrap() = token.map(str::to_string);
    }
}
