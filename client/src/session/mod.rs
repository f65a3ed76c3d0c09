//! Session state manager.
//!
//! Owns the signed-in user, the bearer credentials, the companies the user
//! belongs to, the selected company and the user's role in it, and the
//! membership requests shown to the user. Every durable field is written
//! through to the [`KeyValueStore`] on the call that changes it and restored
//! by [`SessionManager::initialize_auth_state`].
//!
//! Changes of the selected company go through a single commit path that
//! publishes [`SessionEvent::CompanyChanged`]. The ownership watcher started by
//! [`SessionManager::init`] re-fetches the account for changes whose publisher
//! did not resolve it.
//!
//! Every selection takes a generation ticket when it starts. A selection
//! commits only when no newer ticket has committed, so a slow answer for an
//! older selection cannot overwrite a newer one, while a newer selection that
//! fails leaves the older answer free to land.

pub mod events;
pub mod navigation;
pub mod state;


pub use events::SessionEvent;
pub use navigation::{Destination, LogNavigator, Navigator};
pub use state::SessionState;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Context;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use validator::Validate;

use crate::api::{HttpApiClient, SessionApi};
use crate::config::Config;
use crate::errors::{ErrorKind, SessionError, SessionResult, validation_message};
use crate::models::{
    AuthResponse, Company, LoginOutcome, LoginRequest, MemberData, MembershipRequest, Ownership,
    RegistrationRequest, SelectionOutcome, User, UserAccount,
};
use crate::storage::{FileStore, KeyValueStore, keys, load_json, save_json};

pub struct SessionManager {
    api: Arc<dyn SessionApi>,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    selection_generation: AtomicU64,
    committed_generation: AtomicU64,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn SessionApi>,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        event_channel_capacity: usize,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(event_channel_capacity.max(1));
        Arc::new(Self {
            api,
            store,
            navigator,
            state: RwLock::new(SessionState::default()),
            events,
            selection_generation: AtomicU64::new(0),
            committed_generation: AtomicU64::new(0),
            watcher: Mutex::new(None),
        })
    }

    /// Builds a manager talking HTTP to the configured API and persisting to
    /// the configured session file.
    pub fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let api = HttpApiClient::new(config).context("Failed to build API client")?;
        let store = FileStore::open(&config.storage_path).with_context(|| {
            format!(
                "Failed to open session storage at {}",
                config.storage_path.display()
            )
        })?;

        Ok(Self::new(
            Arc::new(api),
            Arc::new(store),
            Arc::new(LogNavigator),
            config.event_channel_capacity,
        ))
    }

    /// Starts the ownership watcher and restores the durable session.
    pub async fn init(self: &Arc<Self>) {
        self.start_watcher();
        self.initialize_auth_state().await;
    }

    /// Stops the ownership watcher. Events are still published afterwards but
    /// nothing re-fetches accounts for them.
    pub async fn dispose(&self) {
        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            tracing::debug!("Session manager disposed");
        }
    }

    fn start_watcher(self: &Arc<Self>) {
        let mut watcher = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if watcher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let receiver = self.events.subscribe();
        *watcher = Some(tokio::spawn(events::run_ownership_watcher(
            Arc::downgrade(self),
            receiver,
        )));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    pub fn auth_token(&self) -> Option<String> {
        self.read_state().auth_token.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().refresh_token.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read_state().is_logged_in()
    }

    /// Role in the selected company. `false` while the role is unresolved;
    /// use [`SessionManager::ownership`] to tell the two apart.
    pub fn is_owner(&self) -> bool {
        self.read_state().is_owner()
    }

    pub fn ownership(&self) -> Ownership {
        self.read_state().ownership
    }

    pub fn user(&self) -> User {
        self.read_state().user.clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.read_state().user.id
    }

    pub fn user_email(&self) -> Option<String> {
        self.read_state().user.email.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.read_state().companies.clone()
    }

    pub fn selected_company(&self) -> Option<Company> {
        self.read_state().selected_company.clone()
    }

    pub fn user_account(&self) -> Option<UserAccount> {
        self.read_state().user_account.clone()
    }

    pub fn pending_requests(&self) -> Vec<MembershipRequest> {
        self.read_state().pending_requests.clone()
    }

    pub fn access_requests(&self) -> Vec<MembershipRequest> {
        self.read_state().access_requests.clone()
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Restores the durable session. Never fails: a value that cannot be
    /// decoded is logged and left at its default.
    pub async fn initialize_auth_state(&self) {
        let user = self
            .restore_json::<User>(keys::USER)
            .or_else(|| self.restore_json::<User>(keys::RESOURCE_OWNER));
        let auth_token = self.restore_raw(keys::AUTH_TOKEN);
        let access_token = self.restore_raw(keys::ACCESS_TOKEN);
        let refresh_token = self.restore_raw(keys::REFRESH_TOKEN);
        let selected_company = self.restore_json::<Company>(keys::SELECTED_COMPANY);
        let pending_requests = self.restore_json::<Vec<MembershipRequest>>(keys::PENDING_REQUESTS);
        let access_requests = self.restore_json::<Vec<MembershipRequest>>(keys::ACCESS_REQUESTS);
        let is_owner = self
            .restore_raw(keys::IS_OWNER)
            .and_then(|raw| match raw.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                other => {
                    tracing::error!("Ignoring stored is_owner value {:?}", other);
                    None
                }
            });

        {
            let mut state = self.write_state();
            if let Some(user) = user {
                state.user = user;
            }
            if let Some(token) = auth_token.clone() {
                state.auth_token = Some(token);
            }
            if let Some(token) = access_token {
                state.access_token = Some(token);
            }
            if let Some(token) = refresh_token {
                state.refresh_token = Some(token);
            }
            if let Some(company) = selected_company {
                state.selected_company = Some(company);
                state.ownership = is_owner
                    .map(Ownership::from_is_owner)
                    .unwrap_or(Ownership::Unknown);
            }
            if let Some(requests) = pending_requests {
                state.pending_requests = requests;
            }
            if let Some(requests) = access_requests {
                state.access_requests = requests;
            }
        }

        let Some(token) = auth_token else {
            tracing::debug!("No stored auth token, session starts logged out");
            return;
        };

        self.api.set_bearer_token(Some(&token));
        match self.fetch_user_companies().await {
            Ok(companies) => tracing::info!(
                "Session restored for user {:?} ({} companies)",
                self.user_id(),
                companies.len()
            ),
            Err(e) => tracing::error!("Error during initializeAuthState: {}", e),
        }
    }

    /// Registers a new user and signs them in.
    ///
    /// # Errors
    /// Returns `SessionError` for:
    /// - Invalid payloads (no request is made)
    /// - Rejected registrations, carrying the server message
    /// - Transport failures
    pub async fn register_user(&self, payload: &RegistrationRequest) -> SessionResult<AuthResponse> {
        if let Err(errors) = payload.validate() {
            return Err(SessionError::validation(validation_message(&errors)));
        }

        let authenticated = match self.api.register(payload).await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::error!("Error registering user: {}", e);
                return Err(e);
            }
        };

        let user_id = authenticated.response.user.id;
        self.set_user_info(authenticated.response.user.clone(), authenticated.token)?;
        self.publish(vec![SessionEvent::LoggedIn { user_id }]);
        self.navigator.navigate(Destination::Dashboard);

        Ok(authenticated.response)
    }

    /// Signs in with credentials.
    ///
    /// A refused login is not an error: it yields a `LoginOutcome` with
    /// `success == false` and the message to show. Only transport and decoding
    /// failures are returned as `Err`.
    pub async fn login_user(&self, payload: &LoginRequest) -> SessionResult<LoginOutcome> {
        if let Err(errors) = payload.validate() {
            let message = validation_message(&errors);
            tracing::warn!("Login payload rejected locally: {}", message);
            return Ok(LoginOutcome::failure(message));
        }

        let authenticated = match self.api.sign_in(payload).await {
            Ok(authenticated) => authenticated,
            Err(SessionError::Rejected { status, message }) => {
                tracing::warn!("Login rejected ({}): {}", status, message);
                return Ok(LoginOutcome::failure(message));
            }
            Err(e) => {
                tracing::error!("Error logging in: {}", e);
                return Err(e);
            }
        };

        let user_id = authenticated.response.user.id;
        self.set_user_info(authenticated.response.user.clone(), authenticated.token)?;
        self.publish(vec![SessionEvent::LoggedIn { user_id }]);

        if let Err(e) = self.fetch_user_companies().await {
            tracing::warn!("Signed in but failed to load companies: {}", e);
        }

        self.navigator.navigate(Destination::Dashboard);
        Ok(LoginOutcome::success(authenticated.response))
    }

    /// Exchanges an externally supplied token for a session.
    ///
    /// Returns `Ok(false)` without any request when a credential is already
    /// held.
    pub async fn login_user_with_token(&self, token: &str) -> SessionResult<bool> {
        if self.read_state().holds_any_token() {
            tracing::debug!("Token exchange skipped, a session credential is already held");
            return Ok(false);
        }

        let data = match self.api.member_data(token).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error logging in with token: {}", e);
                return Err(e);
            }
        };

        self.set_user_info_from_token(data)?;
        let user_id = self.user_id();
        self.publish(vec![SessionEvent::LoggedIn { user_id }]);

        Ok(true)
    }

    /// Loads the companies the user is a validated member of.
    ///
    /// With no selection the first company is selected; an empty list clears
    /// the selection.
    pub async fn fetch_user_companies(&self) -> SessionResult<Vec<Company>> {
        let user_id = self.require_user_id()?;
        let companies = self.api.validated_companies(user_id).await?;

        let has_selection = {
            let mut state = self.write_state();
            state.companies = companies.clone();
            state.selected_company.is_some()
        };

        if companies.is_empty() {
            let generation = self.begin_selection();
            self.commit_selection(generation, |state, events| {
                self.apply_selection(state, None, None, false, generation, events)
            })?;
        } else if !has_selection {
            let outcome = self.set_selected_company(companies[0].clone()).await;
            tracing::debug!("Default company selection: {:?}", outcome);
        }

        Ok(companies)
    }

    /// Selects `company` after checking the user's account in it.
    ///
    /// Accepted members and owners get the company selected; anyone else gets
    /// the selection cleared. Failures leave the state untouched and are
    /// reported through the outcome, never as an error.
    pub async fn set_selected_company(&self, company: Company) -> SelectionOutcome {
        let generation = self.begin_selection();

        let user_id = match self.require_user_id() {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::error!("Error setting selected company: {}", e);
                return SelectionOutcome::Failed(ErrorKind::InvalidState);
            }
        };

        let account = match self.api.fetch_account(user_id, company.id).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!("Error setting selected company {}: {}", company.id, e);
                return SelectionOutcome::Failed(e.kind());
            }
        };

        let validated = account.is_validated();
        let is_owner = account.is_owner;
        let company_id = company.id;

        let committed = self.commit_selection(generation, |state, events| {
            if validated {
                self.apply_selection(state, Some(company), Some(account), false, generation, events)
            } else {
                tracing::warn!("Invalid company selection: {}", company_id);
                self.apply_selection(state, None, None, false, generation, events)
            }
        });

        match committed {
            Ok(true) if validated => SelectionOutcome::Selected { is_owner },
            Ok(true) => SelectionOutcome::Rejected,
            Ok(false) => SelectionOutcome::Superseded,
            Err(e) => {
                tracing::error!("Error setting selected company {}: {}", company_id, e);
                SelectionOutcome::Failed(e.kind())
            }
        }
    }

    /// Selects a company known to be valid (for instance one just created)
    /// without the membership check, then refreshes the role and the request
    /// lists for it.
    pub async fn set_preselected_company(&self, company: Company) -> SessionResult<()> {
        let company_id = company.id;
        let generation = self.begin_selection();

        self.commit_selection(generation, |state, events| {
            self.apply_selection(state, Some(company), None, false, generation, events)
        })?;

        if let Err(e) = self.refresh_ownership(company_id, generation).await {
            tracing::error!("Failed to resolve ownership for company {}: {}", company_id, e);
        }

        self.fetch_pending_accounts().await?;
        self.fetch_access_request_accounts().await?;
        Ok(())
    }

    /// Assigns the selected company directly. When the identity changes the
    /// role becomes `Resolving` until the ownership watcher has fetched it.
    pub fn replace_selected_company(&self, company: Option<Company>) -> SessionResult<()> {
        let generation = self.begin_selection();
        self.commit_selection(generation, |state, events| {
            self.apply_selection(state, company, None, true, generation, events)
        })?;
        Ok(())
    }

    pub async fn fetch_pending_accounts(&self) -> SessionResult<Vec<MembershipRequest>> {
        let Some(user_id) = self.read_state().user.valid_id() else {
            tracing::warn!("Skipping pending requests fetch: no user id");
            return Ok(Vec::new());
        };

        let requests = self.api.pending_requests(user_id).await?;
        save_json(self.store.as_ref(), keys::PENDING_REQUESTS, &requests)?;
        self.write_state().pending_requests = requests.clone();

        Ok(requests)
    }

    pub async fn fetch_access_request_accounts(&self) -> SessionResult<Vec<MembershipRequest>> {
        let Some(user_id) = self.read_state().user.valid_id() else {
            tracing::warn!("Skipping access requests fetch: no user id");
            return Ok(Vec::new());
        };

        let requests = self.api.access_requests(user_id).await?;
        save_json(self.store.as_ref(), keys::ACCESS_REQUESTS, &requests)?;
        self.write_state().access_requests = requests.clone();

        Ok(requests)
    }

    /// Stores the user and bearer token of a credential login. The selected
    /// company is left alone.
    pub fn set_user_info(&self, user: User, token: String) -> SessionResult<()> {
        save_json(self.store.as_ref(), keys::USER, &user)?;
        self.store.set(keys::AUTH_TOKEN, &token)?;

        {
            let mut state = self.write_state();
            state.user = user;
            state.auth_token = Some(token.clone());
        }

        self.api.set_bearer_token(Some(&token));
        Ok(())
    }

    /// Stores the result of a token exchange.
    pub fn set_user_info_from_token(&self, data: MemberData) -> SessionResult<()> {
        let user: User = serde_json::from_value(data.resource_owner.clone())?;

        save_json(self.store.as_ref(), keys::RESOURCE_OWNER, &data.resource_owner)?;
        self.store.set(keys::REFRESH_TOKEN, &data.refresh_token)?;
        self.store.set(keys::AUTH_TOKEN, &data.token)?;
        self.store.set(keys::ACCESS_TOKEN, &data.token)?;

        {
            let mut state = self.write_state();
            state.access_token = Some(data.token.clone());
            state.refresh_token = Some(data.refresh_token);
            state.auth_token = Some(data.token.clone());
            state.user = user;
        }

        self.api.set_bearer_token(Some(&data.token));
        Ok(())
    }

    /// Logs out: clears every durable key and resets all fields. Safe to call
    /// when already logged out. The in-memory state is reset even when a
    /// storage removal fails; the first such failure is returned.
    pub fn reset_user_info(&self) -> SessionResult<()> {
        let generation = self.begin_selection();
        let previous = {
            let mut state = self.write_state();
            self.committed_generation.store(generation, Ordering::SeqCst);
            std::mem::take(&mut *state)
        };
        self.api.set_bearer_token(None);

        let mut first_error = None;
        for key in keys::ALL {
            if let Err(e) = self.store.remove(key) {
                tracing::error!("Failed to remove {} from session storage: {}", key, e);
                first_error.get_or_insert(e);
            }
        }

        let mut events = Vec::new();
        if let Some(company) = previous.selected_company.as_ref() {
            events.push(SessionEvent::CompanyChanged {
                previous_id: Some(company.id),
                company: None,
                generation,
                refetch_account: false,
            });
        }
        if previous.is_owner() {
            events.push(SessionEvent::OwnershipChanged { is_owner: false });
        }
        if previous.is_logged_in() {
            events.push(SessionEvent::LoggedOut);
        }
        self.publish(events);

        tracing::info!("User logged out, session storage cleared");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Selection plumbing
    // ------------------------------------------------------------------

    /// Fetches the account for `company_id` and commits its role if the
    /// selection committed as `generation` is still the current one. Returns
    /// `Ok(false)` when a newer selection superseded it.
    ///
    /// When the fetch fails the role drops from `Resolving` to `Unknown`.
    pub(crate) async fn refresh_ownership(
        &self,
        company_id: i64,
        generation: u64,
    ) -> SessionResult<bool> {
        let account = match self.fetch_selected_account(company_id).await {
            Ok(account) => account,
            Err(e) => {
                self.commit_for_current(generation, |state, events| {
                    if state.selected_company_id() == Some(company_id)
                        && state.ownership == Ownership::Resolving
                    {
                        self.persist_ownership(state, Ownership::Unknown, events)?;
                    }
                    Ok(())
                })?;
                return Err(e);
            }
        };

        self.commit_for_current(generation, |state, events| {
            if state.selected_company_id() != Some(company_id) {
                return Ok(());
            }
            self.persist_ownership(state, Ownership::from_is_owner(account.is_owner), events)?;
            state.user_account = Some(account);
            Ok(())
        })
    }

    /// Resolves the role of the current selection if it is still unresolved.
    pub(crate) async fn resolve_pending_ownership(&self) {
        let (company_id, ownership) = {
            let state = self.read_state();
            (state.selected_company_id(), state.ownership)
        };

        let Some(company_id) = company_id else {
            return;
        };
        if ownership != Ownership::Resolving {
            return;
        }

        let generation = self.committed_generation.load(Ordering::SeqCst);
        if let Err(e) = self.refresh_ownership(company_id, generation).await {
            tracing::error!("Failed to refresh ownership for company {}: {}", company_id, e);
        }
    }

    fn begin_selection(&self) -> u64 {
        self.selection_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commits a selection: runs `mutate` under the state lock unless a newer
    /// ticket has already committed, then publishes the events it produced.
    fn commit_selection<F>(&self, generation: u64, mutate: F) -> SessionResult<bool>
    where
        F: FnOnce(&mut SessionState, &mut Vec<SessionEvent>) -> SessionResult<()>,
    {
        let mut events = Vec::new();
        {
            let mut state = self.write_state();
            if self.committed_generation.load(Ordering::SeqCst) >= generation {
                return Ok(false);
            }
            mutate(&mut *state, &mut events)?;
            self.committed_generation.store(generation, Ordering::SeqCst);
        }
        self.publish(events);
        Ok(true)
    }

    /// Amends the selection committed as `generation`; a no-op once another
    /// selection has committed.
    fn commit_for_current<F>(&self, generation: u64, mutate: F) -> SessionResult<bool>
    where
        F: FnOnce(&mut SessionState, &mut Vec<SessionEvent>) -> SessionResult<()>,
    {
        let mut events = Vec::new();
        {
            let mut state = self.write_state();
            if self.committed_generation.load(Ordering::SeqCst) != generation {
                return Ok(false);
            }
            mutate(&mut *state, &mut events)?;
        }
        self.publish(events);
        Ok(true)
    }

    /// The one path that changes the selected company.
    ///
    /// Durable copies are written before the in-memory fields change. With an
    /// `account` the role is resolved immediately; without one a change of
    /// identity leaves the role `Resolving`, and `refetch_account` asks the
    /// ownership watcher to fetch it.
    fn apply_selection(
        &self,
        state: &mut SessionState,
        company: Option<Company>,
        account: Option<UserAccount>,
        refetch_account: bool,
        generation: u64,
        events: &mut Vec<SessionEvent>,
    ) -> SessionResult<()> {
        let previous_id = state.selected_company_id();
        let changed = previous_id != company.as_ref().map(|c| c.id);

        let ownership = match (&company, &account) {
            (None, _) => Ownership::Unknown,
            (Some(_), Some(account)) => Ownership::from_is_owner(account.is_owner),
            (Some(_), None) if changed => Ownership::Resolving,
            (Some(_), None) => state.ownership,
        };

        match &company {
            Some(company) => save_json(self.store.as_ref(), keys::SELECTED_COMPANY, company)?,
            None => self.store.remove(keys::SELECTED_COMPANY)?,
        }
        self.persist_ownership(state, ownership, events)?;

        if account.is_some() || company.is_none() || changed {
            state.user_account = account.clone();
        }
        state.selected_company = company.clone();

        if changed {
            events.push(SessionEvent::CompanyChanged {
                previous_id,
                refetch_account: refetch_account && company.is_some() && account.is_none(),
                company,
                generation,
            });
        }
        Ok(())
    }

    /// Writes the role through to storage and announces a change of
    /// `is_owner`.
    fn persist_ownership(
        &self,
        state: &mut SessionState,
        ownership: Ownership,
        events: &mut Vec<SessionEvent>,
    ) -> SessionResult<()> {
        match ownership {
            Ownership::Owner => self.store.set(keys::IS_OWNER, "true")?,
            Ownership::Member => self.store.set(keys::IS_OWNER, "false")?,
            Ownership::Unknown | Ownership::Resolving => self.store.remove(keys::IS_OWNER)?,
        }

        if state.is_owner() != ownership.is_owner() {
            events.push(SessionEvent::OwnershipChanged {
                is_owner: ownership.is_owner(),
            });
        }
        state.ownership = ownership;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn fetch_selected_account(&self, company_id: i64) -> SessionResult<UserAccount> {
        let user_id = self.require_user_id()?;
        self.api.fetch_account(user_id, company_id).await
    }

    fn require_user_id(&self) -> SessionResult<i64> {
        self.read_state()
            .user
            .valid_id()
            .ok_or_else(|| SessionError::invalid_state("No signed-in user id"))
    }

    fn restore_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to restore {} from session storage: {}", key, e);
                None
            }
        }
    }

    fn restore_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match load_json(self.store.as_ref(), key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to restore {} from session storage: {}", key, e);
                None
            }
        }
    }

    fn publish(&self, events: Vec<SessionEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
