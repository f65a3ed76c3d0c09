//! Session state for the supply-chain administration front-end.
//!
//! [`SessionManager`] holds who is signed in, which companies they belong to,
//! which company is selected and whether they own it. It talks to the REST API
//! through [`api::SessionApi`] and keeps a durable copy of the session in a
//! [`storage::KeyValueStore`] so a restart resumes where the user left off.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;
pub mod storage;

pub use config::Config;
pub use errors::{ErrorKind, SessionError, SessionResult};
pub use session::{SessionEvent, SessionManager, SessionState};
