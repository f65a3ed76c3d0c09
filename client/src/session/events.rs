//! Session events and the ownership watcher.
//!
//! The watcher is the subscriber that keeps `is_owner` consistent with the
//! selected company when the path that changed the selection did not resolve
//! the account itself.

use std::sync::Weak;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::SessionManager;
use crate::models::Company;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The identity of the selected company changed.
    CompanyChanged {
        previous_id: Option<i64>,
        company: Option<Company>,
        /// Selection generation that produced this change.
        generation: u64,
        /// Set when nobody resolved the account for the new company yet.
        refetch_account: bool,
    },
    OwnershipChanged {
        is_owner: bool,
    },
    LoggedIn {
        user_id: Option<i64>,
    },
    LoggedOut,
}

pub(crate) async fn run_ownership_watcher(
    manager: Weak<SessionManager>,
    mut receiver: broadcast::Receiver<SessionEvent>,
) {
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Ownership watcher lagged behind by {} events", skipped);
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.resolve_pending_ownership().await;
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let SessionEvent::CompanyChanged {
            company: Some(company),
            generation,
            refetch_account: true,
            ..
        } = event
        else {
            continue;
        };

        let Some(manager) = manager.upgrade() else {
            break;
        };

        match manager.refresh_ownership(company.id, generation).await {
            Ok(true) => tracing::debug!("Ownership resolved for company {}", company.id),
            Ok(false) => tracing::debug!(
                "Ownership fetch for company {} superseded by a newer selection",
                company.id
            ),
            Err(e) => tracing::error!(
                "Failed to refresh ownership for company {}: {}",
                company.id,
                e
            ),
        }
    }

    tracing::debug!("Ownership watcher stopped");
}
