//! User upserter
//!
//! Users are the delicate case of the merge policy: accounts may exist
//! locally before the panel knows them (registration flow), and the local
//! credential and onboarding state must survive every refresh from the
//! panel. Lookup goes by panel id first, then by email; a row matched by
//! email gets its panel id backfilled.

use std::sync::Arc;

use chrono::Utc;

use panelsync_core::domain::merge;
use panelsync_core::domain::newtypes::Email;
use panelsync_core::domain::panel::PanelUser;
use panelsync_core::domain::run::UpsertOutcome;
use panelsync_core::ports::mirror_repository::IMirrorRepository;

use super::skip;

/// Reconciles panel user records into local accounts
#[derive(Clone)]
pub struct UserUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl UserUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the local account for one panel user record
    ///
    /// On a match (by panel id or email) only panel-owned fields are
    /// refreshed and `last_synced_at` is stamped; the existing password
    /// hash and migration flag are preserved byte-for-byte. On a miss a
    /// new account is created with no password and the migration flag
    /// unset - it is not usable for password login until the registration
    /// flow completes it.
    pub async fn reconcile(&self, record: &PanelUser) -> UpsertOutcome {
        let now = Utc::now();

        let by_panel_id = match self.mirror.find_user_by_panel_id(record.id).await {
            Ok(user) => user,
            Err(e) => return skip(record.id, "load user by panel id", &e),
        };

        let existing = match by_panel_id {
            Some(user) => Some(user),
            None => {
                // The account may have been registered locally first;
                // match it by email so we adopt it instead of duplicating.
                let email = match Email::new(record.email.clone()) {
                    Ok(email) => email,
                    Err(e) => return skip(record.id, "parse email", &e),
                };
                match self.mirror.find_user_by_email(&email).await {
                    Ok(user) => user,
                    Err(e) => return skip(record.id, "load user by email", &e),
                }
            }
        };

        match existing {
            Some(mut user) => {
                if let Err(e) = merge::apply_panel_user(&mut user, record, now) {
                    return skip(record.id, "map user", &e);
                }
                match self.mirror.upsert_user(&user).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update user", &e),
                }
            }
            None => {
                let user = match merge::new_user(record, now) {
                    Ok(user) => user,
                    Err(e) => return skip(record.id, "map user", &e),
                };
                match self.mirror.upsert_user(&user).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create user", &e),
                }
            }
        }
    }
}
