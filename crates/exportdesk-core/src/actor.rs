//! Actors and the identity providers that issue them.
//!
//! The core never derives a role from caller-supplied data: an [`Actor`] is
//! obtained from an [`IdentityProvider`] (client sessions) or resolved from
//! the profile store by [`StoreIdentity`] (server requests).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use exportdesk_shared::slug::generate_user_code;
use exportdesk_shared::{Role, UserId};
use exportdesk_store::{Profile, ProfileUpdate, Store, StoreError};

use crate::error::{CoreError, Result};

/// An authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn buyer(id: UserId) -> Self {
        Self::new(id, Role::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Source of the current actor for a client session.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in actor, if any.
    fn current_actor(&self) -> Option<Actor>;

    /// Notified whenever the signed-in actor changes.
    fn subscribe(&self) -> watch::Receiver<Option<Actor>>;
}

/// The signed-in actor, or [`CoreError::Authorization`].
pub fn require_actor(identity: &dyn IdentityProvider) -> Result<Actor> {
    identity.current_actor().ok_or(CoreError::Authorization)
}

/// In-process session holding whoever is signed in.
#[derive(Debug)]
pub struct SessionIdentity {
    tx: watch::Sender<Option<Actor>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, actor: Actor) {
        info!(actor = %actor.id, role = %actor.role, "session signed in");
        self.tx.send_replace(Some(actor));
    }

    pub fn sign_out(&self) {
        if let Some(actor) = self.tx.send_replace(None) {
            info!(actor = %actor.id, "session signed out");
        }
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_actor(&self) -> Option<Actor> {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Actor>> {
        self.tx.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Profile-backed resolution
// ---------------------------------------------------------------------------

/// Sign-up data for a new buyer profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
}

/// Resolves authenticated user ids to actors using the profile table.
#[derive(Clone)]
pub struct StoreIdentity {
    store: Arc<dyn Store>,
}

impl StoreIdentity {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Look up the role of an authenticated user.
    ///
    /// Unknown and deactivated users are rejected.
    pub async fn resolve(&self, user_id: UserId) -> Result<Actor> {
        match self.store.get_profile(user_id).await? {
            Some(profile) if profile.active => Ok(Actor::new(profile.user_id, profile.role)),
            Some(_) => {
                warn!(user = %user_id, "deactivated user rejected");
                Err(CoreError::Authorization)
            }
            None => {
                warn!(user = %user_id, "unknown user rejected");
                Err(CoreError::Authorization)
            }
        }
    }

    /// Create the profile of a newly signed-up buyer.
    ///
    /// Every new profile gets role `user` and a random two-digit code.
    pub async fn register(&self, new: NewProfile) -> Result<Profile> {
        let username = new.username.trim();
        let email = new.email.trim();
        if username.is_empty() {
            return Err(CoreError::validation("username is required"));
        }
        if !email.contains('@') {
            return Err(CoreError::validation("a valid email is required"));
        }
        let now = chrono::Utc::now();
        let profile = Profile {
            user_id: new.user_id,
            username: username.to_string(),
            email: email.to_string(),
            phone: new.phone.trim().to_string(),
            company_name: new
                .company_name
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            country: new.country.trim().to_string(),
            state: new.state.trim().to_string(),
            city: new.city.trim().to_string(),
            user_code: generate_user_code(),
            role: Role::User,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_profile(&profile).await?;

        info!(user = %profile.user_id, code = %profile.user_code, "profile registered");
        Ok(profile)
    }

    /// The caller's own profile.
    pub async fn profile(&self, actor: &Actor) -> Result<Profile> {
        self.store
            .get_profile(actor.id)
            .await?
            .ok_or_else(|| CoreError::not_found("profile", actor.id))
    }

    /// Edit the caller's own contact details.
    ///
    /// Only the fields of [`ProfileUpdate`] can change; role, user code and
    /// the active flag stay as they are.
    pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> Result<Profile> {
        let update = normalize_update(update)?;
        match self.store.update_profile(actor.id, &update).await {
            Ok(profile) => {
                info!(user = %actor.id, "profile updated");
                Ok(profile)
            }
            Err(StoreError::NotFound) => Err(CoreError::not_found("profile", actor.id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn normalize_update(update: ProfileUpdate) -> Result<ProfileUpdate> {
    let trim = |field: Option<String>| field.map(|v| v.trim().to_string());
    let update = ProfileUpdate {
        username: trim(update.username),
        email: trim(update.email),
        phone: trim(update.phone),
        company_name: trim(update.company_name),
        country: trim(update.country),
        state: trim(update.state),
        city: trim(update.city),
    };

    if update.is_empty() {
        return Err(CoreError::validation("no profile fields to update"));
    }
    if update.username.as_deref() == Some("") {
        return Err(CoreError::validation("username is required"));
    }
    if let Some(email) = &update.email {
        if !email.contains('@') {
            return Err(CoreError::validation("a valid email is required"));
        }
    }
    Ok(update)
}
