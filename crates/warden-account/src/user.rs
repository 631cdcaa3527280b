//! User records and their storage collaborator.

use std::collections::BTreeMap;

use jiff::Timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use warden_core::{Page, Pagination, UserId};

use crate::error::{AccountError, Result};

/// Account status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserStatus {
    /// The account may log in.
    #[default]
    Active,
    /// Logins and token use are refused.
    Disabled,
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique identity.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Encoded password hash. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Account status.
    pub status: UserStatus,
    /// Timestamp of the last successful login or registration.
    pub last_login_at: Option<Timestamp>,
    /// Invitation code used at registration.
    pub invitation_code: Option<String>,
    /// Identity that issued the invitation.
    pub invited_by: Option<UserId>,
    /// Timestamp when the account was created.
    pub created_at: Timestamp,
    /// Timestamp when the account was last updated.
    pub updated_at: Timestamp,
    /// Timestamp when the account was soft-deleted.
    pub deleted_at: Option<Timestamp>,
}

impl UserRecord {
    /// Returns `true` if the account may log in.
    #[inline]
    #[must_use]
    pub fn can_login(&self) -> bool {
        self.status == UserStatus::Active && self.deleted_at.is_none()
    }
}

/// Data for creating a new user.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Encoded password hash.
    pub password_hash: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Initial status.
    pub status: UserStatus,
    /// Invitation code used at registration.
    pub invitation_code: Option<String>,
    /// Identity that issued the invitation.
    pub invited_by: Option<UserId>,
}

/// Storage for user accounts.
///
/// Lookups never return soft-deleted records. Uniqueness of usernames and
/// emails covers soft-deleted records too.
pub trait UserStore: Send + Sync {
    /// Inserts a new user and assigns its identity.
    ///
    /// Fails with [`AccountError::UsernameTaken`], then
    /// [`AccountError::EmailTaken`], on a uniqueness violation.
    fn create(&self, user: NewUser) -> Result<UserRecord>;

    /// Finds a live user by identity.
    fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Finds a live user by username.
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Finds a live user by email.
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Replaces a live user record, stamping `updated_at`.
    fn update(&self, user: UserRecord) -> Result<UserRecord>;

    /// Soft-deletes a live user.
    fn delete(&self, id: UserId) -> Result<()>;

    /// Lists live users ordered by identity.
    fn list(&self, pagination: Pagination) -> Result<Page<UserRecord>>;
}

#[derive(Debug, Default)]
struct StoreState {
    last_id: u64,
    users: BTreeMap<UserId, UserRecord>,
}

impl StoreState {
    fn check_unique(&self, username: &str, email: &str, except: Option<UserId>) -> Result<()> {
        let others = || self.users.values().filter(move |user| Some(user.id) != except);

        if others().any(|user| user.username == username) {
            return Err(AccountError::UsernameTaken);
        }
        if others().any(|user| user.email == email) {
            return Err(AccountError::EmailTaken);
        }

        Ok(())
    }

    fn live(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id).filter(|user| user.deleted_at.is_none())
    }

    fn find_live(&self, predicate: impl Fn(&UserRecord) -> bool) -> Option<UserRecord> {
        self.users
            .values()
            .find(|user| user.deleted_at.is_none() && predicate(user))
            .cloned()
    }
}

/// In-memory [`UserStore`].
///
/// Identities are assigned sequentially starting at 1.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    state: RwLock<StoreState>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn create(&self, user: NewUser) -> Result<UserRecord> {
        let mut state = self.state.write();
        state.check_unique(&user.username, &user.email, None)?;

        state.last_id += 1;
        let now = Timestamp::now();
        let record = UserRecord {
            id: UserId::new(state.last_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            status: user.status,
            last_login_at: None,
            invitation_code: user.invitation_code,
            invited_by: user.invited_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.users.insert(record.id, record.clone());

        Ok(record)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.state.read().live(id).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.state.read().find_live(|user| user.username == username))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self.state.read().find_live(|user| user.email == email))
    }

    fn update(&self, mut user: UserRecord) -> Result<UserRecord> {
        let mut state = self.state.write();
        if state.live(user.id).is_none() {
            return Err(AccountError::UserNotFound(user.id));
        }
        state.check_unique(&user.username, &user.email, Some(user.id))?;

        user.updated_at = Timestamp::now();
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    fn delete(&self, id: UserId) -> Result<()> {
        let mut state = self.state.write();
        let user = state
            .users
            .get_mut(&id)
            .filter(|user| user.deleted_at.is_none())
            .ok_or(AccountError::UserNotFound(id))?;

        let now = Timestamp::now();
        user.deleted_at = Some(now);
        user.updated_at = now;

        Ok(())
    }

    fn list(&self, pagination: Pagination) -> Result<Page<UserRecord>> {
        let state = self.state.read();
        let live: Vec<_> = state
            .users
            .values()
            .filter(|user| user.deleted_at.is_none())
            .collect();

        Ok(Page {
            total: live.len() as u64,
            items: pagination.apply(live.into_iter()).cloned().collect(),
        })
    }
}
