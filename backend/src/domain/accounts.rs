//! Account management: registration, login, profiles.
//!
//! Password hashes use argon2id. Token/session mechanics live entirely in
//! the inbound layer; this service only answers "who is this".

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::Utc;
use pagination::{Page, PageRequest};
use serde::Deserialize;
use utoipa::ToSchema;

use super::Error;
use super::ids::UserId;
use super::ports::{UserRepository, map_repository_error};
use super::user::{self, Actor, Role, User};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Registration payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Name shown to other participants.
    pub display_name: String,
    /// Login email.
    pub email: String,
    /// Plain-text password; hashed before storage.
    pub password: String,
    /// Requested role; `admin` cannot be self-assigned.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Driving port for account operations.
#[async_trait]
pub trait AccountsApi: Send + Sync {
    /// Register a new account.
    async fn register(&self, request: RegistrationRequest) -> Result<User, Error>;

    /// Verify credentials and return the account.
    async fn login(&self, email: &str, password: &str) -> Result<User, Error>;

    /// Fetch the account behind a session principal.
    async fn me(&self, user: UserId) -> Result<User, Error>;

    /// Update the actor's display name.
    async fn update_profile(&self, actor: Actor, display_name: &str) -> Result<User, Error>;

    /// Page through all accounts. Admin only.
    async fn list_users(&self, actor: Actor, page: PageRequest) -> Result<Page<User>, Error>;
}

/// Accounts service over the user repository port.
#[derive(Clone)]
pub struct AccountsService<U> {
    users: Arc<U>,
}

impl<U> AccountsService<U> {
    /// Create a new service.
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    fn hash_password(password: &str) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::internal(format!("password hashing failed: {e}")))
    }

    fn verify_password(password: &str, stored: &str) -> bool {
        PasswordHash::new(stored)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl<U> AccountsApi for AccountsService<U>
where
    U: UserRepository,
{
    async fn register(&self, request: RegistrationRequest) -> Result<User, Error> {
        let display_name = user::validate_display_name(&request.display_name)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        let email = user::validate_email(&request.email)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_request(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let role = match request.role {
            None | Some(Role::Student) => Role::Student,
            Some(Role::Instructor) => Role::Instructor,
            Some(Role::Admin) => {
                return Err(Error::invalid_request("admin accounts cannot self-register"));
            }
        };

        if self
            .users
            .credentials_by_email(&email)
            .await
            .map_err(map_repository_error)?
            .is_some()
        {
            return Err(Error::conflict("email already registered"));
        }

        let account = User {
            id: UserId::new(),
            display_name,
            email,
            role,
            created_at: Utc::now(),
        };
        let hash = Self::hash_password(&request.password)?;
        self.users
            .insert(&account, &hash)
            .await
            .map_err(map_repository_error)?;
        Ok(account)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let email = user::validate_email(email)
            .map_err(|_| Error::unauthorized("invalid credentials"))?;
        let Some((account, stored_hash)) = self
            .users
            .credentials_by_email(&email)
            .await
            .map_err(map_repository_error)?
        else {
            return Err(Error::unauthorized("invalid credentials"));
        };
        if !Self::verify_password(password, &stored_hash) {
            return Err(Error::unauthorized("invalid credentials"));
        }
        Ok(account)
    }

    async fn me(&self, user: UserId) -> Result<User, Error> {
        self.users
            .find_by_id(user)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("account not found"))
    }

    async fn update_profile(&self, actor: Actor, display_name: &str) -> Result<User, Error> {
        let display_name = user::validate_display_name(display_name)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        let updated = self
            .users
            .update_display_name(actor.id, &display_name)
            .await
            .map_err(map_repository_error)?;
        if !updated {
            return Err(Error::not_found("account not found"));
        }
        self.me(actor.id).await
    }

    async fn list_users(&self, actor: Actor, page: PageRequest) -> Result<Page<User>, Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("admin role required"));
        }
        self.users.list(&page).await.map_err(map_repository_error)
    }
}
