//! Registration, authentication, profile management, and delivery
//! addresses.
//!
//! Password hashing uses Argon2id with a random salt per user, grounded on
//! the retrieval pack's own choice of `argon2` for the same purpose
//! (the original service's `werkzeug.security` salted-hash scheme is the
//! functional ancestor; Argon2id is its modern, memory-hard Rust
//! equivalent).

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use chrono::Utc;

use vendix_auth::policy::{require_admin, require_owner_or_admin};
use vendix_core::model::{DeliveryAddress, Id, Role, User};
use vendix_core::{ErrorKind, Principal, VendixError, VendixResult};
use vendix_repo::{DeliveryAddressRepository, UserRepository};

/// Fields accepted when registering a new user.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// Email, must be unique case-insensitively.
    pub email: String,
    /// Plaintext password; never stored, only its hash.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Role to assign. Requesting anything other than [`Role::Customer`]
    /// requires an admin principal.
    pub role: Role,
}

/// Patch applied by [`UserService::update_user`]. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// New display name.
    pub name: Option<String>,
    /// New phone number. `Some(None)` clears it.
    pub phone: Option<Option<String>>,
    /// New active flag.
    pub active: Option<bool>,
}

/// Registration, authentication, and profile service.
#[derive(Debug)]
pub struct UserService<U, D> {
    users: Arc<U>,
    addresses: Arc<D>,
}

impl<U: UserRepository, D: DeliveryAddressRepository> UserService<U, D> {
    /// Construct a service over the given repositories.
    pub fn new(users: Arc<U>, addresses: Arc<D>) -> Self {
        Self { users, addresses }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Validation`] if the password is under 8 characters.
    /// - [`ErrorKind::Forbidden`] if a non-customer role is requested
    ///   without an admin `requesting_principal`.
    /// - [`ErrorKind::Conflict`] if the email is already registered.
    pub async fn register(
        &self,
        request: RegisterRequest,
        requesting_principal: Option<&Principal>,
    ) -> VendixResult<User> {
        if request.password.len() < 8 {
            return Err(VendixError::validation("password must be at least 8 characters"));
        }
        if request.role != Role::Customer {
            match requesting_principal {
                Some(principal) => require_admin(principal)?,
                None => {
                    return Err(VendixError::forbidden(
                        "administrator authentication required to register a non-customer role",
                    ))
                }
            }
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let email = request.email.clone();
        let user = User {
            id: 0,
            email: request.email,
            password_hash,
            name: request.name,
            phone: request.phone,
            role: request.role,
            active: true,
            created_at: now,
            updated_at: now,
        };

        self.users.insert(user).await.map_err(|e| match e {
            vendix_repo::RepoError::Constraint(_) => VendixError::email_in_use(&email),
            other => other.into_vendix_error(),
        })
    }

    /// Verify `email`/`password` and return the matching user.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Invalid`] for any failure — unknown email,
    /// wrong password, or a deactivated account. The reason is
    /// intentionally not distinguished further to avoid leaking account
    /// existence.
    pub async fn authenticate(&self, email: &str, password: &str) -> VendixResult<User> {
        let invalid = || VendixError::new(ErrorKind::Invalid, "invalid email or password");
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)?
            .ok_or_else(invalid)?;
        if !user.active {
            return Err(invalid());
        }
        if !verify_password(&user.password_hash, password) {
            return Err(invalid());
        }
        Ok(user)
    }

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` is the user or an admin.
    /// - [`ErrorKind::NotFound`] if no such user exists.
    pub async fn get_user(&self, id: Id, principal: &Principal) -> VendixResult<User> {
        require_owner_or_admin(principal, id)?;
        self.users
            .find_by_id(id)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::new(ErrorKind::NotFound, format!("user {id} not found")))
    }

    /// Apply `patch` to an existing user.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_user`].
    pub async fn update_user(&self, id: Id, patch: UserPatch, principal: &Principal) -> VendixResult<User> {
        let mut user = self.get_user(id, principal).await?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(phone) = patch.phone {
            user.phone = phone;
        }
        if let Some(active) = patch.active {
            require_admin(principal)?;
            user.active = active;
        }
        user.updated_at = Utc::now();
        self.users.update(user).await.map_err(vendix_repo::RepoError::into_vendix_error)
    }

    /// Promote a user to [`Role::Admin`].
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Forbidden`] unless `principal` is an admin.
    /// - [`ErrorKind::Validation`] if the user is already an admin.
    pub async fn make_admin(&self, id: Id, principal: &Principal) -> VendixResult<User> {
        require_admin(principal)?;
        let mut user = self
            .users
            .find_by_id(id)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::new(ErrorKind::NotFound, format!("user {id} not found")))?;
        if user.role == Role::Admin {
            return Err(VendixError::validation("user is already an administrator"));
        }
        user.role = Role::Admin;
        user.updated_at = Utc::now();
        self.users.update(user).await.map_err(vendix_repo::RepoError::into_vendix_error)
    }

    /// List delivery addresses owned by `user_id`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Forbidden`] unless `principal` owns `user_id` or is an
    /// admin.
    pub async fn list_addresses(&self, user_id: Id, principal: &Principal) -> VendixResult<Vec<DeliveryAddress>> {
        require_owner_or_admin(principal, user_id)?;
        self.addresses
            .list_for_user(user_id)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)
    }

    /// Add a delivery address for `user_id`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Forbidden`] unless `principal` owns `user_id` or is an
    /// admin.
    pub async fn add_address(
        &self,
        user_id: Id,
        street: String,
        city: String,
        postal_code: String,
        country: String,
        principal: &Principal,
    ) -> VendixResult<DeliveryAddress> {
        require_owner_or_admin(principal, user_id)?;
        let now = Utc::now();
        self.addresses
            .insert(DeliveryAddress {
                id: 0,
                user_id,
                street,
                city,
                postal_code,
                country,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)
    }

    /// Delete a delivery address.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`] if the address does not exist.
    /// - [`ErrorKind::Forbidden`] unless `principal` owns it or is an admin.
    pub async fn delete_address(&self, address_id: Id, principal: &Principal) -> VendixResult<()> {
        let address = self
            .addresses
            .find_by_id(address_id)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)?
            .ok_or_else(|| VendixError::address_not_found(address_id))?;
        require_owner_or_admin(principal, address.user_id)?;
        self.addresses
            .delete(address_id)
            .await
            .map_err(vendix_repo::RepoError::into_vendix_error)
    }
}

fn hash_password(password: &str) -> VendixResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VendixError::internal(format!("password hashing failed: {e}")))
}

fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok()
}
