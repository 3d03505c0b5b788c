//! Sign-in, sign-up and logout.
//!
//! The session moves between two states:
//!
//! - `LoggedOut --sign_in--> LoggedIn` when the email exists and the password
//!   verifies against its stored hash; anything else leaves the session
//!   logged out with [`DashboardError::InvalidCredentials`].
//! - `LoggedOut --sign_up--> LoggedOut` with the new row inserted and the
//!   session sent to the Sign In page; an existing email gives
//!   [`DashboardError::DuplicateAccount`] and leaves the table untouched.
//! - `LoggedIn --logout--> LoggedOut` back on the Sign In page.
//!
//! Passwords are stored as Argon2id PHC strings, never in plaintext.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;

use crate::error::{DashboardError, Result};
use crate::session::{AuthState, Page, SessionState};
use crate::users::{Role, UserRecord, UserStore};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct SignUp<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Sign a session in
///
/// Checks the credentials and, if they match, logs the session in and sends
/// it to Home. On any failure the session is left as it was.
///
/// # Arguments
/// * `store` - Users table to check against
/// * `session` - Session to log in; must be logged out
/// * `email` - Email as typed, surrounding spaces ignored
/// * `password` - Password to verify against the stored Argon2 hash
///
/// # Returns
/// * `Result<()>` - `InvalidCredentials` for an unknown email or wrong
///   password, `NotFound` when nobody has signed up yet
pub fn sign_in(
    store: &UserStore,
    session: &mut SessionState,
    email: &str,
    password: &str,
) -> Result<()> {
    if session.logged_in() {
        return Err(DashboardError::Validation("You are already signed in.".to_string()));
    }
    if !store.has_table() {
        return Err(DashboardError::NotFound(
            "No users found. Please sign up first.".to_string(),
        ));
    }

    let email = email.trim();
    let Some(user) = store.find_by_email(email)? else {
        info!("sign-in failed for unknown email {}", email);
        return Err(DashboardError::InvalidCredentials);
    };

    let verified = match verify_password(password, &user.password) {
        Ok(ok) => ok,
        Err(e) => {
            warn!("stored password for {} is not a valid hash: {}", email, e);
            false
        }
    };
    if !verified {
        info!("sign-in failed for {}", email);
        return Err(DashboardError::InvalidCredentials);
    }

    session.set_auth(AuthState::LoggedIn {
        email: user.email,
        role: user.role,
    });
    session.set_active_page(Page::Home);
    info!("{} signed in", email);
    Ok(())
}

/// Register a new account
///
/// The session stays logged out and is sent to the Sign In page.
///
/// # Arguments
/// * `store` - Users table to insert into
/// * `session` - Session making the request; must be logged out
/// * `form` - Name, email and password from the sign-up form
/// * `admin_email` - Email that is given the admin role
///
/// # Returns
/// * `Result<()>` - `DuplicateAccount` if the email is taken (the table is
///   left untouched), `Validation` for empty or malformed input
pub fn sign_up(
    store: &UserStore,
    session: &mut SessionState,
    form: SignUp<'_>,
    admin_email: &str,
) -> Result<()> {
    if session.logged_in() {
        return Err(DashboardError::Validation("You are already signed in.".to_string()));
    }

    let name = form.name.trim();
    let email = form.email.trim();
    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(DashboardError::Validation(
            "Name, email and password cannot be empty.".to_string(),
        ));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(DashboardError::Validation(
            "Please enter a valid email address.".to_string(),
        ));
    }
    // Checked again under the table lock by insert; this one avoids hashing
    // for nothing.
    if store.exists(email)? {
        return Err(DashboardError::DuplicateAccount(email.to_string()));
    }

    let role = if email.eq_ignore_ascii_case(admin_email.trim()) {
        Role::Admin
    } else {
        Role::User
    };
    let record = UserRecord {
        email: email.to_string(),
        password: hash_password(form.password)?,
        name: name.to_string(),
        phone: None,
        role,
        extra: Vec::new(),
    };
    store.insert(&record)?;

    session.set_active_page(Page::SignIn);
    Ok(())
}

/// Logs the session out from any state. The chat and uploaded dataset
/// belong to the departing user and are dropped too.
pub fn logout(session: &mut SessionState) {
    if let Some(email) = session.current_user() {
        info!("{} logged out", email);
    }
    session.set_auth(AuthState::LoggedOut);
    session.set_active_page(Page::SignIn);
    session.chat_history = Default::default();
    session.dataset = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "plaintext").is_err());
    }

    #[test]
    fn email_shape() {
        assert!(EMAIL_REGEX.is_match("a@b.io"));
        assert!(!EMAIL_REGEX.is_match("a@b"));
        assert!(!EMAIL_REGEX.is_match("a b@c.d"));
    }
}
