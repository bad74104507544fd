use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::navigation::Screen;
use crate::api::state::AppState;
use crate::error::ClientError;
use crate::models::{AccountHandle, ProfileUpdate, Session};

pub const MISSING_CREDENTIALS: &str = "Email / username and password are required";
pub const MISSING_REGISTRATION_FIELDS: &str = "All fields are required.";
pub const SECRET_TOO_SHORT: &str = "Password must be at least 6 characters";
pub const MIN_SECRET_LEN: usize = 6;

const VALIDATION_TITLE: &str = "Oops";

/// Secrets are measured in UTF-16 code units, the unit identity backends count in.
pub fn secret_too_short(secret: &str) -> bool {
    secret.encode_utf16().count() < MIN_SECRET_LEN
}

/// Local, pre-network checks for sign-in.
pub fn validate_sign_in(email: &str, secret: &str) -> Result<(), ClientError> {
    if email.is_empty() || secret.is_empty() {
        return Err(ClientError::Validation(MISSING_CREDENTIALS.to_string()));
    }
    Ok(())
}

/// Local, pre-network checks for registration.
pub fn validate_registration(
    display_name: &str,
    email: &str,
    secret: &str,
) -> Result<(), ClientError> {
    if display_name.is_empty() || email.is_empty() || secret.is_empty() {
        return Err(ClientError::Validation(
            MISSING_REGISTRATION_FIELDS.to_string(),
        ));
    }
    if secret_too_short(secret) {
        return Err(ClientError::Validation(SECRET_TOO_SHORT.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created(AccountHandle),
    /// Another registration was still in flight; this submission was dropped.
    Suppressed,
}

/// Login and register screens.
pub struct CredentialFlows {
    state: AppState,
    registering: AtomicBool,
}

/// Clears the busy flag however the registration resolves.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CredentialFlows {
    pub fn new(state: AppState) -> Self {
        CredentialFlows {
            state,
            registering: AtomicBool::new(false),
        }
    }

    pub fn is_registering(&self) -> bool {
        self.registering.load(Ordering::Acquire)
    }

    /// Single sign-in attempt. On success the room replaces the current screen.
    pub async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, ClientError> {
        if let Err(err) = validate_sign_in(email, secret) {
            self.state
                .notifier
                .alert(VALIDATION_TITLE, &err.user_message())
                .await;
            return Err(err);
        }

        match self.state.identity.sign_in(email.trim(), secret).await {
            Ok(session) => {
                tracing::info!(uid = %session.uid, "sign-in succeeded");
                self.state.navigator.replace(Screen::Room);
                Ok(session)
            }
            Err(err) => {
                tracing::error!(code = err.code(), error = %err, "sign-in failed");
                self.state
                    .notifier
                    .alert("Login failed", &err.user_message())
                    .await;
                Err(err)
            }
        }
    }

    /// Create an account, attach the display name, then send the user to login.
    ///
    /// The profile update runs after account creation; if it fails the
    /// account stays without a display name.
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
    ) -> Result<RegisterOutcome, ClientError> {
        if self
            .registering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("registration already in flight");
            return Ok(RegisterOutcome::Suppressed);
        }
        let _busy = BusyGuard(&self.registering);

        if let Err(err) = validate_registration(display_name, email, secret) {
            self.state
                .notifier
                .alert(VALIDATION_TITLE, &err.user_message())
                .await;
            return Err(err);
        }

        tracing::info!(email = %email.trim(), "registration started");
        match self.create_with_profile(display_name.trim(), email.trim(), secret).await {
            Ok(account) => {
                self.state
                    .notifier
                    .alert("Success!", "Account created. Please log in.")
                    .await;
                self.state.navigator.replace(Screen::Login);
                Ok(RegisterOutcome::Created(account))
            }
            Err(err) => {
                tracing::error!(code = err.code(), error = %err, "registration failed");
                let text = format!("{}\n{}", err.code(), err.user_message());
                self.state.notifier.alert("Registration failed", &text).await;
                Err(err)
            }
        }
    }

    async fn create_with_profile(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
    ) -> Result<AccountHandle, ClientError> {
        let account = self.state.identity.create_account(email, secret).await?;
        tracing::debug!(uid = %account.uid, "account created");

        self.state
            .identity
            .update_profile(
                &account,
                ProfileUpdate {
                    display_name: Some(display_name.to_string()),
                },
            )
            .await?;
        tracing::debug!(uid = %account.uid, "profile updated");

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_requires_both_fields() {
        for (email, secret) in [("", "secret1"), ("a@b.com", ""), ("", "")] {
            let err = validate_sign_in(email, secret).unwrap_err();
            assert_eq!(err.user_message(), MISSING_CREDENTIALS);
        }
        assert!(validate_sign_in("a@b.com", "secret1").is_ok());
    }

    #[test]
    fn registration_checks_fields_then_length() {
        let err = validate_registration("", "a@b.com", "secret1").unwrap_err();
        assert_eq!(err.user_message(), MISSING_REGISTRATION_FIELDS);

        let err = validate_registration("Rina", "a@b.com", "12345").unwrap_err();
        assert_eq!(err.user_message(), SECRET_TOO_SHORT);

        assert!(validate_registration("Rina", "a@b.com", "123456").is_ok());
    }

    #[test]
    fn secret_length_counts_utf16_units() {
        // Each emoji is one char but two UTF-16 units.
        assert!(!secret_too_short("\u{1F600}\u{1F600}\u{1F600}"));
        assert!(!secret_too_short("abcd\u{1F600}"));
        assert!(secret_too_short("ab\u{1F600}"));
        assert!(secret_too_short("\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}"));
    }
}
