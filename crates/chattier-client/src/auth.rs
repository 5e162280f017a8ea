//! Registration and login flows.
//!
//! Form validation happens locally and surfaces inline messages; only a
//! valid form reaches the auth provider. Provider failures are surfaced
//! with the provider's own message text.

use tracing::info;

use chattier_backend::{AuthProvider, AuthUser, RealtimeStore};
use chattier_shared::constants::{AVATAR_SERVICE_URL, MIN_PASSWORD_LEN};
use chattier_shared::error::{ChatError, RemoteWriteError, ValidationError};
use chattier_shared::types::UserProfile;
use chattier_shared::paths;

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.password_confirmation.is_empty()
        {
            return Err(ValidationError::EmptyFields);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(())
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Structural email check: word-ish local part, dotted domain with a
/// 2-4 character top-level label.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || !local.chars().all(|c| is_word(c) || c == '.') {
        return false;
    }
    let mut labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let tld = labels.pop().unwrap_or_default();
    if !(2..=4).contains(&tld.len()) || !tld.chars().all(is_word) {
        return false;
    }
    labels
        .iter()
        .all(|label| !label.is_empty() && label.chars().all(is_word))
}

/// Generated avatar image URL with a random background colour.
pub fn generated_avatar_url(username: &str) -> String {
    let background = rand::random::<u32>() & 0xff_ff_ff;
    format!("{AVATAR_SERVICE_URL}?name={username}&background={background:06x}&length=1")
}

/// Create an account: sign up, attach the display name and a generated
/// avatar to the identity, then persist the profile under `users/{uid}`.
pub async fn register(
    auth: &dyn AuthProvider,
    store: &dyn RealtimeStore,
    form: &RegisterForm,
) -> Result<AuthUser, ChatError> {
    form.validate()?;
    let created = auth.sign_up(&form.email, &form.password).await?;
    let avatar = generated_avatar_url(&form.username);
    let user = auth
        .update_profile(&created.uid, &form.username, &avatar)
        .await?;

    let profile = UserProfile {
        uid: user.uid.clone(),
        name: user.display_name.clone(),
        avatar_photo: user.photo_url.clone(),
    };
    let path = paths::user(&user.uid);
    let value = serde_json::to_value(&profile)
        .map_err(|e| RemoteWriteError::new("write", &path, e.to_string()))?;
    store.write(&path, value).await?;

    info!(uid = %user.uid, "user registered");
    Ok(user)
}

pub async fn sign_in(auth: &dyn AuthProvider, form: &LoginForm) -> Result<AuthUser, ChatError> {
    form.validate()?;
    let user = auth.sign_in(&form.email, &form.password).await?;
    info!(uid = %user.uid, "user signed in");
    Ok(user)
}
