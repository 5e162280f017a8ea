//! Authentication contract and the in-process provider.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use chattier_shared::error::AuthError;
use chattier_shared::types::UserId;

/// An authenticated user identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: UserId,
    pub display_name: String,
    pub photo_url: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Update the display name and photo URL attached to the identity.
    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
        photo_url: &str,
    ) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

struct Account {
    password: String,
    user: AuthUser,
}

/// In-process [`AuthProvider`] keyed by email. Error messages mirror the
/// hosted provider's wording because the client surfaces them verbatim.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_uid() -> UserId {
        UserId(hex::encode(rand::random::<[u8; 14]>()))
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(AuthError::new(
                "The email address is already in use by another account.",
            ));
        }
        let user = AuthUser {
            uid: Self::new_uid(),
            display_name: String::new(),
            photo_url: String::new(),
        };
        accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        tracing::info!(uid = %user.uid, "account created");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts.get(email).ok_or_else(|| {
            AuthError::new(
                "There is no user record corresponding to this identifier. The user may have been deleted.",
            )
        })?;
        if account.password != password {
            return Err(AuthError::new(
                "The password is invalid or the user does not have a password.",
            ));
        }
        Ok(account.user.clone())
    }

    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
        photo_url: &str,
    ) -> Result<AuthUser, AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .values_mut()
            .find(|a| &a.user.uid == uid)
            .ok_or_else(|| AuthError::new("No user signed in."))?;
        account.user.display_name = display_name.to_string();
        account.user.photo_url = photo_url.to_string();
        Ok(account.user.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() -> anyhow::Result<()> {
        let auth = MemoryAuth::new();
        let created = auth.sign_up("alice@example.com", "secret1").await?;
        let signed_in = auth.sign_in("alice@example.com", "secret1").await?;
        assert_eq!(created.uid, signed_in.uid);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_with_provider_message() {
        let auth = MemoryAuth::new();
        auth.sign_up("alice@example.com", "secret1").await.unwrap();
        let err = auth
            .sign_up("alice@example.com", "other")
            .await
            .unwrap_err();
        assert!(err.0.contains("already in use"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = MemoryAuth::new();
        auth.sign_up("alice@example.com", "secret1").await.unwrap();
        let err = auth
            .sign_in("alice@example.com", "nope")
            .await
            .unwrap_err();
        assert!(err.0.contains("password is invalid"));
    }

    #[tokio::test]
    async fn update_profile_sticks() -> anyhow::Result<()> {
        let auth = MemoryAuth::new();
        let user = auth.sign_up("alice@example.com", "secret1").await?;
        auth.update_profile(&user.uid, "Alice", "http://avatar")
            .await?;
        let back = auth.sign_in("alice@example.com", "secret1").await?;
        assert_eq!(back.display_name, "Alice");
        assert_eq!(back.photo_url, "http://avatar");
        Ok(())
    }
}
