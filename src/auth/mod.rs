//! Demo authentication
//!
//! Login is a stand-in: [`DemoVerifier`] accepts any non-blank email and
//! password. The [`CredentialVerifier`] trait is the seam where a real
//! identity backend plugs in. The issued session is persisted by
//! [`SessionStore`] as two string keys, `authToken` and `userType`.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Which login form was used. Doctors get admin privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    User,
    Doctor,
}

impl LoginType {
    pub fn role(&self) -> Role {
        match self {
            LoginType::User => Role::User,
            LoginType::Doctor => Role::Admin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub login_type: LoginType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(rename = "authToken")]
    pub auth_token: String,
    #[serde(rename = "userType")]
    pub user_type: Role,
}

/// Turns login credentials into a session
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, request: &LoginRequest) -> Result<AuthSession>;
}

/// Accepts any non-blank credentials without contacting anyone
pub struct DemoVerifier;

#[async_trait]
impl CredentialVerifier for DemoVerifier {
    async fn verify(&self, request: &LoginRequest) -> Result<AuthSession> {
        if request.email.trim().is_empty() {
            return Err(ClientError::MissingEmail);
        }
        if request.password.trim().is_empty() {
            return Err(ClientError::MissingPassword);
        }

        let role = request.login_type.role();
        let issued = chrono::Utc::now().timestamp_millis();
        tracing::info!(role = role.as_str(), "Demo login accepted");

        Ok(AuthSession {
            auth_token: format!("{}-token-{}", role.as_str(), issued),
            user_type: role,
        })
    }
}

/// File-backed session persistence
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(), serde_json::to_vec_pretty(session)?)?;
        tracing::debug!(path = %self.path().display(), "Saved session");
        Ok(())
    }

    /// `None` when nobody is logged in
    pub fn load(&self) -> Result<Option<AuthSession>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Verify the credentials and persist the resulting session.
pub async fn login(
    verifier: &dyn CredentialVerifier,
    store: &SessionStore,
    request: &LoginRequest,
) -> Result<AuthSession> {
    let session = verifier.verify(request).await?;
    store.save(&session)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(email: &str, password: &str, login_type: LoginType) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            login_type,
        }
    }

    #[tokio::test]
    async fn test_demo_verifier_checks_email_first() {
        let err = DemoVerifier
            .verify(&request(" ", "", LoginType::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingEmail));

        let err = DemoVerifier
            .verify(&request("a@b.org", "  ", LoginType::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingPassword));
    }

    #[tokio::test]
    async fn test_doctor_login_is_admin() {
        let session = DemoVerifier
            .verify(&request("dr@clinic.org", "secret", LoginType::Doctor))
            .await
            .unwrap();
        assert_eq!(session.user_type, Role::Admin);
        assert!(session.auth_token.starts_with("admin-token-"));
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("healthmorph"));
        assert!(store.load().unwrap().is_none());

        let session = login(
            &DemoVerifier,
            &store,
            &request("me@home.org", "pw", LoginType::User),
        )
        .await
        .unwrap();

        let raw = fs::read_to_string(store.dir().join(SESSION_FILE)).unwrap();
        assert!(raw.contains("\"authToken\""));
        assert!(raw.contains("\"userType\": \"user\""));
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
