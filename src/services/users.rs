use crate::api::payload::{TokenPayload, UserPayload, ValidUser};
use crate::auth;
use crate::config::SecurityConfig;
use crate::database::models::{NewUser, User, UserChanges};
use crate::database::Store;
use crate::error::ApiError;

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Registration, credential checks and self-service profile updates
pub struct UserService<'a> {
    store: &'a dyn Store,
    security: &'a SecurityConfig,
}

impl<'a> UserService<'a> {
    pub fn new(store: &'a dyn Store, security: &'a SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn hash(&self, password: String) -> Result<String, ApiError> {
        let cost = self.security.password_hash_cost;
        let hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost)).await??;
        Ok(hash)
    }

    /// Shared by `POST /user/create` and the `create-user` command
    pub async fn create_user(&self, payload: UserPayload, is_staff: bool) -> Result<User, ApiError> {
        let ValidUser { email, password, name } = payload.validate_new(self.security)?;
        let password_hash = self.hash(password).await?;
        let user = self
            .store
            .insert_user(NewUser { email, password_hash, name, is_staff })
            .await?;
        tracing::info!("Created user {} (id {})", user.email, user.id);
        Ok(user)
    }

    pub async fn register(&self, payload: UserPayload) -> Result<User, ApiError> {
        self.create_user(payload, false).await
    }

    /// Bad credentials are a 400 with `non_field_errors`, not a 401
    pub async fn issue_token(&self, payload: TokenPayload) -> Result<String, ApiError> {
        let (email, password) = payload.validate()?;

        let user = self.store.find_user_by_email(&email).await?;

        // Unknown emails are checked against a dummy hash so both paths cost one bcrypt verify
        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let cost = self.security.password_hash_cost;
        let valid = tokio::task::spawn_blocking(move || match stored {
            Some(hash) => auth::verify_password(&password, &hash),
            None => auth::verify_password(&password, &auth::dummy_hash(cost)?).map(|_| false),
        })
        .await??;

        match user {
            Some(user) if valid && user.is_active => Ok(auth::issue_token(&user, self.security)?),
            Some(user) => {
                tracing::debug!("Rejected credentials for user id {}", user.id);
                Err(ApiError::field("non_field_errors", BAD_CREDENTIALS))
            }
            None => Err(ApiError::field("non_field_errors", BAD_CREDENTIALS)),
        }
    }

    /// `partial` is PATCH; PUT requires email and password
    pub async fn update_profile(&self, user: &User, payload: UserPayload, partial: bool) -> Result<User, ApiError> {
        let profile = payload.validate(self.security, !partial)?;
        let password_hash = match profile.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };
        let changes = UserChanges {
            email: profile.email,
            password_hash,
            name: profile.name,
        };
        Ok(self.store.update_user(user.id, changes).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;

    fn security() -> SecurityConfig {
        let mut security = AppConfig::development().security;
        security.password_hash_cost = 4;
        security
    }

    fn payload(email: &str, password: &str) -> UserPayload {
        UserPayload::new(email, password, Some("Test Name".to_string()))
    }

    #[tokio::test]
    async fn registered_user_can_get_token() {
        let store = MemoryStore::new();
        let security = security();
        let service = UserService::new(&store, &security);

        let user = service.register(payload("test@EXAMPLE.com", "testpass123")).await.unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password_hash, "testpass123");

        let token = service
            .issue_token(TokenPayload::new("test@example.com", "testpass123"))
            .await
            .unwrap();
        assert_eq!(auth::decode_token(&token, &security).unwrap().sub, user.id);
    }

    #[tokio::test]
    async fn wrong_password_is_non_field_error() {
        let store = MemoryStore::new();
        let security = security();
        let service = UserService::new(&store, &security);
        service.register(payload("test@example.com", "goodpass")).await.unwrap();

        let err = service
            .issue_token(TokenPayload::new("test@example.com", "badpass"))
            .await
            .unwrap_err();
        assert!(err.field_errors().is_some_and(|f| f.contains_key("non_field_errors")));
    }

    #[tokio::test]
    async fn unknown_email_is_non_field_error() {
        let store = MemoryStore::new();
        let security = security();
        let service = UserService::new(&store, &security);

        let err = service
            .issue_token(TokenPayload::new("nobody@example.com", "testpass123"))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_errors().and_then(|f| f.get("non_field_errors")).map(String::as_str),
            Some(BAD_CREDENTIALS)
        );
    }

    #[tokio::test]
    async fn short_password_creates_nothing() {
        let store = MemoryStore::new();
        let security = security();
        let service = UserService::new(&store, &security);
        assert!(service.register(payload("test@example.com", "pw")).await.is_err());
        assert!(store.find_user_by_email("test@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_password_change_rehashes() {
        let store = MemoryStore::new();
        let security = security();
        let service = UserService::new(&store, &security);
        let user = service.register(payload("test@example.com", "testpass123")).await.unwrap();

        let update = UserPayload { password: Some(serde_json::json!("newpassword123")), ..Default::default() };
        let updated = service.update_profile(&user, update, true).await.unwrap();
        assert!(auth::verify_password("newpassword123", &updated.password_hash).unwrap());
        assert_eq!(updated.name, "Test Name");
    }
}
