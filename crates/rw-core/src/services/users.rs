//! Registration, login and profile management.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Credentials, EntityKind, NewUser, ProfileUpdate, PublicUser, User};
use crate::services::stories::{AI_EMAIL, AI_USERNAME};
use crate::store::DocumentStore;
use crate::traits::PasswordHasher;

const INVALID_LOGIN: &str = "invalid email or password";

pub fn default_avatar(username: &str) -> String {
    format!("https://api.dicebear.com/6.x/avataaars/svg?seed={username}")
}

pub struct UserService {
    store: Arc<DocumentStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(store: Arc<DocumentStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Creates an account. Fails with `Conflict` if the email is taken, in
    /// which case the user collection is left untouched.
    pub async fn register(&self, new: NewUser) -> Result<PublicUser> {
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("username is required"));
        }
        if email.is_empty() {
            return Err(AppError::validation("email is required"));
        }
        if new.password.is_empty() {
            return Err(AppError::validation("password is required"));
        }
        ensure_not_reserved(Some(username.as_str()), Some(email.as_str()))?;

        let taken = self
            .store
            .read(|db| db.users.iter().any(|u| u.email == email))
            .await?;
        if taken {
            return Err(email_taken());
        }

        let password_hash = self
            .hasher
            .hash_password(&new.password)
            .map_err(|e| AppError::Internal(format!("hash password: {e}")))?;

        let user = self
            .store
            .mutate(move |db| {
                // the email may have been claimed while hashing
                if db.users.iter().any(|u| u.email == email) {
                    return Err(email_taken());
                }
                let now = Utc::now();
                let user = User {
                    id: db.next_id(EntityKind::User),
                    avatar: Some(default_avatar(&username)),
                    username,
                    email,
                    password_hash,
                    bio: None,
                    created_at: now,
                    updated_at: Some(now),
                    is_ai: false,
                };
                let public = PublicUser::from(&user);
                db.users.push(user);
                Ok(public)
            })
            .await?;

        log::info!("registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, credentials: Credentials) -> Result<PublicUser> {
        let email = credentials.email.trim();
        let found = self
            .store
            .read(|db| {
                db.users
                    .iter()
                    .find(|u| u.email == email)
                    .map(|u| (u.password_hash.clone(), PublicUser::from(u)))
            })
            .await?;

        let Some((hash, user)) = found else {
            return Err(AppError::Unauthorized(INVALID_LOGIN.into()));
        };
        if !self.hasher.verify_password(&credentials.password, &hash) {
            log::debug!("failed login for {}", user.id);
            return Err(AppError::Unauthorized(INVALID_LOGIN.into()));
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<PublicUser>> {
        self.store.read(|db| db.author_of(user_id)).await
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<PublicUser> {
        if update
            .username
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(AppError::validation("username cannot be empty"));
        }
        ensure_not_reserved(update.username.as_deref().map(str::trim), None)?;

        let updated = self
            .store
            .mutate(|db| {
                let user = db
                    .users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or_else(|| AppError::not_found("User", user_id))?;
                if let Some(username) = update.username {
                    user.username = username.trim().to_string();
                }
                if let Some(avatar) = update.avatar {
                    user.avatar = Some(avatar);
                }
                if let Some(bio) = update.bio {
                    user.bio = Some(bio);
                }
                user.updated_at = Some(Utc::now());
                Ok(PublicUser::from(&*user))
            })
            .await?;

        log::info!("updated profile of {}", user_id);
        Ok(updated)
    }

    pub async fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<()> {
        if new.is_empty() {
            return Err(AppError::validation("new password is required"));
        }

        let hash = self
            .store
            .read(|db| db.find_user(user_id).map(|u| u.password_hash.clone()))
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        if !self.hasher.verify_password(current, &hash) {
            return Err(AppError::Unauthorized("current password is incorrect".into()));
        }

        let new_hash = self
            .hasher
            .hash_password(new)
            .map_err(|e| AppError::Internal(format!("hash password: {e}")))?;

        self.store
            .mutate(|db| {
                let user = db
                    .users
                    .iter_mut()
                    .find(|u| u.id == user_id)
                    .ok_or_else(|| AppError::not_found("User", user_id))?;
                // another change may have landed while hashing
                if user.password_hash != hash {
                    return Err(AppError::Unauthorized("current password is incorrect".into()));
                }
                user.password_hash = new_hash;
                user.updated_at = Some(Utc::now());
                Ok(())
            })
            .await?;

        log::info!("changed password of {}", user_id);
        Ok(())
    }
}

/// The critic's name and email cannot be claimed by people.
fn ensure_not_reserved(username: Option<&str>, email: Option<&str>) -> Result<()> {
    if username.is_some_and(|name| name.eq_ignore_ascii_case(AI_USERNAME)) {
        return Err(AppError::Conflict(format!("the username {AI_USERNAME} is reserved")));
    }
    if email.is_some_and(|email| email.eq_ignore_ascii_case(AI_EMAIL)) {
        return Err(email_taken());
    }
    Ok(())
}

fn email_taken() -> AppError {
    AppError::Conflict("a user with this email already exists".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPersistence;
    use crate::models::Snapshot;
    use crate::traits::{MockPasswordHasher, PersistenceAdapter};

    /// Reversible stand-in so tests stay fast.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash_password(&self, password: &str) -> anyhow::Result<String> {
            Ok(format!("plain:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> bool {
            hash.strip_prefix("plain:") == Some(password)
        }
    }

    fn service() -> (UserService, Arc<MemoryPersistence>) {
        let adapter = Arc::new(MemoryPersistence::new());
        let store = Arc::new(DocumentStore::new(adapter.clone()));
        (UserService::new(store, Arc::new(PlainHasher)), adapter)
    }

    fn ann() -> NewUser {
        NewUser {
            username: "ann".into(),
            email: "ann@example.com".into(),
            password: "hunter2".into(),
        }
    }

    async fn persisted(adapter: &MemoryPersistence) -> Snapshot {
        serde_json::from_value(adapter.read().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn register_returns_projection_and_default_avatar() {
        let (svc, adapter) = service();
        let user = svc.register(ann()).await.unwrap();

        assert_eq!(user.id, "user_1");
        assert_eq!(user.avatar.as_deref(), Some(default_avatar("ann").as_str()));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());

        let stored = persisted(&adapter).await;
        assert_eq!(stored.users[0].password_hash, "plain:hunter2");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_side_effects() {
        let adapter = Arc::new(MemoryPersistence::new());
        let store = Arc::new(DocumentStore::new(adapter.clone()));
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash_password()
            .times(1)
            .returning(|_| Ok("hashed".into()));
        let svc = UserService::new(store, Arc::new(hasher));

        svc.register(ann()).await.unwrap();
        let before = persisted(&adapter).await;

        let mut again = ann();
        again.username = "impostor".into();
        let err = svc.register(again).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        let after = persisted(&adapter).await;
        assert_eq!(after.users.len(), before.users.len());
        assert_eq!(after.sequences, before.sequences);
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let (svc, _) = service();
        let mut blank = ann();
        blank.email = "  ".into();
        assert!(matches!(
            svc.register(blank).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let (svc, _) = service();
        svc.register(ann()).await.unwrap();

        let ok = svc
            .login(Credentials {
                email: "ann@example.com".into(),
                password: "hunter2".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.username, "ann");

        for (email, password) in [("ann@example.com", "wrong"), ("nobody@example.com", "hunter2")] {
            let err = svc
                .login(Credentials {
                    email: email.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
    }

    #[tokio::test]
    async fn profile_update_merges_fields() {
        let (svc, _) = service();
        let user = svc.register(ann()).await.unwrap();

        let updated = svc
            .update_profile(
                &user.id,
                ProfileUpdate {
                    bio: Some("poet".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "ann");
        assert_eq!(updated.bio.as_deref(), Some("poet"));
        assert!(updated.updated_at >= user.updated_at);
        assert_eq!(svc.get_user(&user.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn profile_update_of_unknown_user_fails() {
        let (svc, _) = service();
        let err = svc
            .update_profile("user_404", ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn password_change_requires_current_password() {
        let (svc, _) = service();
        let user = svc.register(ann()).await.unwrap();

        let err = svc
            .change_password(&user.id, "nope", "s3cret")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        svc.change_password(&user.id, "hunter2", "s3cret").await.unwrap();
        let relogin = svc
            .login(Credentials {
                email: "ann@example.com".into(),
                password: "s3cret".into(),
            })
            .await;
        assert!(relogin.is_ok());
    }

    #[tokio::test]
    async fn critic_identity_cannot_be_registered() {
        let (svc, adapter) = service();

        let mut by_name = ann();
        by_name.username = "aiassistant".into();
        assert!(matches!(svc.register(by_name).await, Err(AppError::Conflict(_))));

        let mut by_email = ann();
        by_email.email = AI_EMAIL.to_uppercase();
        assert!(matches!(svc.register(by_email).await, Err(AppError::Conflict(_))));

        assert!(persisted(&adapter).await.users.is_empty());
    }

    #[tokio::test]
    async fn critic_name_cannot_be_taken_by_renaming() {
        let (svc, _) = service();
        let user = svc.register(ann()).await.unwrap();

        let err = svc
            .update_profile(
                &user.id,
                ProfileUpdate {
                    username: Some(format!(" {AI_USERNAME} ")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(svc.get_user(&user.id).await.unwrap().unwrap().username, "ann");
    }

    /// Blocks while hashing so two changes overlap.
    struct SlowHasher;

    impl PasswordHasher for SlowHasher {
        fn hash_password(&self, password: &str) -> anyhow::Result<String> {
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(format!("plain:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> bool {
            hash.strip_prefix("plain:") == Some(password)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_password_changes_cannot_both_win() {
        let store = Arc::new(DocumentStore::new(Arc::new(MemoryPersistence::new())));
        let svc = Arc::new(UserService::new(store, Arc::new(SlowHasher)));
        let user = svc.register(ann()).await.unwrap();

        let change = |new: &'static str| {
            let svc = svc.clone();
            let id = user.id.clone();
            tokio::spawn(async move { svc.change_password(&id, "hunter2", new).await })
        };
        let first = change("first");
        let second = change("second");
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Unauthorized(_)))));
    }

    #[tokio::test]
    async fn unknown_user_reads_as_absent() {
        let (svc, _) = service();
        assert_eq!(svc.get_user("user_404").await.unwrap(), None);
    }
}
