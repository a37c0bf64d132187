use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{dummy_verify, hash_password, verify_password},
    repo::UserStore,
};
use crate::{db::RepoError, error::AppError};

const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;

const BAD_CREDENTIALS: &str = "Nom d'utilisateur ou mot de passe incorrect";
const USER_EXISTS: &str = "Nom d'utilisateur ou email déjà utilisé";
const USERNAME_TAKEN: &str = "Ce nom d'utilisateur est déjà pris";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// Postgres text columns refuse NUL, and no name needs a control character.
fn has_control(value: &str) -> bool {
    value.chars().any(char::is_control)
}

pub async fn register(users: &dyn UserStore, payload: RegisterRequest) -> Result<(), AppError> {
    let (Some(username), Some(email), Some(password)) = (
        non_blank(payload.username),
        non_blank(payload.email),
        non_blank(payload.password),
    ) else {
        return Err(AppError::invalid("Tous les champs sont requis"));
    };
    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();

    if has_control(&username) || has_control(&email) {
        return Err(AppError::invalid(
            "Le nom d'utilisateur et l'email ne doivent pas contenir de caractères de contrôle",
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::invalid(
            "Le nom d'utilisateur ne doit pas dépasser 50 caractères",
        ));
    }
    if email.chars().count() > MAX_EMAIL_LEN || !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::invalid("Adresse email invalide"));
    }

    if users.username_or_email_taken(&username, &email).await? {
        warn!(username = %username, "username or email already registered");
        return Err(AppError::Conflict(USER_EXISTS.into()));
    }

    let hash = hash_password(&password)?;
    let user = users
        .create(&username, &email, &hash)
        .await
        .map_err(|e| match e {
            RepoError::UniqueViolation => AppError::Conflict(USER_EXISTS.into()),
            other => other.into(),
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(())
}

pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let (Some(username), Some(password)) = (
        non_blank(payload.username),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::invalid(
            "Nom d'utilisateur et mot de passe requis",
        ));
    };
    let username = username.trim();

    if has_control(username) {
        dummy_verify(&password);
        warn!("login username with control characters");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let Some(user) = users.find_by_username(username).await? else {
        dummy_verify(&password);
        warn!(username = %username, "login unknown username");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = keys.sign(user.id, &user.username)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: i32,
    payload: UpdateProfileRequest,
) -> Result<PublicUser, AppError> {
    let Some(current_password) = payload.current_password.filter(|p| !p.is_empty()) else {
        return Err(AppError::invalid("Le mot de passe actuel est requis"));
    };
    let new_username = match payload.username {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::invalid(
                "Le nom d'utilisateur ne peut pas être vide",
            ))
        }
        Some(name) if has_control(&name) => {
            return Err(AppError::invalid(
                "Le nom d'utilisateur ne doit pas contenir de caractères de contrôle",
            ))
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };
    if new_username
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_USERNAME_LEN)
    {
        return Err(AppError::invalid(
            "Le nom d'utilisateur ne doit pas dépasser 50 caractères",
        ));
    }
    let new_password = payload.new_password.filter(|p| !p.is_empty());

    let Some(user) = users.find_by_id(user_id).await? else {
        warn!(user_id, "profile update for missing user");
        return Err(AppError::NotFound("Utilisateur non trouvé".into()));
    };

    if !verify_password(&current_password, &user.password_hash)? {
        warn!(user_id, "profile update with wrong current password");
        return Err(AppError::Unauthorized(
            "Mot de passe actuel incorrect".into(),
        ));
    }

    let rename = new_username.filter(|n| *n != user.username);
    if let Some(name) = rename.as_deref() {
        if let Some(holder) = users.find_by_username(name).await? {
            if holder.id != user.id {
                return Err(AppError::Conflict(USERNAME_TAKEN.into()));
            }
        }
    }

    if rename.is_none() && new_password.is_none() {
        return Err(AppError::invalid("Aucune modification à effectuer"));
    }

    let new_hash = new_password.as_deref().map(hash_password).transpose()?;
    let updated = users
        .update_profile(user.id, rename.as_deref(), new_hash.as_deref())
        .await
        .map_err(|e| match e {
            RepoError::UniqueViolation => AppError::Conflict(USERNAME_TAKEN.into()),
            other => other.into(),
        })?
        .ok_or_else(|| AppError::NotFound("Utilisateur non trouvé".into()))?;

    info!(
        user_id,
        renamed = rename.is_some(),
        password_changed = new_hash.is_some(),
        "profile updated"
    );
    Ok(updated.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo::memory::MemoryUserStore, config::JwtConfig};

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_hours: 24,
        })
    }

    fn register_req(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    fn profile_req(
        username: Option<&str>,
        new_password: Option<&str>,
        current_password: Option<&str>,
    ) -> UpdateProfileRequest {
        UpdateProfileRequest {
            username: username.map(Into::into),
            new_password: new_password.map(Into::into),
            current_password: current_password.map(Into::into),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.mg"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no at sign.com"));
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "pass1234"))
            .await
            .expect("register");

        let resp = login(&store, &keys(), login_req("rija", "pass1234"))
            .await
            .expect("login");
        assert_eq!(resp.user.username, "rija");
        assert_eq!(resp.user.email, "rija@example.mg");

        let claims = keys().verify(&resp.token).expect("token verifies");
        assert_eq!(claims.id, resp.user.id);
        assert_eq!(claims.username, "rija");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username_or_email() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "pw"))
            .await
            .expect("register");

        let same_name = register(&store, register_req("rija", "other@example.mg", "pw")).await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let same_email = register(&store, register_req("other", "RIJA@example.mg", "pw")).await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn register_requires_all_fields() {
        let store = MemoryUserStore::default();
        let err = register(
            &store,
            RegisterRequest {
                username: Some("rija".into()),
                email: None,
                password: Some("pw".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let bad_email = register(&store, register_req("rija", "not-an-email", "pw")).await;
        assert!(matches!(bad_email, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn control_characters_are_rejected_before_the_store() {
        let store = MemoryUserStore::default();

        let nul_name = register(&store, register_req("ri\u{0}ja", "rija@example.mg", "pw")).await;
        assert!(matches!(nul_name, Err(AppError::InvalidArgument(_))));
        let nul_email = register(&store, register_req("rija", "ri\u{0}ja@example.mg", "pw")).await;
        assert!(matches!(nul_email, Err(AppError::InvalidArgument(_))));

        register(&store, register_req("rija", "rija@example.mg", "pw"))
            .await
            .expect("register");

        let login_err = login(&store, &keys(), login_req("rija\u{0}", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(login_err, AppError::Unauthorized(_)));

        let rename = update_profile(&store, 1, profile_req(Some("a\u{7}b"), None, Some("pw"))).await;
        assert!(matches!(rename, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "pw"))
            .await
            .expect("register");

        let unknown = login(&store, &keys(), login_req("nobody", "pw"))
            .await
            .unwrap_err();
        let wrong = login(&store, &keys(), login_req("rija", "nope"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AppError::Unauthorized(_)));
        assert!(matches!(wrong, AppError::Unauthorized(_)));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn update_profile_requires_current_password() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "old"))
            .await
            .expect("register");

        let wrong = update_profile(&store, 1, profile_req(Some("newname"), None, Some("bad"))).await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let missing = update_profile(&store, 1, profile_req(Some("newname"), None, None)).await;
        assert!(matches!(missing, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn update_profile_changes_password_and_username() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "old"))
            .await
            .expect("register");

        let user = update_profile(
            &store,
            1,
            profile_req(Some("rija2"), Some("new"), Some("old")),
        )
        .await
        .expect("update");
        assert_eq!(user.username, "rija2");

        assert!(login(&store, &keys(), login_req("rija2", "new")).await.is_ok());
        assert!(login(&store, &keys(), login_req("rija2", "old")).await.is_err());
        assert!(login(&store, &keys(), login_req("rija", "new")).await.is_err());
    }

    #[tokio::test]
    async fn update_profile_rejects_taken_username_and_no_op() {
        let store = MemoryUserStore::default();
        register(&store, register_req("rija", "rija@example.mg", "pw"))
            .await
            .expect("register");
        register(&store, register_req("hery", "hery@example.mg", "pw"))
            .await
            .expect("register");

        let taken = update_profile(&store, 1, profile_req(Some("hery"), None, Some("pw"))).await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));

        let noop = update_profile(&store, 1, profile_req(Some("rija"), Some(""), Some("pw"))).await;
        assert!(matches!(noop, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn update_profile_for_missing_user_is_not_found() {
        let store = MemoryUserStore::default();
        let err = update_profile(&store, 42, profile_req(Some("x"), None, Some("pw")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
