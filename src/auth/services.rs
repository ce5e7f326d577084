use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::dto::{LoginResponse, MessageResponse, PublicUser, RegisterResponse};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::repo_types::NewUser;
use crate::db::StoreError;
use crate::error::AppError;
use crate::mail::{deliver, Delivery, Mail};
use crate::state::AppState;

/// Returned by forgot-password whether or not the account exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

const RESET_TOKEN_TTL: Duration = Duration::hours(1);
const RESET_TOKEN_LEN: usize = 48;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub async fn register(
    st: &AppState,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<RegisterResponse, AppError> {
    if st.users.find_by_email(email).await?.is_some() {
        warn!(email, "email already registered");
        return Err(AppError::DuplicateUser);
    }

    let password_hash = hash_password_blocking(password, st.config.bcrypt_cost).await?;

    let user = match st
        .users
        .create(NewUser {
            email,
            password_hash: &password_hash,
            name,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::UniqueViolation) => {
            warn!(email, "email registered concurrently");
            return Err(AppError::DuplicateUser);
        }
        Err(e) => return Err(e.into()),
    };

    deliver(
        st.notifier.as_ref(),
        Delivery::BestEffort,
        Mail::welcome(&user.email, user.name.as_deref()),
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(RegisterResponse {
        message: "User created successfully".into(),
        user_id: user.id,
    })
}

pub async fn login(st: &AppState, email: &str, password: &str) -> Result<LoginResponse, AppError> {
    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password, &user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let access_token = JwtKeys::from(&st.config.jwt).sign_access(user.id, &user.email)?;

    info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        access_token,
        user: PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
        },
    })
}

pub async fn forgot_password(st: &AppState, email: &str) -> Result<MessageResponse, AppError> {
    let Some(user) = st.users.find_by_email(email).await? else {
        info!("password reset requested for unknown email");
        return Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE));
    };

    let token = generate_reset_token();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    st.users.set_reset_token(user.id, &token, expires).await?;

    let link = format!("{}?token={}", st.config.reset_url_base, token);
    deliver(
        st.notifier.as_ref(),
        Delivery::MustSucceed,
        Mail::password_reset(&user.email, &link),
    )
    .await?;

    info!(user_id = %user.id, "password reset link issued");
    Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE))
}

pub async fn reset_password(
    st: &AppState,
    token: &str,
    new_password: &str,
) -> Result<MessageResponse, AppError> {
    if token.is_empty() {
        return Err(AppError::InvalidOrExpiredToken);
    }

    let password_hash = hash_password_blocking(new_password, st.config.bcrypt_cost).await?;
    let consumed = st
        .users
        .consume_reset_token(token, OffsetDateTime::now_utc(), &password_hash)
        .await?;

    match consumed {
        Some(user_id) => {
            info!(%user_id, "password reset");
            Ok(MessageResponse::new("Password has been reset successfully"))
        }
        None => {
            warn!("reset attempted with unknown, expired or used token");
            Err(AppError::InvalidOrExpiredToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::testing::{harness, Harness};

    fn token_from(mail: &Mail) -> String {
        let start = mail.html.find("token=").expect("link in mail") + "token=".len();
        mail.html[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect()
    }

    async fn issue_token(h: &Harness, email: &str) -> String {
        forgot_password(&h.state, email).await.unwrap();
        let sent = h.outbox.sent().await;
        token_from(sent.last().expect("reset mail sent"))
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn reset_tokens_are_long_and_distinct() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn register_twice_is_duplicate() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        let err = register(&h.state, "a@x.com", "pw2", None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUser));
    }

    #[tokio::test]
    async fn stored_password_is_never_plaintext() {
        let h = harness();
        let res = register(&h.state, "a@x.com", "pw1", Some("Ann")).await.unwrap();
        let user = h.state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.id, res.user_id);
        assert_ne!(user.password_hash, "pw1");
        assert!(verify_password("pw1", &user.password_hash).unwrap());
        assert_eq!(user.name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn register_sends_welcome_mail() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", Some("Ann")).await.unwrap();
        let sent = h.outbox.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].subject, "Welcome to CineLog!");
    }

    #[tokio::test]
    async fn welcome_mail_failure_does_not_fail_registration() {
        let h = harness();
        h.outbox.fail(true);
        let res = register(&h.state, "a@x.com", "pw1", None).await;
        assert!(res.is_ok());
        assert!(h.state.users.find_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn login_returns_token_for_user() {
        let h = harness();
        let reg = register(&h.state, "a@x.com", "pw1", Some("Ann")).await.unwrap();
        let res = login(&h.state, "a@x.com", "pw1").await.unwrap();

        let claims = JwtKeys::from(&h.state.config.jwt)
            .verify(&res.access_token)
            .unwrap();
        assert_eq!(claims.sub, reg.user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(
            res.user,
            PublicUser {
                id: reg.user_id,
                email: "a@x.com".into(),
                name: Some("Ann".into()),
            }
        );
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();

        let wrong_password = login(&h.state, "a@x.com", "nope").await.unwrap_err();
        let unknown_email = login(&h.state, "b@x.com", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
    }

    #[tokio::test]
    async fn forgot_password_response_does_not_reveal_account() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();

        let known = forgot_password(&h.state, "a@x.com").await.unwrap();
        let unknown = forgot_password(&h.state, "nobody@x.com").await.unwrap();
        assert_eq!(known, unknown);
    }

    #[tokio::test]
    async fn forgot_password_mail_failure_propagates() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        h.outbox.fail(true);
        let err = forgot_password(&h.state, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn reset_link_uses_configured_base() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        forgot_password(&h.state, "a@x.com").await.unwrap();
        let sent = h.outbox.sent().await;
        let mail = sent.last().unwrap();
        assert!(mail.html.contains(&format!("{}?token=", h.state.config.reset_url_base)));
        assert_eq!(token_from(mail).len(), RESET_TOKEN_LEN);
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        let token = issue_token(&h, "a@x.com").await;

        reset_password(&h.state, &token, "pw2").await.unwrap();
        let again = reset_password(&h.state, &token, "pw3").await.unwrap_err();
        assert!(matches!(again, AppError::InvalidOrExpiredToken));

        login(&h.state, "a@x.com", "pw2").await.unwrap();
        assert!(matches!(
            login(&h.state, "a@x.com", "pw1").await.unwrap_err(),
            AppError::InvalidCredentials
        ));

        let user = h.state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires.is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let h = harness();
        let reg = register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        let past = OffsetDateTime::now_utc() - Duration::minutes(1);
        h.state
            .users
            .set_reset_token(reg.user_id, "expired-token", past)
            .await
            .unwrap();

        let err = reset_password(&h.state, "expired-token", "pw2").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
        login(&h.state, "a@x.com", "pw1").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_rejected() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        for token in ["", "not-a-token"] {
            let err = reset_password(&h.state, token, "pw2").await.unwrap_err();
            assert!(matches!(err, AppError::InvalidOrExpiredToken));
        }
    }

    #[tokio::test]
    async fn new_request_overwrites_previous_token() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        let first = issue_token(&h, "a@x.com").await;
        let second = issue_token(&h, "a@x.com").await;
        assert_ne!(first, second);

        let err = reset_password(&h.state, &first, "pw2").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
        reset_password(&h.state, &second, "pw2").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_resets_with_one_token_succeed_once() {
        let h = harness();
        register(&h.state, "a@x.com", "pw1", None).await.unwrap();
        let token = issue_token(&h, "a@x.com").await;

        let (a, b) = tokio::join!(
            reset_password(&h.state, &token, "from-a"),
            reset_password(&h.state, &token, "from-b"),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }
}
