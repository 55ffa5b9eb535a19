//! Sign-in, registration and profile commands.

use bazaar_core::Email;
use bazaar_storefront::AppState;
use bazaar_storefront::models::SignUp;
use secrecy::SecretString;

use super::emit;
use crate::render;

/// Attach the signed-in identity to Sentry events, or clear it.
pub fn tag_sentry_user(state: &AppState) {
    let user = state.session().current_identity().map(|identity| sentry::User {
        id: Some(identity.id.to_string()),
        email: Some(identity.email.to_string()),
        ..Default::default()
    });
    sentry::configure_scope(|scope| scope.set_user(user));
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let identity = state
        .session()
        .sign_in(email, &SecretString::from(password))
        .await?;
    tag_sentry_user(state);
    emit(&format!("Signed in as {}.", identity.display_name()));
    Ok(())
}

pub fn logout(state: &AppState) {
    state.session().sign_out();
    tag_sentry_user(state);
    emit("Signed out.");
}

pub async fn register(
    state: &AppState,
    email: &str,
    password: String,
    full_name: String,
    phone: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = SignUp {
        email: Email::parse(email)?,
        password: SecretString::from(password),
        full_name,
        phone,
    };
    match state.session().sign_up(&request).await? {
        Some(identity) => {
            tag_sentry_user(state);
            emit(&format!("Account created. Signed in as {}.", identity.display_name()));
        }
        None => emit("Account created. Check your inbox, then run `bz login`."),
    }
    Ok(())
}

pub fn whoami(state: &AppState) {
    match state.session().current_identity() {
        Some(identity) => emit(&render::identity(&identity)),
        None => emit("Not signed in."),
    }
}

pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    state.session().forgot_password(email).await?;
    emit("If that address has an account, a reset link is on its way.");
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    state
        .session()
        .reset_password(token, &SecretString::from(password))
        .await?;
    emit("Password reset. You can sign in now.");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    current: String,
    new: String,
) -> Result<(), Box<dyn std::error::Error>> {
    state
        .session()
        .change_password(&SecretString::from(current), &SecretString::from(new))
        .await?;
    emit("Password changed.");
    Ok(())
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<(), Box<dyn std::error::Error>> {
    state.session().verify_email(token).await?;
    emit("Email verified.");
    Ok(())
}
