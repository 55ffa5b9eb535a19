//! Session and identity state.
//!
//! The session is the one place that knows who is signed in. It publishes a
//! [`SessionView`] on a `watch` channel: the state plus a generation that
//! moves on every change of owner. Shopper containers tag their data with the
//! [`Owner`] it was fetched for and discard it once the generation moves,
//! even when the same user signs straight back in.

use std::str::FromStr;
use std::sync::Arc;

use bazaar_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Identity, ProfileUpdate, SignUp, SignUpBody};

const PROFILE: &str = "/user/profile";

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup, before [`Session::restore`] has finished.
    Loading,
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.identity().map(|identity| &identity.id)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// A [`SessionState`] stamped with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub state: SessionState,
    /// Bumped on every transition into or out of `Authenticated`. Profile
    /// refreshes of the same sign-in leave it alone.
    pub generation: u64,
}

impl SessionView {
    /// The signed-in user as of this generation.
    #[must_use]
    pub fn owner(&self) -> Option<Owner> {
        self.state.user_id().map(|user_id| Owner {
            user_id: user_id.clone(),
            generation: self.generation,
        })
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.is_authenticated() || next.is_authenticated() {
            self.generation = self.generation.wrapping_add(1);
        }
        self.state = next;
    }
}

/// One particular sign-in of a user. Signing out and back in as the same
/// user yields a different owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user_id: UserId,
    pub generation: u64,
}

/// What happens right after a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignUpPolicy {
    /// Leave the session anonymous; the user signs in separately.
    StayAnonymous,
    /// Sign in with the same credentials straight away.
    #[default]
    AutoSignIn,
}

impl FromStr for SignUpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stay_anonymous" => Ok(Self::StayAnonymous),
            "auto_sign_in" => Ok(Self::AutoSignIn),
            other => Err(format!(
                "invalid sign-up policy: {other} (expected auto_sign_in or stay_anonymous)"
            )),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session context shared by every container.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    state: Arc<watch::Sender<SessionView>>,
    sign_up_policy: SignUpPolicy,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.inner.state.borrow().state)
            .field("sign_up_policy", &self.inner.sign_up_policy)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session in the `Loading` state.
    ///
    /// Registers a hook on `api` so that any 401 drops the session to
    /// `Anonymous`.
    #[must_use]
    pub fn new(api: ApiClient, sign_up_policy: SignUpPolicy) -> Self {
        let (state, _) = watch::channel(SessionView {
            state: SessionState::Loading,
            generation: 0,
        });
        let state = Arc::new(state);

        let hook_state = Arc::clone(&state);
        api.on_unauthorized(move || {
            hook_state.send_if_modified(|view| {
                if view.state.is_authenticated() {
                    view.transition(SessionState::Anonymous);
                    true
                } else {
                    false
                }
            });
        });

        Self {
            inner: Arc::new(SessionInner {
                api,
                state,
                sign_up_policy,
            }),
        }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().state.clone()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().state.identity().cloned()
    }

    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.inner.state.borrow().state.user_id().cloned()
    }

    /// The current sign-in, if any.
    #[must_use]
    pub fn current_owner(&self) -> Option<Owner> {
        self.inner.state.borrow().owner()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.state.borrow().generation
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().state.is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().state.is_loading()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.state.subscribe()
    }

    /// The current identity, or `NotAuthenticated(action)`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when no one is signed in.
    pub fn require_identity(&self, action: &'static str) -> Result<Identity, ClientError> {
        self.current_identity()
            .ok_or(ClientError::NotAuthenticated(action))
    }

    /// The current sign-in, or `NotAuthenticated(action)`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when no one is signed in.
    pub fn require_owner(&self, action: &'static str) -> Result<Owner, ClientError> {
        self.current_owner()
            .ok_or(ClientError::NotAuthenticated(action))
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.send_modify(|view| view.transition(state));
    }

    pub(crate) fn set_identity(&self, identity: Identity) {
        log_identity(&identity);
        self.set_state(SessionState::Authenticated(identity));
    }

    /// Resolve the startup state from the stored credential.
    ///
    /// No credential means `Anonymous`. Otherwise the profile is fetched; any
    /// failure discards the credential and leaves the session anonymous.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionState {
        if !self.api().has_credential() {
            self.set_state(SessionState::Anonymous);
            return self.state();
        }

        match self.api().get::<Identity>(PROFILE).await {
            Ok(identity) => {
                info!(user_id = %identity.id, "Session restored");
                self.set_identity(identity);
            }
            Err(e) => {
                warn!(error = %e, "Stored credential rejected, signing out");
                self.api().forget_credential();
                self.set_state(SessionState::Anonymous);
            }
        }
        self.state()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed email; otherwise the server's message.
    /// The state is unchanged on failure.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ClientError> {
        let email = Email::parse(email).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        if password.expose_secret().is_empty() {
            return Err(ClientError::InvalidInput("password cannot be empty".to_string()));
        }

        let identity = self.api().login(&email, password).await?;
        info!(user_id = %identity.id, "Signed in");
        self.set_identity(identity.clone());
        Ok(identity)
    }

    /// Register a new account.
    ///
    /// Under [`SignUpPolicy::AutoSignIn`] the new user is signed in and their
    /// identity returned; under `StayAnonymous` this returns `None`.
    ///
    /// # Errors
    ///
    /// The server's rejection (e.g. email already taken), or any error from
    /// the follow-up sign-in.
    #[instrument(skip_all, fields(email = %request.email.masked()))]
    pub async fn sign_up(&self, request: &SignUp) -> Result<Option<Identity>, ClientError> {
        if request.full_name.trim().is_empty() {
            return Err(ClientError::InvalidInput("full name cannot be empty".to_string()));
        }

        self.api()
            .post_unit("/auth/register", Some(&SignUpBody::from(request)))
            .await?;
        info!("Account registered");

        match self.inner.sign_up_policy {
            SignUpPolicy::StayAnonymous => Ok(None),
            SignUpPolicy::AutoSignIn => self
                .sign_in(request.email.as_str(), &request.password)
                .await
                .map(Some),
        }
    }

    /// Drop the credential and become anonymous. Never fails.
    #[instrument(skip(self))]
    pub fn sign_out(&self) {
        self.api().forget_credential();
        self.set_state(SessionState::Anonymous);
        info!("Signed out");
    }

    /// `POST /auth/forgot-password`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed email, otherwise the server's message.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
        }

        let email = Email::parse(email).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        self.api()
            .post_unit("/auth/forgot-password", Some(&Body { email: email.as_str() }))
            .await
    }

    /// `POST /auth/reset-password` with the token from the reset email.
    ///
    /// # Errors
    ///
    /// The server's message, e.g. for an expired token.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &SecretString,
    ) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            token: &'a str,
            password: &'a str,
        }

        self.api()
            .post_unit(
                "/auth/reset-password",
                Some(&Body {
                    token,
                    password: new_password.expose_secret(),
                }),
            )
            .await
    }

    /// `POST /user/change-password`. Needs a signed-in user.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise the server's message.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ClientError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            current_password: &'a str,
            new_password: &'a str,
        }

        self.require_identity("change your password")?;
        self.api()
            .post_unit(
                "/user/change-password",
                Some(&Body {
                    current_password: current_password.expose_secret(),
                    new_password: new_password.expose_secret(),
                }),
            )
            .await
    }

    /// `POST /auth/verify-email`. Marks the current identity verified on
    /// success.
    ///
    /// # Errors
    ///
    /// The server's message, e.g. for an invalid token.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> Result<(), ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            token: &'a str,
        }

        self.api()
            .post_unit("/auth/verify-email", Some(&Body { token }))
            .await?;

        self.inner.state.send_if_modified(|view| match &mut view.state {
            SessionState::Authenticated(identity) if !identity.is_email_verified => {
                identity.is_email_verified = true;
                true
            }
            _ => false,
        });
        Ok(())
    }

    /// `PUT /user/profile`.
    ///
    /// The server's returned identity wins when there is one; otherwise the
    /// update is merged into the current identity.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise the server's message.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, ClientError> {
        let mut identity = self.require_identity("update your profile")?;

        let returned: Option<Identity> = self.api().put(PROFILE, update).await?;
        match returned {
            Some(server) => identity = server,
            None => identity.apply(update),
        }

        self.replace_if_same_user(&identity);
        Ok(identity)
    }

    /// Re-fetch `GET /user/profile` into the session.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise the adapter error.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<Identity, ClientError> {
        self.require_identity("refresh your profile")?;
        let identity: Identity = self.api().get(PROFILE).await?;
        self.replace_if_same_user(&identity);
        Ok(identity)
    }

    /// `POST /auth/refresh`, keeping the session but rotating the credential.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` when anonymous, otherwise the adapter error.
    pub async fn refresh_credential(&self) -> Result<bool, ClientError> {
        self.require_identity("refresh your session")?;
        self.api().refresh_credential().await
    }

    /// Swap in a newer copy of the signed-in identity. A sign-out or a
    /// different sign-in that happened meanwhile wins.
    fn replace_if_same_user(&self, identity: &Identity) {
        self.inner.state.send_if_modified(|view| match &mut view.state {
            SessionState::Authenticated(current) if current.id == identity.id => {
                *current = identity.clone();
                true
            }
            _ => false,
        });
    }
}

fn log_identity(identity: &Identity) {
    tracing::debug!(
        user_id = %identity.id,
        role = %identity.role,
        email = %identity.email.masked(),
        "Identity set"
    );
}
