//! The session controller: logging in and out, registration, and keeping
//! the cached user in step with the stored tokens.

use serde::Serialize;

use crate::{
    Error,
    api_client::{ApiClient, ApiRequest},
    endpoints,
    token_store::{TokenKind, TokenPair},
    user::User,
};

use super::models::{Credentials, LoginResponse, RegistrationForm};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody is logged in. The initial state.
    Unauthenticated,
    /// A log in is in flight.
    Authenticating,
    /// A user is logged in.
    Authenticated,
    /// The last log in failed with this message.
    Error(String),
    /// A log out is in flight.
    LoggingOut,
}

/// What the rest of the application sees of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The logged in user, if any.
    pub user: Option<User>,
    /// Whether a user is logged in.
    pub is_authenticated: bool,
    /// Whether an auth operation is in flight. True until the first check
    /// of the stored tokens has finished.
    pub is_loading: bool,
    /// The message of the last failed operation.
    pub error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
        }
    }
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    refresh: &'a str,
}

/// Drives the auth state machine.
///
/// Each controller owns its own session, so independent sessions can live
/// side by side, e.g. one per test. The token store is shared with the
/// [ApiClient] it was created with.
#[derive(Debug)]
pub struct SessionController {
    client: ApiClient,
    state: AuthState,
    session: Session,
}

impl SessionController {
    /// Create a controller in the [AuthState::Unauthenticated] state.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: AuthState::Unauthenticated,
            session: Session::default(),
        }
    }

    /// The current state.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The client the controller sends requests with.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Log in with an email and password.
    ///
    /// On success both tokens are stored and the returned user is cached.
    /// On failure the state becomes [AuthState::Error] and the stored tokens
    /// are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthorized] if the credentials were rejected, or any
    /// other error of [ApiClient::send].
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, Error> {
        self.state = AuthState::Authenticating;
        self.session.is_loading = true;
        self.session.error = None;

        let credentials = Credentials {
            email: email.to_owned(),
            password: password.to_owned(),
        };

        let result = match ApiRequest::post(endpoints::LOG_IN)
            .anonymous()
            .json(&credentials)
        {
            Ok(request) => self.client.send_json::<LoginResponse>(request).await,
            Err(error) => Err(error),
        };

        self.session.is_loading = false;

        match result {
            Ok(response) => {
                self.client.tokens().set_pair(&TokenPair {
                    access_token: response.access,
                    refresh_token: response.refresh,
                });
                tracing::info!("logged in as {}", response.user.email);
                self.authenticate(response.user.clone());
                Ok(response.user)
            }
            Err(error) => {
                tracing::warn!("log in failed: {error}");
                let message = error.to_string();
                self.state = AuthState::Error(message.clone());
                self.session.error = Some(message);
                Err(error)
            }
        }
    }

    /// Create an account.
    ///
    /// The form is checked before anything is sent. Registering does not log
    /// the new user in.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] without sending anything if the form is
    /// invalid, otherwise any error of [ApiClient::send].
    pub async fn register(&mut self, form: &RegistrationForm) -> Result<(), Error> {
        if let Err(error) = form.validate() {
            self.session.error = Some(error.to_string());
            return Err(error.into());
        }

        self.session.is_loading = true;
        self.session.error = None;

        let result = match ApiRequest::post(endpoints::REGISTER).anonymous().json(form) {
            Ok(request) => self.client.send(request).await.map(|_| ()),
            Err(error) => Err(error),
        };

        self.session.is_loading = false;

        if let Err(error) = &result {
            tracing::warn!("registration failed: {error}");
            self.session.error = Some(error.to_string());
        } else {
            tracing::info!("registered {}", form.email);
        }

        result
    }

    /// Log out.
    ///
    /// The refresh token is invalidated on the backend if possible. Whatever
    /// the backend says, both tokens are cleared and the session is reset.
    ///
    /// # Errors
    ///
    /// Returns [Error::Io] if the stored tokens could not be removed,
    /// otherwise the error of the remote call. Either way the session has
    /// already been reset.
    pub async fn logout(&mut self) -> Result<(), Error> {
        self.state = AuthState::LoggingOut;

        let result = match self.client.tokens().get(TokenKind::Refresh) {
            Some(refresh) => self.invalidate_refresh_token(&refresh).await,
            None => Ok(()),
        };

        if let Err(error) = &result {
            tracing::warn!("could not invalidate the session on the server: {error}");
        }

        let cleared = self.forget_tokens();
        self.reset(None);
        tracing::info!("logged out");

        cleared.and(result)
    }

    /// Fetch the logged in user's profile.
    ///
    /// If the fetch fails, the access token is refreshed once and the fetch
    /// retried. If that fails too, both tokens are cleared and the session
    /// is reset.
    ///
    /// # Errors
    ///
    /// Returns the error of the first fetch if the refresh or the retry
    /// failed.
    pub async fn get_current_user(&mut self) -> Result<User, Error> {
        self.session.is_loading = true;

        let first_error = match self.fetch_user().await {
            Ok(user) => {
                self.authenticate(user.clone());
                return Ok(user);
            }
            Err(error) => error,
        };

        tracing::debug!("could not fetch the current user, refreshing: {first_error}");

        let retried = match self.refresh().await {
            Ok(()) => self.fetch_user().await,
            Err(error) => Err(error),
        };

        match retried {
            Ok(user) => {
                self.authenticate(user.clone());
                Ok(user)
            }
            Err(error) => {
                tracing::warn!("could not restore the session: {error}");
                let _ = self.forget_tokens();
                self.reset(self.session.error.clone());
                Err(first_error)
            }
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthorized] if there is no refresh token or the
    /// backend rejected it, or any error of [ApiClient::send]. Either way
    /// both tokens are cleared and the session is reset.
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let result = match self.client.tokens().get(TokenKind::Refresh) {
            Some(refresh) => self.client.refresh_access_token(&refresh).await,
            None => Err(Error::Unauthorized("no refresh token".to_owned())),
        };

        match result {
            Ok(refreshed) => {
                let tokens = self.client.tokens();
                tokens.set(TokenKind::Access, &refreshed.access);
                if let Some(rotated) = &refreshed.refresh {
                    tokens.set(TokenKind::Refresh, rotated);
                }
                self.state = AuthState::Authenticated;
                self.session.is_authenticated = true;
                Ok(())
            }
            Err(error) => {
                tracing::warn!("token refresh failed: {error}");
                let _ = self.forget_tokens();
                self.reset(self.session.error.clone());
                Err(error)
            }
        }
    }

    /// Forget the last error.
    pub fn clear_error(&mut self) {
        self.session.error = None;
        if matches!(self.state, AuthState::Error(_)) {
            self.state = AuthState::Unauthenticated;
        }
    }

    /// Mark an operation as in flight, or finished.
    pub fn set_loading(&mut self, is_loading: bool) {
        self.session.is_loading = is_loading;
    }

    async fn fetch_user(&self) -> Result<User, Error> {
        if self.client.tokens().get(TokenKind::Access).is_none() {
            return Err(Error::Unauthorized("no access token".to_owned()));
        }

        // The controller runs its own refresh, so skip the client's.
        self.client
            .execute_json(&ApiRequest::get(endpoints::CURRENT_USER))
            .await
    }

    async fn invalidate_refresh_token(&self, refresh: &str) -> Result<(), Error> {
        let request = ApiRequest::post(endpoints::LOG_OUT).json(&LogoutRequest { refresh })?;
        self.client.execute(&request).await?;
        Ok(())
    }

    fn forget_tokens(&self) -> Result<(), Error> {
        let result = self.client.tokens().clear();
        if let Err(error) = &result {
            tracing::error!("stored tokens were not removed: {error}");
        }
        result
    }

    fn authenticate(&mut self, user: User) {
        self.state = AuthState::Authenticated;
        self.session = Session {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        };
    }

    fn reset(&mut self, error: Option<String>) {
        self.state = AuthState::Unauthenticated;
        self.session = Session {
            user: None,
            is_authenticated: false,
            is_loading: false,
            error,
        };
    }
}
