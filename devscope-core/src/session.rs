//! Authentication session
//!
//! The backend issues a bearer token on login (and on registration, for
//! backends that sign the user straight in). [`Session`] keeps that token,
//! the account e-mail and the user id together with the [`TokenStore`] that
//! persists them between runs.
//!
//! Lifecycle:
//!
//! 1. [`Session::load`] restores whatever the store holds.
//! 2. [`Session::login`] / [`Session::register`] validate the form, call the
//!    backend and persist the new token.
//! 3. A 401 from any profile call, or an explicit [`Session::logout`], clears
//!    both memory and store.
//!
//! Form validation runs before any request. Every rejected field is reported,
//! not just the first.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::DeviceBackend;
use crate::{DeviceError, Result};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn email_looks_valid(email: &str) -> bool {
    let re = EMAIL_PATTERN.get_or_init(|| match Regex::new(r"\S+@\S+\.\S+") {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Invalid e-mail pattern: {}", e);
            None
        }
    });
    // Without a pattern the backend gets the final say
    re.as_ref().map_or(true, |re| re.is_match(email))
}

/// One rejected form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// All rejected fields of a form, in form order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Message for `field`, if it was rejected
    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok` when nothing was rejected, else the first error
    pub fn into_result(self) -> Result<()> {
        match self.errors.into_iter().next() {
            Some(error) => Err(DeviceError::validation(error.field, error.message)),
            None => Ok(()),
        }
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.push("email", "Email is required");
    } else if !email_looks_valid(email) {
        errors.push("email", "Please enter a valid email address");
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.push("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", "Password must be at least 6 characters long");
    }
    if password != confirm {
        errors.push("confirm_password", "Passwords do not match");
    }
}

/// Login form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.push("password", "Password is required");
        }
        errors
    }
}

/// Registration form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.name.trim().is_empty() {
            errors.push("name", "Name is required");
        }
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, &self.password, &self.confirm_password);
        errors
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            full_name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// `POST /auth/register` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// `GET /auth/profile` payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(alias = "full_name")]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

/// `PUT /auth/profile` body
///
/// Values are trimmed and blank ones left out, so an empty field never
/// overwrites what the server holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ProfileUpdate {
    pub fn new(phone: &str, bio: &str, new_password: &str) -> Self {
        fn keep(value: &str) -> Option<String> {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }

        Self {
            phone: keep(phone),
            bio: keep(bio),
            new_password: keep(new_password),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.bio.is_none() && self.new_password.is_none()
    }

    /// A new password, when given, must meet the registration rules
    pub fn validate(&self, confirm_password: &str) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if let Some(password) = &self.new_password {
            check_new_password(&mut errors, password, confirm_password.trim());
        }
        errors
    }
}

/// Login / registration response
///
/// Backends disagree on naming, so the token is looked for under `token`,
/// `access_token` and `jwt`, and the user id under `user_id`, `_id`, `id`
/// and `user.id` / `user._id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    token: Option<String>,
    access_token: Option<String>,
    jwt: Option<String>,
    pub token_type: Option<String>,
    user_id: Option<Value>,
    #[serde(rename = "_id")]
    underscore_id: Option<Value>,
    id: Option<Value>,
    pub user: Option<Value>,
    pub message: Option<String>,
}

impl AuthResponse {
    pub fn bearer_token(&self) -> Option<&str> {
        [&self.token, &self.access_token, &self.jwt]
            .into_iter()
            .flatten()
            .map(|token| token.as_str())
            .find(|token| !token.is_empty())
    }

    pub fn user_id(&self) -> Option<String> {
        let nested = self
            .user
            .as_ref()
            .and_then(|user| user.get("id").or_else(|| user.get("_id")));

        [
            self.user_id.as_ref(),
            self.underscore_id.as_ref(),
            self.id.as_ref(),
            nested,
        ]
        .into_iter()
        .flatten()
        .find_map(id_string)
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What the token store keeps on disk
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

/// JSON file holding the current session
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved session; `None` when nothing was stored
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(contents.as_bytes())?;

        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Current authentication state
#[derive(Debug)]
pub struct Session {
    token: Option<String>,
    email: Option<String>,
    user_id: Option<String>,
    store: TokenStore,
}

impl Session {
    /// Restore from `store`; an unreadable store starts logged out
    pub fn load(store: TokenStore) -> Self {
        let stored = match store.load() {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", store.path().display(), e);
                StoredSession::default()
            }
        };

        Self {
            token: stored.token,
            email: stored.email,
            user_id: stored.user_id,
            store,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn require_token(&self) -> Result<String> {
        self.token.clone().ok_or(DeviceError::Unauthorized)
    }

    fn adopt(&mut self, email: &str, response: &AuthResponse) -> Result<()> {
        self.token = response.bearer_token().map(str::to_string);
        self.email = Some(email.to_string());
        self.user_id = response.user_id();

        self.store.save(&StoredSession {
            token: self.token.clone(),
            email: self.email.clone(),
            user_id: self.user_id.clone(),
        })
    }

    /// Validate, log in and persist the token
    pub async fn login(&mut self, backend: &dyn DeviceBackend, form: &LoginForm) -> Result<()> {
        form.validate().into_result()?;

        let email = form.email.trim();
        let request = LoginForm {
            email: email.to_string(),
            password: form.password.clone(),
        };

        let response = match backend.login(&request).await {
            Err(DeviceError::Unauthorized) => {
                return Err(DeviceError::validation("password", "Invalid credentials"))
            }
            other => other?,
        };

        if response.bearer_token().is_none() {
            return Err(DeviceError::InvalidResponse(
                "login response carried no token".to_string(),
            ));
        }

        self.adopt(email, &response)?;
        info!("Logged in as {}", email);
        Ok(())
    }

    /// Validate and register
    ///
    /// Returns the server's message. When the response carries a token the
    /// session is signed in as well; otherwise the account usually awaits
    /// e-mail verification.
    pub async fn register(
        &mut self,
        backend: &dyn DeviceBackend,
        form: &RegisterForm,
    ) -> Result<Option<String>> {
        form.validate().into_result()?;

        let request = form.to_request();
        let response = backend.register(&request).await?;

        if response.bearer_token().is_some() {
            self.adopt(&request.email, &response)?;
            info!("Registered and logged in as {}", request.email);
        } else {
            info!("Registered {}; no token issued", request.email);
        }

        Ok(response.message.clone())
    }

    /// Forget the token in memory and on disk
    pub fn logout(&mut self) -> Result<()> {
        self.token = None;
        self.email = None;
        self.user_id = None;
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Fetch the profile; a rejected token logs the session out
    pub async fn profile(&mut self, backend: &dyn DeviceBackend) -> Result<UserProfile> {
        let token = self.require_token()?;
        let result = backend.profile(&token).await;
        self.logout_on_unauthorized(result)
    }

    /// Send a profile update; a rejected token logs the session out
    pub async fn update_profile(
        &mut self,
        backend: &dyn DeviceBackend,
        update: &ProfileUpdate,
        confirm_password: &str,
    ) -> Result<()> {
        update.validate(confirm_password).into_result()?;
        let token = self.require_token()?;
        let result = backend.update_profile(&token, update).await;
        self.logout_on_unauthorized(result)
    }

    fn logout_on_unauthorized<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(DeviceError::Unauthorized)) {
            warn!("Token rejected by backend, logging out");
            if let Err(e) = self.logout() {
                warn!("Failed to clear session store: {}", e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_register_form_reports_every_field() {
        let form = RegisterForm {
            name: "  ".to_string(),
            email: "not-an-email".to_string(),
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
        };

        let errors = form.validate();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters long")
        );
        assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
    }

    #[test]
    fn test_login_form() {
        let errors = LoginForm::default().validate();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let form = LoginForm {
            email: "anna@example.org".to_string(),
            password: "x".to_string(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_into_result_returns_first_error() {
        let errors = LoginForm::default().validate();
        match errors.into_result() {
            Err(DeviceError::Validation { field, .. }) => assert_eq!(field, "email"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_profile_update_drops_blank_values() {
        let update = ProfileUpdate::new(" +7 900 ", "   ", "");
        assert_eq!(update.phone.as_deref(), Some("+7 900"));
        assert!(update.bio.is_none());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"phone": "+7 900"}));
        assert!(ProfileUpdate::new("", "", "").is_empty());
    }

    #[test]
    fn test_profile_password_rules() {
        let update = ProfileUpdate::new("", "", "secret1");
        assert!(update.validate("secret1").is_empty());
        assert_eq!(
            update.validate("other").get("confirm_password"),
            Some("Passwords do not match")
        );
        assert!(ProfileUpdate::new("", "", "abc").validate("abc").get("password").is_some());
    }

    #[test]
    fn test_auth_response_token_aliases() {
        let response: AuthResponse =
            serde_json::from_value(json!({"access_token": "abc", "token_type": "bearer"})).unwrap();
        assert_eq!(response.bearer_token(), Some("abc"));
        assert!(response.user_id().is_none());

        let response: AuthResponse =
            serde_json::from_value(json!({"jwt": "xyz", "user": {"_id": 42}})).unwrap();
        assert_eq!(response.bearer_token(), Some("xyz"));
        assert_eq!(response.user_id().as_deref(), Some("42"));

        let response: AuthResponse = serde_json::from_value(json!({
            "message": "Registration successful."
        }))
        .unwrap();
        assert!(response.bearer_token().is_none());
    }

    #[test]
    fn test_token_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested/session.json"));
        assert!(store.load().unwrap().is_none());

        let stored = StoredSession {
            token: Some("t".to_string()),
            email: Some("a@b.c".to_string()),
            user_id: None,
        };
        store.save(&stored).unwrap();
        assert_eq!(store.load().unwrap(), Some(stored));

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = TokenStore::new(&path);
        let stored = StoredSession {
            token: Some("secret".to_string()),
            ..Default::default()
        };

        store.save(&stored).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // A file left readable by an older build is tightened on the next save
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&stored).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(stored));
    }

    #[test]
    fn test_corrupt_store_loads_logged_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let session = Session::load(TokenStore::new(&path));
        assert!(!session.is_logged_in());
    }
}
