//! In-memory session state and its mutation rules.
//!
//! `SessionState` is pure: mutations never touch storage. The
//! `SessionManager` commits a mutation and then writes the persisted subset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Credential scheme applied to the token at the wire boundary
pub const CREDENTIAL_SCHEME: &str = "Bearer";

/// Coarse authorization tag issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    User,
    Admin,
    Student,
    University,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Admin, Role::Student, Role::University];

    /// The wire tag, e.g. `"ADMIN"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
            Role::University => "UNIVERSITY",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Exact, case-sensitive match on the wire tag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
}

/// Successful login/register response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
}

impl AuthPayload {
    /// Build the user record carried by this payload
    pub fn to_user(&self) -> User {
        let (first_name, last_name) = split_full_name(self.full_name.as_deref().unwrap_or(""));
        let full_name = match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} {}", first_name, last_name).trim().to_string(),
        };
        User {
            email: self.email.clone(),
            first_name,
            last_name,
            full_name,
            role: self.role,
        }
    }
}

/// Remove any leading credential-scheme prefix (`Bearer `, any case, repeated).
pub fn strip_scheme(token: &str) -> String {
    let mut rest = token.trim();
    loop {
        let n = CREDENTIAL_SCHEME.len();
        let has_prefix = rest.len() >= n
            && rest.is_char_boundary(n)
            && rest[..n].eq_ignore_ascii_case(CREDENTIAL_SCHEME)
            && (rest.len() == n || rest[n..].starts_with(char::is_whitespace));
        if !has_prefix {
            return rest.to_string();
        }
        rest = rest[n..].trim_start();
    }
}

/// Split "Jane Q Doe" into ("Jane", "Q Doe").
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let last = words.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Ticket handed to an in-flight auth action; only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTicket(pub(crate) u64);

impl ActionTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: Option<String>,
    user: Option<User>,
    is_loading: bool,
    generation: u64,
}

impl SessionState {
    /// Anonymous state
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restored(token: Option<String>, user: Option<User>) -> Self {
        let mut state = Self::new();
        state.set_token(token.as_deref());
        state.user = user;
        state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token and user both present. A token without a user is anonymous.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn check_auth(&self) -> bool {
        self.is_authenticated()
    }

    /// Exact, case-sensitive role check; false without a user
    pub fn has_role(&self, role: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.as_str() == role)
    }

    pub fn login(&mut self, payload: &AuthPayload) -> User {
        let user = payload.to_user();
        self.set_token(Some(&payload.token));
        self.user = Some(user.clone());
        self.is_loading = false;
        user
    }

    /// Back to anonymous. Invalidates every outstanding action ticket.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.is_loading = false;
        self.generation += 1;
    }

    /// Drop credentials without touching in-flight actions
    pub fn clear_credentials(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub fn set_token(&mut self, token: Option<&str>) {
        self.token = token.map(strip_scheme).filter(|t| !t.is_empty());
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub fn begin_action(&mut self) -> ActionTicket {
        self.generation += 1;
        self.is_loading = true;
        ActionTicket(self.generation)
    }

    pub fn is_current(&self, ticket: ActionTicket) -> bool {
        ticket.0 == self.generation
    }
}
