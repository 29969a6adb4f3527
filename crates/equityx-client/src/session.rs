//! Credential and session gate
//!
//! The core never owns session state. Everything that needs a bearer token
//! receives an `Arc<dyn SessionGate>` and asks it at dispatch time, so a
//! sign-in or logout is picked up by the next request.

use crate::error::{ReportError, Result};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Source of the caller's credentials
#[cfg_attr(test, mockall::automock)]
pub trait SessionGate: Send + Sync {
    /// Whether the user has signed in
    fn is_authenticated(&self) -> bool;

    /// Bearer token to attach to API calls, if any
    fn token(&self) -> Option<String>;

    /// Forget the credentials
    fn logout(&self);
}

/// Fail with [`ReportError::Validation`] unless the gate reports a signed-in user
pub fn require_authenticated(gate: &dyn SessionGate) -> Result<()> {
    if gate.is_authenticated() {
        Ok(())
    } else {
        Err(ReportError::Validation("not signed in".to_string()))
    }
}

/// In-process session holding a bearer token
#[derive(Debug, Default)]
pub struct TokenSession {
    token: RwLock<Option<String>>,
    logged_in: AtomicBool,
}

impl TokenSession {
    /// Create a signed-out session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that is already signed in with `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    /// Create a session from `EQUITYX_TOKEN`, signed out when it is unset
    pub fn from_env() -> Self {
        match std::env::var("EQUITYX_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Self::with_token(token),
            _ => Self::new(),
        }
    }

    /// Store a token and mark the session as signed in
    pub fn sign_in(&self, token: impl Into<String>) {
        let token = token.into();
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
        self.logged_in.store(true, Ordering::SeqCst);
        info!("Session signed in");
    }
}

impl SessionGate for TokenSession {
    fn is_authenticated(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst) || self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .filter(|token| !token.is_empty())
    }

    /// Drop the token and the signed-in marker
    fn logout(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        self.logged_in.store(false, Ordering::SeqCst);
        debug!("Session signed out");
    }
}
