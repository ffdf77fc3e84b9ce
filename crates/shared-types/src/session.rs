//! # Admin Session
//!
//! Payload carried by the admin session credential.
//!
//! ```text
//! [new] ──MFA setup──→ [verified]
//! [mfa_required] ──MFA verify──→ [verified]
//! ```
//!
//! Only `verified` grants unrestricted access. Sessions are replaced on
//! re-login, never mutated.

use serde::{Deserialize, Serialize};

/// Authentication progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    New,
    MfaRequired,
    Verified,
}

/// Decoded admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub principal_id: String,
    #[serde(default)]
    pub mfa_methods: Vec<String>,
    pub auth_state: AuthState,
}

impl AdminSession {
    pub fn new(principal_id: impl Into<String>, auth_state: AuthState) -> Self {
        Self {
            principal_id: principal_id.into(),
            mfa_methods: Vec::new(),
            auth_state,
        }
    }

    pub fn with_mfa_methods(mut self, methods: Vec<String>) -> Self {
        self.mfa_methods = methods;
        self
    }

    /// An enrolled factor or an explicit `mfa_required` state means the
    /// current browser must prove MFA.
    pub fn requires_mfa_verification(&self) -> bool {
        !self.mfa_methods.is_empty() || self.auth_state == AuthState::MfaRequired
    }

    /// A fresh account must enroll a factor first.
    pub fn requires_mfa_setup(&self) -> bool {
        self.auth_state == AuthState::New
    }
}
