//! Identity seam for the external identity provider.
//!
//! Sign-in, sign-up and confirmation flows happen outside this crate; all
//! the sync layer ever asks is "who is signed in right now".

use std::sync::RwLock;

/// An identity resolved from the external provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Opaque provider-issued identifier; doubles as the record-store
    /// user id.
    pub user_id: String,
    /// Login email, when the provider exposes one.
    pub email: Option<String>,
}

/// Source of the calling user's identity.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in identity, or None when nobody is.
    fn current_identity(&self) -> Option<Identity>;
}

/// An identity provider holding a single switchable identity.
///
/// Stands in for the real provider in embedded setups and tests; `clear`
/// models sign-out.
pub struct FixedIdentity {
    identity: RwLock<Option<Identity>>,
}

impl FixedIdentity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            identity: RwLock::new(Some(Identity {
                user_id: user_id.into(),
                email: Some(email.into()),
            })),
        }
    }

    /// A provider with nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            identity: RwLock::new(None),
        }
    }

    pub fn set(&self, identity: Identity) {
        *self.identity.write().expect("identity lock poisoned") = Some(identity);
    }

    pub fn clear(&self) {
        *self.identity.write().expect("identity lock poisoned") = None;
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.read().expect("identity lock poisoned").clone()
    }
}
