pub mod factory;
pub mod pool;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CredentialError;

/// GitHub rate-limit bucket a call draws from. Quotas are independent per
/// credential and per scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Core,
    Search,
    /// Calls that consume no quota, e.g. rate-limit inspection.
    None,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Core => "core",
            Scope::Search => "search",
            Scope::None => "none",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a per-scope access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// Seconds until the scope's quota resets.
    WaitSeconds(u64),
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }

    /// Remaining wait, zero when allowed. Used for smallest-wait selection.
    pub fn wait(self) -> u64 {
        match self {
            Access::Allowed => 0,
            Access::WaitSeconds(secs) => secs,
        }
    }
}

/// The identity-bearing part of a credential. The serde tag doubles as the
/// factory tag, which keeps the pool file self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Secret {
    Null,
    Pat {
        token: String,
    },
    ClientSecret {
        client_id: String,
        client_secret: String,
    },
}

/// A pool credential: a tagged secret plus per-scope reset deadlines.
///
/// Credentials are immutable except for the reset map. The secret itself
/// never leaves the credential other than through the md5 identity hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(flatten)]
    secret: Secret,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    resets: BTreeMap<Scope, i64>,
}

impl Credential {
    /// The no-auth sentinel used as a last-resort fallback.
    pub fn anonymous() -> Self {
        Self::from_secret(Secret::Null)
    }

    pub fn pat(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        Ok(Self::from_secret(Secret::Pat { token }))
    }

    pub fn client_secret(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(CredentialError::EmptyClientSecret);
        }
        Ok(Self::from_secret(Secret::ClientSecret {
            client_id,
            client_secret,
        }))
    }

    fn from_secret(secret: Secret) -> Self {
        Self {
            secret,
            resets: BTreeMap::new(),
        }
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Stable, collision-resistant identity. Secrets only enter it hashed.
    pub fn identity(&self) -> String {
        match &self.secret {
            Secret::Null => "null".to_string(),
            Secret::Pat { token } => format!("pat#{:x}", md5::compute(token.as_bytes())),
            Secret::ClientSecret {
                client_id,
                client_secret,
            } => format!(
                "cst#{:x}",
                md5::compute(format!("{client_id}{client_secret}").as_bytes())
            ),
        }
    }

    /// First 8 characters of the identity; enough for logs.
    pub fn short_identity(&self) -> String {
        self.identity().chars().take(8).collect()
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.secret, Secret::Null)
    }

    /// Whether this credential may touch `scope` at `now` (epoch seconds):
    /// allowed when no reset is recorded or the recorded reset has passed,
    /// otherwise the remaining wait.
    pub fn can_access(&self, scope: Scope, now: i64) -> Access {
        match self.resets.get(&scope) {
            #[allow(clippy::cast_sign_loss)]
            Some(&reset) if reset > now => Access::WaitSeconds((reset - now) as u64),
            _ => Access::Allowed,
        }
    }

    /// Overwrites the reset deadline for `scope` unconditionally.
    pub fn set_reset(&mut self, scope: Scope, epoch: i64) {
        self.resets.insert(scope, epoch);
    }

    pub fn reset_for(&self, scope: Scope) -> Option<i64> {
        self.resets.get(&scope).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identities_are_stable_and_hashed() {
        let a = Credential::pat("secret-token").expect("pat");
        let b = Credential::pat("secret-token").expect("pat");
        assert_eq!(a.identity(), b.identity());
        assert!(a.identity().starts_with("pat#"));
        assert!(!a.identity().contains("secret-token"));
        assert_eq!(a.short_identity().len(), 8);
    }

    #[test]
    fn client_secret_identity_hashes_the_concatenation() {
        let cred = Credential::client_secret("id", "secret").expect("client secret");
        let expected = format!("cst#{:x}", md5::compute(b"idsecret"));
        assert_eq!(cred.identity(), expected);
    }

    #[test]
    fn anonymous_identity_is_null() {
        assert_eq!(Credential::anonymous().identity(), "null");
    }

    #[test]
    fn empty_secrets_are_rejected() {
        assert!(matches!(
            Credential::pat("  "),
            Err(CredentialError::EmptyToken)
        ));
        assert!(matches!(
            Credential::client_secret("id", ""),
            Err(CredentialError::EmptyClientSecret)
        ));
    }

    #[test]
    fn can_access_tracks_reset_deadlines() {
        let mut cred = Credential::pat("t").expect("pat");
        let now = 1_000_000;
        assert_eq!(cred.can_access(Scope::Core, now), Access::Allowed);

        cred.set_reset(Scope::Core, now + 300);
        assert_eq!(cred.can_access(Scope::Core, now), Access::WaitSeconds(300));
        // Other scopes are unaffected.
        assert_eq!(cred.can_access(Scope::Search, now), Access::Allowed);
        // A reset in the past allows access again.
        assert_eq!(cred.can_access(Scope::Core, now + 300), Access::Allowed);
    }

    #[test]
    fn set_reset_overwrites_unconditionally() {
        let mut cred = Credential::pat("t").expect("pat");
        cred.set_reset(Scope::Search, 500);
        cred.set_reset(Scope::Search, 100);
        assert_eq!(cred.reset_for(Scope::Search), Some(100));
    }

    #[test]
    fn serde_uses_the_factory_tags() {
        let cred = Credential::pat("t").expect("pat");
        let value = serde_json::to_value(&cred).expect("serialize");
        assert_eq!(value, json!({"kind": "pat", "token": "t"}));

        let mut cred = Credential::anonymous();
        cred.set_reset(Scope::Core, 42);
        let value = serde_json::to_value(&cred).expect("serialize");
        assert_eq!(value, json!({"kind": "null", "resets": {"core": 42}}));

        let back: Credential = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.reset_for(Scope::Core), Some(42));
        assert!(back.is_anonymous());
    }

    #[test]
    fn unknown_kind_fails_to_deserialize() {
        let raw = json!({"kind": "jwt", "token": "x"});
        assert!(serde_json::from_value::<Credential>(raw).is_err());
    }
}
