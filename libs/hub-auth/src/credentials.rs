//! Client credentials used for the token exchange

use std::fmt;

/// Immutable client identifier and secret pair
///
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn is_empty(&self) -> bool {
        self.client_id.is_empty() || self.client_secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = Credentials::new("client", "s3cr3t");
        let rendered = format!("{:?}", credentials);

        assert!(rendered.contains("client"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_missing_half_is_empty() {
        assert!(Credentials::new("client", "").is_empty());
        assert!(Credentials::new("", "secret").is_empty());
        assert!(!Credentials::new("client", "secret").is_empty());
    }
}
