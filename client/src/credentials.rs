use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use std::env;

/// Credentials represents the privileged, service-account style secret used
/// to sign storage URLs.  Deployments without this secret still work; they
/// just cannot mint signed URLs and fall back to proxying object bytes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Identity under which URLs are signed
    #[serde(rename = "clientEmail")]
    pub client_email: String,

    /// Shared secret used for HMAC signatures
    #[serde(rename = "secretKey")]
    pub secret_key: String,
}

impl Credentials {
    /// Create a new Credentials object from the `SKYSTASH_SERVICE_ACCOUNT_KEY`
    /// environment variable, which holds the service-account blob as JSON.
    ///
    /// A missing variable is an error; callers that want to degrade to
    /// unauthenticated operation should treat that error as "no credentials"
    /// rather than failing.
    pub fn from_env() -> Result<Credentials, Error> {
        let blob = env::var("SKYSTASH_SERVICE_ACCOUNT_KEY")
            .context("SKYSTASH_SERVICE_ACCOUNT_KEY")?;
        Credentials::from_json(&blob)
    }

    /// Parse a Credentials object from a JSON service-account blob.
    pub fn from_json(blob: &str) -> Result<Credentials, Error> {
        serde_json::from_str(blob).context("while parsing service-account credentials as JSON")
    }

    /// Create a new Credentials object directly.
    ///
    /// Examples:
    ///
    /// ```
    /// # use skystash::Credentials;
    /// let _ = Credentials::new("svc@skystash.example", "s3cret");
    /// ```
    pub fn new<S1: Into<String>, S2: Into<String>>(
        client_email: S1,
        secret_key: S2,
    ) -> Credentials {
        Credentials {
            client_email: client_email.into(),
            secret_key: secret_key.into(),
        }
    }
}
