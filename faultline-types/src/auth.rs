use std::fmt;
use std::str::FromStr;

use crate::protocol;

/// Represents an auth header parsing error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseAuthError {
    /// Raised if the auth header is not a faultline auth header.
    #[error("non faultline auth")]
    NonFaultlineAuth,
    /// Raised if the timestamp value is invalid.
    #[error("invalid value for timestamp")]
    InvalidTimestamp,
    /// Raised if the version value is invalid.
    #[error("invalid value for version")]
    InvalidVersion,
    /// Raised if the version is missing entirely.
    #[error("no valid version defined")]
    MissingVersion,
    /// Raised if the public key is missing entirely.
    #[error("missing public key in auth header")]
    MissingPublicKey,
}

/// Represents the contents of the `X-Faultline-Auth` header.
#[derive(Clone, Default, Debug)]
pub struct Auth {
    timestamp: Option<f64>,
    client: Option<String>,
    version: u16,
    key: String,
    secret: Option<String>,
}

impl Auth {
    /// Creates an auth header from a public key and client agent.
    pub fn from_key<K, C>(key: K, client: Option<C>) -> Auth
    where
        K: Into<String>,
        C: Into<String>,
    {
        Auth {
            timestamp: None,
            client: client.map(Into::into),
            version: protocol::LATEST,
            key: key.into(),
            secret: None,
        }
    }

    /// Returns the unix timestamp the client defined.
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Returns the protocol version the client speaks.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &str {
        &self.key
    }

    /// Returns the client's secret if it authenticated with a secret.
    pub fn secret_key(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Returns true if the authentication implies public auth (no secret).
    pub fn is_public(&self) -> bool {
        self.secret.is_none()
    }

    /// Returns the client agent string, if any.
    pub fn client_agent(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub(crate) fn set_secret(&mut self, secret: Option<String>) {
        self.secret = secret;
    }
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Faultline faultline_key={}, faultline_version={}",
            self.key, self.version
        )?;
        if let Some(ts) = self.timestamp {
            write!(f, ", faultline_timestamp={ts}")?;
        }
        if let Some(ref client) = self.client {
            write!(f, ", faultline_client={client}")?;
        }
        if let Some(ref secret) = self.secret {
            write!(f, ", faultline_secret={secret}")?;
        }
        Ok(())
    }
}

impl FromStr for Auth {
    type Err = ParseAuthError;

    fn from_str(s: &str) -> Result<Auth, ParseAuthError> {
        let mut rv = Auth::default();
        let mut base_iter = s.splitn(2, ' ');
        if !base_iter
            .next()
            .unwrap_or("")
            .eq_ignore_ascii_case("faultline")
        {
            return Err(ParseAuthError::NonFaultlineAuth);
        }
        for item in base_iter.next().unwrap_or("").split(',') {
            let mut kviter = item.trim().split('=');
            let key = kviter.next().unwrap_or("");
            let key = key.strip_prefix("faultline_").unwrap_or(key);
            let value = kviter.next().unwrap_or("");
            match key {
                "timestamp" => {
                    rv.timestamp =
                        Some(value.parse().map_err(|_| ParseAuthError::InvalidTimestamp)?)
                }
                "client" => rv.client = Some(value.into()),
                "version" => {
                    rv.version = value.parse().map_err(|_| ParseAuthError::InvalidVersion)?
                }
                "key" => rv.key = value.into(),
                "secret" => rv.secret = Some(value.into()),
                _ => {}
            }
        }

        if rv.key.is_empty() {
            return Err(ParseAuthError::MissingPublicKey);
        }
        if rv.version == 0 {
            return Err(ParseAuthError::MissingVersion);
        }

        Ok(rv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_roundtrip() {
        let auth = Auth::from_key("public-key", Some("faultline-rust/0.1.0"));
        let header = auth.to_string();
        assert_eq!(
            header,
            "Faultline faultline_key=public-key, faultline_version=1, \
             faultline_client=faultline-rust/0.1.0"
        );

        let parsed: Auth = header.parse().unwrap();
        assert_eq!(parsed.public_key(), "public-key");
        assert_eq!(parsed.version(), 1);
        assert_eq!(parsed.client_agent(), Some("faultline-rust/0.1.0"));
        assert!(parsed.is_public());
    }

    #[test]
    fn test_rejects_foreign_auth() {
        assert_eq!(
            "Basic dXNlcjpwYXNz".parse::<Auth>().unwrap_err(),
            ParseAuthError::NonFaultlineAuth
        );
    }
}
