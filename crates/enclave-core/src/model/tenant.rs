use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 128;

/// Identifier of an isolated index namespace.
///
/// A tenant id doubles as the backend index name and as a URL path segment,
/// so it is restricted to the backend's index-name alphabet: lowercase ASCII
/// letters, digits and single dashes, starting with a letter or digit and
/// not ending in a dash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validate and wrap a tenant identifier.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTenantId`] when `id` is not a valid index name.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate(&id).map_err(|reason| Error::InvalidTenantId {
            id: id.clone(),
            reason,
        })?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(id: &str) -> std::result::Result<(), &'static str> {
    if id.len() < MIN_LEN || id.len() > MAX_LEN {
        return Err("length must be between 2 and 128 characters");
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err("only lowercase letters, digits and dashes are allowed");
    }
    if id.starts_with('-') || id.ends_with('-') {
        return Err("must not start or end with a dash");
    }
    if id.contains("--") {
        return Err("must not contain consecutive dashes");
    }
    Ok(())
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}
