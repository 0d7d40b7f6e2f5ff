//! Hash algorithm names and the manifest naming convention.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::HashError;

/// Names that are recognised but cannot be computed by this build.
const KNOWN_UNAVAILABLE: &[&str] = &["MD4", "SHA224", "SHA256", "SHA384", "MD5SHA1", "RIPEMD160"];

/// A checksum algorithm.
///
/// Parsing never fails; names outside the supported set become
/// [`HashAlgorithm::Unsupported`] and are rejected when used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-512 (512-bit)
    Sha512,
    /// Any other name, normalised to upper case
    Unsupported(String),
}

impl HashAlgorithm {
    /// Parse a name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "MD5" => Self::Md5,
            "SHA1" => Self::Sha1,
            "SHA512" => Self::Sha512,
            _ => Self::Unsupported(upper),
        }
    }

    /// Canonical upper-case name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha512 => "SHA512",
            Self::Unsupported(name) => name,
        }
    }

    /// Check whether digests can be computed for this algorithm.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Order in which manifests are looked for when no algorithm is given.
    #[must_use]
    pub fn preferred_order() -> [HashAlgorithm; 3] {
        [Self::Sha512, Self::Sha1, Self::Md5]
    }

    /// Algorithm used by `generate` when none is given.
    #[must_use]
    pub fn default_for_generate() -> Self {
        Self::Sha1
    }

    /// Reject unsupported algorithms.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Unavailable`] for a recognised name this build
    /// cannot compute and [`HashError::UnknownAlgorithm`] for anything else.
    pub fn ensure_supported(&self) -> Result<(), HashError> {
        match self {
            Self::Unsupported(name) if KNOWN_UNAVAILABLE.contains(&name.as_str()) => {
                Err(HashError::Unavailable(name.clone()))
            }
            Self::Unsupported(name) => Err(HashError::UnknownAlgorithm(name.clone())),
            _ => Ok(()),
        }
    }

    /// Manifest filename for this algorithm, e.g. `SHA1SUMS`.
    ///
    /// # Errors
    ///
    /// Fails like [`HashAlgorithm::ensure_supported`].
    pub fn manifest_filename(&self) -> Result<String, HashError> {
        self.ensure_supported()?;
        Ok(format!("{}SUMS", self.name()))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for HashAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
