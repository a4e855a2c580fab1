//! Package identity: the unit of installation.

use std::fmt;

use semver::Version;

/// A package name paired with one resolved version.
///
/// Equality is exact on both fields; this is the key of the install ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    package_id: String,
    version: Version,
}

impl PackageIdentity {
    pub fn new(package_id: impl Into<String>, version: Version) -> Self {
        Self {
            package_id: package_id.into(),
            version,
        }
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package_id, self.version)
    }
}
