//! Value types for package requests, identities, and version constraints.

mod identity;
mod range;
mod request;

pub use identity::PackageIdentity;
pub use range::{VersionRange, parse_version};
pub use request::{PackageRequest, PackageRequestBuilder, RequestError};
