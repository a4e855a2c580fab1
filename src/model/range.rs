//! Version range constraints in interval notation.
//!
//! A range is written either as a bare version, meaning "this version or
//! newer" (`1.2` accepts 1.2.0, 1.9.3, 2.0.0, ...), or as an interval with
//! bracket notation for bound inclusivity:
//!
//! - `[1.0,2.0)` — at least 1.0.0, below 2.0.0
//! - `(,2.0]`    — up to and including 2.0.0
//! - `[1.2.3]`   — exactly 1.2.3

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use semver::Version;

/// Parse a version string leniently.
///
/// Strips a leading `v`/`V` and pads missing components (`1` and `1.0` both
/// parse as 1.0.0, prerelease and build suffixes preserved). Returns None for
/// strings that still do not parse as a version.
pub fn parse_version(input: &str) -> Option<Version> {
    let s = input.trim();
    let s = s
        .strip_prefix('v')
        .or_else(|| s.strip_prefix('V'))
        .unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    // Pad partial versions like "1" or "1.0", keeping any -pre/+build suffix.
    let (core, suffix) = match s.find(['-', '+']) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    };
    let dots = core.bytes().filter(|b| *b == b'.').count();
    if dots >= 2 {
        return None;
    }
    let padded = format!("{}{}{}", core, ".0".repeat(2 - dots), suffix);
    Version::parse(&padded).ok()
}

/// One end of a version interval.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Inclusive(Version),
    Exclusive(Version),
    Unbounded,
}

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Bound,
    upper: Bound,
    /// True when parsed from a bare version (affects Display only).
    floating: bool,
}

impl VersionRange {
    /// A range accepting `version` or anything newer.
    pub fn at_least(version: Version) -> Self {
        Self {
            lower: Bound::Inclusive(version),
            upper: Bound::Unbounded,
            floating: true,
        }
    }

    /// A range accepting exactly `version`.
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Bound::Inclusive(version.clone()),
            upper: Bound::Inclusive(version),
            floating: false,
        }
    }

    /// Whether `version` satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Inclusive(v) => version >= v,
            Bound::Exclusive(v) => version > v,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Inclusive(v) => version <= v,
            Bound::Exclusive(v) => version < v,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.floating {
            if let Bound::Inclusive(v) = &self.lower {
                return write!(f, "{}", v);
            }
        }
        if let (Bound::Inclusive(lo), Bound::Inclusive(hi)) = (&self.lower, &self.upper) {
            if lo == hi {
                return write!(f, "[{}]", lo);
            }
        }
        match &self.lower {
            Bound::Inclusive(v) => write!(f, "[{}", v)?,
            Bound::Exclusive(v) => write!(f, "({}", v)?,
            Bound::Unbounded => write!(f, "(")?,
        }
        write!(f, ",")?;
        match &self.upper {
            Bound::Inclusive(v) => write!(f, "{}]", v),
            Bound::Exclusive(v) => write!(f, "{})", v),
            Bound::Unbounded => write!(f, ")"),
        }
    }
}

impl FromStr for VersionRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Empty version range");
        }

        let lower_inclusive = match s.as_bytes()[0] {
            b'[' => true,
            b'(' => false,
            // No bracket: a bare version, meaning "at least this version".
            _ => {
                let version = parse_version(s)
                    .ok_or_else(|| anyhow::anyhow!("Invalid version in range: {:?}", s))?;
                return Ok(VersionRange::at_least(version));
            }
        };

        let upper_inclusive = match s.as_bytes()[s.len() - 1] {
            b']' => true,
            b')' => false,
            _ => anyhow::bail!("Unterminated version range: {:?}", s),
        };

        let inner = &s[1..s.len() - 1];
        match inner.split(',').collect::<Vec<_>>().as_slice() {
            [single] => {
                // Exact pin: only "[version]" is valid.
                if !(lower_inclusive && upper_inclusive) {
                    anyhow::bail!("Exact version range must use square brackets: {:?}", s);
                }
                let version = parse_version(single)
                    .ok_or_else(|| anyhow::anyhow!("Invalid version in range: {:?}", s))?;
                Ok(VersionRange::exact(version))
            }
            [low, high] => {
                let lower = match low.trim() {
                    "" => Bound::Unbounded,
                    v => {
                        let version = parse_version(v)
                            .ok_or_else(|| anyhow::anyhow!("Invalid version in range: {:?}", s))?;
                        if lower_inclusive {
                            Bound::Inclusive(version)
                        } else {
                            Bound::Exclusive(version)
                        }
                    }
                };
                let upper = match high.trim() {
                    "" => Bound::Unbounded,
                    v => {
                        let version = parse_version(v)
                            .ok_or_else(|| anyhow::anyhow!("Invalid version in range: {:?}", s))?;
                        if upper_inclusive {
                            Bound::Inclusive(version)
                        } else {
                            Bound::Exclusive(version)
                        }
                    }
                };

                if let (
                    Bound::Inclusive(lo) | Bound::Exclusive(lo),
                    Bound::Inclusive(hi) | Bound::Exclusive(hi),
                ) = (&lower, &upper)
                {
                    let strict =
                        matches!(lower, Bound::Exclusive(_)) || matches!(upper, Bound::Exclusive(_));
                    if lo > hi || (strict && lo == hi) {
                        anyhow::bail!("Empty version range: {:?}", s);
                    }
                }

                Ok(VersionRange {
                    lower,
                    upper,
                    floating: false,
                })
            }
            _ => anyhow::bail!("Invalid version range: {:?}", s),
        }
    }
}
