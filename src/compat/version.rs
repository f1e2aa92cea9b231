//! Dotted version ordering for WordPress/PHP style versions
//!
//! WordPress and PHP versions are not strict semver: `6.5`, `7.4.33`,
//! `6.6-RC1` and `1.2.3.4` all occur. The first three components map onto a
//! [`semver::Version`]; extra components form a numeric tail. Missing
//! components count as zero, and a pre-release sorts before its release.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{Prerelease, Version};

/// Parsed package or host version
#[derive(Debug, Clone)]
pub struct PackageVersion {
    core: Version,
    tail: Vec<u64>,
    original: String,
}

/// Version string that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(pub String);

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version \"{}\"", self.0)
    }
}

impl std::error::Error for VersionParseError {}

impl FromStr for PackageVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let original = s.trim();
        let invalid = || VersionParseError(original.to_string());

        let stripped = original.trim_start_matches(['v', 'V']);
        // Build metadata never affects ordering
        let without_build = stripped.split('+').next().unwrap_or_default();
        let (numbers, pre) = match without_build.split_once('-') {
            Some((numbers, pre)) => (numbers, pre),
            None => (without_build, ""),
        };

        let parts = numbers
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(invalid());
        }

        let mut core = Version::new(
            parts[0],
            parts.get(1).copied().unwrap_or(0),
            parts.get(2).copied().unwrap_or(0),
        );
        if !pre.is_empty() {
            core.pre = Prerelease::new(&pre.to_ascii_lowercase()).map_err(|_| invalid())?;
        }

        let mut tail = parts.get(3..).map(<[u64]>::to_vec).unwrap_or_default();
        while tail.last() == Some(&0) {
            tail.pop();
        }

        Ok(Self {
            core,
            tail,
            original: original.to_string(),
        })
    }
}

impl PackageVersion {
    /// Parse, returning `None` for empty or malformed input
    pub fn parse(input: &str) -> Option<Self> {
        if input.trim().is_empty() {
            return None;
        }
        input.parse().ok()
    }

    /// The string this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = &self.core;
        let b = &other.core;
        (a.major, a.minor, a.patch)
            .cmp(&(b.major, b.minor, b.patch))
            .then_with(|| {
                let len = self.tail.len().max(other.tail.len());
                (0..len)
                    .map(|i| {
                        let x = self.tail.get(i).copied().unwrap_or(0);
                        let y = other.tail.get(i).copied().unwrap_or(0);
                        x.cmp(&y)
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

/// Compare two version strings; `None` when either does not parse.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(PackageVersion::parse(a)?.cmp(&PackageVersion::parse(b)?))
}

/// `installed < available`, false when either does not parse.
pub fn is_newer(available: &str, installed: &str) -> bool {
    compare_versions(installed, available) == Some(Ordering::Less)
}
