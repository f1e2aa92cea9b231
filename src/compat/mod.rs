//! Compatibility evaluation
//!
//! Compares a package's declared requirements against the running host.
//! Rules are checked in order and the first match wins:
//!
//! 1. host older than `Requires at least` → incompatible
//! 2. runtime older than `Requires PHP` → incompatible
//! 3. host newer than `Tested up to` → compatible, with a warning
//! 4. otherwise compatible
//!
//! A requirement that does not parse as a version is skipped.

pub mod version;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::HostEnvironment;
use crate::metadata::PackageHeaders;
use crate::package::PackageKind;

pub use version::{PackageVersion, compare_versions, is_newer};

/// Result of a compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityVerdict {
    pub is_compatible: bool,

    /// Human-readable explanation; empty when fully compatible
    pub reason: String,

    /// Headers the verdict was computed from
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CompatibilityVerdict {
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            reason: String::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self {
            is_compatible: false,
            reason: reason.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Verdict for a repository without a usable readme or style.css
    pub fn no_valid_metadata(kind: PackageKind) -> Self {
        Self::incompatible(no_valid_metadata_reason(kind))
    }

    pub fn with_headers(mut self, headers: &PackageHeaders) -> Self {
        self.headers = headers.to_map();
        self
    }

    /// True when compatible but carrying a warning
    pub fn has_warning(&self) -> bool {
        self.is_compatible && !self.reason.is_empty()
    }
}

/// Reason text for a package without parsable metadata
pub fn no_valid_metadata_reason(kind: PackageKind) -> &'static str {
    match kind {
        PackageKind::Plugin => "No valid readme file found.",
        PackageKind::Theme => "No valid theme style.css file found.",
    }
}

/// `host` compared against a requirement, `None` when either side does not parse
fn host_vs(host: &str, requirement: &str) -> Option<Ordering> {
    if requirement.trim().is_empty() {
        return None;
    }
    let ordering = compare_versions(host, requirement);
    if ordering.is_none() {
        log::debug!(
            "Skipping unparseable version comparison: {:?} vs {:?}",
            host,
            requirement
        );
    }
    ordering
}

/// Evaluate headers against the host. Pure; does no I/O.
pub fn evaluate(
    headers: &PackageHeaders,
    env: &HostEnvironment,
    kind: PackageKind,
) -> CompatibilityVerdict {
    let verdict = if host_vs(&env.host_version, &headers.requires_at_least)
        == Some(Ordering::Less)
    {
        CompatibilityVerdict::incompatible(format!(
            "This {} requires WordPress version {} or higher.",
            kind, headers.requires_at_least
        ))
    } else if host_vs(&env.runtime_version, &headers.requires_php) == Some(Ordering::Less) {
        CompatibilityVerdict::incompatible(format!(
            "This {} requires PHP version {} or higher.",
            kind, headers.requires_php
        ))
    } else if host_vs(&env.host_version, &headers.tested_up_to) == Some(Ordering::Greater) {
        CompatibilityVerdict {
            is_compatible: true,
            reason: format!(
                "This {} has not been tested with your WordPress version.",
                kind
            ),
            headers: BTreeMap::new(),
        }
    } else {
        CompatibilityVerdict::compatible()
    };

    verdict.with_headers(headers)
}

/// Evaluate, first requiring a declared release version.
///
/// Plugins must declare `Stable tag` (mirrored into `version`); themes must
/// declare `Version`.
pub fn check_headers(
    headers: &PackageHeaders,
    env: &HostEnvironment,
    kind: PackageKind,
) -> CompatibilityVerdict {
    let mut headers = headers.clone();
    match kind {
        PackageKind::Plugin => {
            if headers.stable_tag.is_empty() {
                return CompatibilityVerdict::no_valid_metadata(kind);
            }
            headers.version = headers.stable_tag.clone();
        }
        PackageKind::Theme => {
            if headers.version.is_empty() {
                return CompatibilityVerdict::no_valid_metadata(kind);
            }
        }
    }
    evaluate(&headers, env, kind)
}
