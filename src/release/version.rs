//! Version comparison for release gating and dependency staleness
//!
//! Two flavours of version live here:
//! - release versions: exactly `MAJOR.MINOR.PATCH`, all numeric, no prefix
//! - tag versions: whatever a tag carries (`v1.2`, `kdreports-2.3.0`,
//!   `v3.0.0-rc1`), normalized to semver before ordering

use crate::core::error::{RelError, RelResult, VersionError};
use semver::Version;

/// True iff `s` is exactly three dot-separated non-negative integers
pub fn is_well_formed_version(s: &str) -> bool {
  parse_triplet(s).is_some()
}

fn parse_triplet(s: &str) -> Option<(u64, u64, u64)> {
  let mut parts = s.split('.');
  let major = parts.next()?.trim().parse().ok()?;
  let minor = parts.next()?.trim().parse().ok()?;
  let patch = parts.next()?.trim().parse().ok()?;
  if parts.next().is_some() {
    return None;
  }
  Some((major, minor, patch))
}

/// The release that must already exist before `version` may be tagged.
///
/// ```text
/// 2.1.1 -> 2.1.0
/// 2.1.0 -> 2.0.0
/// 2.0.0 -> 1.0.0
/// 0.0.0 -> error
/// ```
pub fn previous_version(version: &str) -> RelResult<String> {
  let (major, minor, patch) = parse_triplet(version).ok_or_else(|| {
    RelError::Version(VersionError::Malformed {
      version: version.to_string(),
    })
  })?;

  let (major, minor, patch) = if patch > 0 {
    (major, minor, patch - 1)
  } else if minor > 0 {
    (major, minor - 1, 0)
  } else if major > 0 {
    (major - 1, 0, 0)
  } else {
    return Err(RelError::Version(VersionError::Underflow));
  };

  Ok(format!("{}.{}.{}", major, minor, patch))
}

/// Parse a tag-ish string as semver.
///
/// Anything before the first digit is treated as a tag prefix and dropped;
/// one- and two-component cores are padded with zeros (`1.4` -> `1.4.0`).
/// Pre-release and build metadata are kept.
pub fn normalize(raw: &str) -> RelResult<Version> {
  let unparseable = |reason: &str| {
    RelError::Version(VersionError::Unparseable {
      version: raw.to_string(),
      reason: reason.to_string(),
    })
  };

  let trimmed = raw.trim();
  let start = trimmed
    .find(|c: char| c.is_ascii_digit())
    .ok_or_else(|| unparseable("no numeric component"))?;
  let candidate = &trimmed[start..];

  let core_end = candidate.find(['-', '+']).unwrap_or(candidate.len());
  let (core, suffix) = candidate.split_at(core_end);
  let padded = match core.split('.').count() {
    1 => format!("{}.0.0{}", core, suffix),
    2 => format!("{}.0{}", core, suffix),
    _ => candidate.to_string(),
  };

  Version::parse(&padded).map_err(|e| unparseable(&e.to_string()))
}

/// Whether `latest` is strictly newer than `in_use`.
///
/// Errors with `VersionOrderInverted` when `in_use` is ahead of `latest`.
pub fn has_newer_version(in_use: &str, latest: &str) -> RelResult<bool> {
  let current = normalize(in_use)?;
  let newest = normalize(latest)?;

  match current.cmp(&newest) {
    std::cmp::Ordering::Less => Ok(true),
    std::cmp::Ordering::Equal => Ok(false),
    std::cmp::Ordering::Greater => Err(RelError::Version(VersionError::OrderInverted {
      in_use: in_use.to_string(),
      latest: latest.to_string(),
    })),
  }
}
