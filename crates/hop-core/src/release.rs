//! Release identifiers, planning and lifecycle state.

use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use hop_db::{models::ReleaseStatus, ReleaseKey};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{BRANCH_PREFIX, TAG_PREFIX},
    error::HopError,
    HopResult,
};

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hop_(\d+)\.(\d+)\.(\d+)$").expect("valid release branch regex")
});

/// Identifier of a release: `major.minor.patch` with an optional pre-release
/// marker.
///
/// Ordering is numeric on the triple. For an equal triple a pre-release sorts
/// before the plain release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseId {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<String>,
}

impl ReleaseId {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// The very first release of every repository.
    pub const fn initial() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self
    }

    /// The same release without its pre-release marker.
    pub fn base(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    pub fn branch_name(&self) -> String {
        format!("{}{}", BRANCH_PREFIX, self.base())
    }

    pub fn tag_name(&self) -> String {
        format!("{}{}", TAG_PREFIX, self.base())
    }

    /// Parses a release branch name (`hop_1.3.0`).
    pub fn from_branch(name: &str) -> Option<Self> {
        let caps = BRANCH_RE.captures(name)?;
        Some(Self::new(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        ))
    }

    /// Parses a release tag name (`v1.3.0`). Pre-release tags are not releases.
    pub fn from_tag(name: &str) -> Option<Self> {
        let id: Self = name.strip_prefix(TAG_PREFIX)?.parse().ok()?;
        id.pre.is_none().then_some(id)
    }

    /// Key of the release in the bookkeeping tables.
    pub fn key(&self) -> HopResult<ReleaseKey> {
        let convert =
            |n: u32| i32::try_from(n).map_err(|_| HopError::InvalidReleaseId(self.to_string()));
        Ok((convert(self.major)?, convert(self.minor)?, convert(self.patch)?))
    }

    pub fn from_key(key: ReleaseKey) -> HopResult<Self> {
        let (major, minor, patch) = key;
        let convert = |n: i32| {
            u32::try_from(n)
                .map_err(|_| HopError::InvalidReleaseId(format!("{major}.{minor}.{patch}")))
        };
        Ok(Self::new(convert(major)?, convert(minor)?, convert(patch)?))
    }
}

impl Ord for ReleaseId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| {
                match (&self.pre, &other.pre) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(a), Some(b)) => a.cmp(b),
                }
            })
    }
}

impl PartialOrd for ReleaseId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for ReleaseId {
    type Err = HopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let version = semver::Version::parse(trimmed.strip_prefix(TAG_PREFIX).unwrap_or(trimmed))
            .map_err(|_| HopError::InvalidReleaseId(s.to_string()))?;

        if !version.build.is_empty() {
            return Err(HopError::InvalidReleaseId(s.to_string()));
        }

        let convert =
            |n: u64| u32::try_from(n).map_err(|_| HopError::InvalidReleaseId(s.to_string()));

        Ok(Self {
            major: convert(version.major)?,
            minor: convert(version.minor)?,
            patch: convert(version.patch)?,
            pre: (!version.pre.is_empty()).then(|| version.pre.to_string()),
        })
    }
}

impl TryFrom<String> for ReleaseId {
    type Error = HopError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReleaseId> for String {
    fn from(value: ReleaseId) -> Self {
        value.to_string()
    }
}

/// Semantic bump level for [`plan_next`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BumpLevel {
    #[default]
    Patch,
    Minor,
    Major,
}

impl FromStr for BumpLevel {
    type Err = HopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            _ => Err(HopError::InvalidBumpLevel(s.to_string())),
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        })
    }
}

/// Computes the release following `last`.
///
/// Without a previous release the bump is applied to `0.0.0`.
///
/// # Errors
///
/// * [`HopError::InvalidReleaseId`] if the bumped component would overflow.
pub fn plan_next(level: BumpLevel, last: Option<&ReleaseId>) -> HopResult<ReleaseId> {
    let base = last.map(ReleaseId::base).unwrap_or_else(ReleaseId::initial);
    let bump = |n: u32| {
        n.checked_add(1)
            .ok_or_else(|| HopError::InvalidReleaseId(format!("{level} bump of {base}")))
    };
    Ok(match level {
        BumpLevel::Major => ReleaseId::new(bump(base.major)?, 0, 0),
        BumpLevel::Minor => ReleaseId::new(base.major, bump(base.minor)?, 0),
        BumpLevel::Patch => ReleaseId::new(base.major, base.minor, bump(base.patch)?),
    })
}

/// Lifecycle state of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Preparing,
    Ready,
    Applied,
    Committed,
    Reverted,
    Failed,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Applied => "applied",
            Self::Committed => "committed",
            Self::Reverted => "reverted",
            Self::Failed => "failed",
        })
    }
}

/// Everything the lifecycle state of one release is derived from.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFacts {
    pub tagged: bool,
    pub status: Option<ReleaseStatus>,
    pub applied_patches: usize,
    pub staged_patches: usize,
}

impl ReleaseFacts {
    pub fn state(&self) -> ReleaseState {
        if self.tagged {
            return ReleaseState::Committed;
        }
        match self.status {
            Some(ReleaseStatus::Applied) => ReleaseState::Applied,
            Some(ReleaseStatus::Failed) => ReleaseState::Failed,
            None if self.applied_patches > 0 => ReleaseState::Failed,
            Some(ReleaseStatus::Reverted) => ReleaseState::Reverted,
            None if self.staged_patches > 0 => ReleaseState::Ready,
            None => ReleaseState::Preparing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ReleaseId {
        s.parse().unwrap()
    }

    #[test]
    fn test_plan_next() {
        let last = id("1.2.3");
        assert_eq!(plan_next(BumpLevel::Minor, Some(&last)).unwrap(), id("1.3.0"));
        assert_eq!(plan_next(BumpLevel::Major, Some(&last)).unwrap(), id("2.0.0"));
        assert_eq!(plan_next(BumpLevel::Patch, Some(&last)).unwrap(), id("1.2.4"));
        assert_eq!(plan_next(BumpLevel::Patch, None).unwrap(), id("0.0.1"));
    }

    #[test]
    fn test_plan_next_exceeds_last() {
        let last = id("1.2.3-dev");
        for level in [BumpLevel::Patch, BumpLevel::Minor, BumpLevel::Major] {
            assert!(plan_next(level, Some(&last)).unwrap() > last);
        }
    }

    #[test]
    fn test_plan_next_refuses_overflow() {
        let last = ReleaseId::from_tag("v4294967295.7.4294967295").unwrap();
        for level in [BumpLevel::Major, BumpLevel::Patch] {
            assert!(matches!(
                plan_next(level, Some(&last)),
                Err(HopError::InvalidReleaseId(_))
            ));
        }
        assert_eq!(
            plan_next(BumpLevel::Minor, Some(&last)).unwrap(),
            ReleaseId::new(u32::MAX, 8, 0)
        );
    }

    #[test]
    fn test_bump_level_parse() {
        assert_eq!("MINOR".parse::<BumpLevel>().unwrap(), BumpLevel::Minor);
        assert!(matches!(
            "huge".parse::<BumpLevel>(),
            Err(HopError::InvalidBumpLevel(level)) if level == "huge"
        ));
    }

    #[test]
    fn test_ordering() {
        assert!(id("1.10.0") > id("1.9.9"));
        assert!(id("1.3.0-dev") < id("1.3.0"));
        assert!(id("1.3.0-dev") > id("1.2.9"));
        assert_eq!(id("v1.3.0"), id("1.3.0"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "1.2", "1.2.3.4", "x.y.z", "1.2.3+build"] {
            assert!(input.parse::<ReleaseId>().is_err(), "{input:?}");
        }
    }

    #[test]
    fn test_branch_and_tag_names() {
        let release = id("1.3.0");
        assert_eq!(release.branch_name(), "hop_1.3.0");
        assert_eq!(release.tag_name(), "v1.3.0");
        assert_eq!(ReleaseId::from_branch("hop_1.3.0"), Some(release.clone()));
        assert_eq!(ReleaseId::from_tag("v1.3.0"), Some(release));
        assert_eq!(ReleaseId::from_branch("hop_main"), None);
        assert_eq!(ReleaseId::from_tag("v1.3.0-rc1"), None);
        assert_eq!(ReleaseId::from_tag("release-1"), None);
    }

    #[test]
    fn test_key_round_trip() {
        let release = id("4.5.6");
        assert_eq!(release.key().unwrap(), (4, 5, 6));
        assert_eq!(ReleaseId::from_key((4, 5, 6)).unwrap(), release);
        assert!(ReleaseId::from_key((-1, 0, 0)).is_err());
    }

    #[test]
    fn test_release_state_derivation() {
        let facts = |tagged, status, applied, staged| {
            ReleaseFacts {
                tagged,
                status,
                applied_patches: applied,
                staged_patches: staged,
            }
        };

        assert_eq!(facts(false, None, 0, 0).state(), ReleaseState::Preparing);
        assert_eq!(facts(false, None, 0, 2).state(), ReleaseState::Ready);
        assert_eq!(facts(false, None, 1, 2).state(), ReleaseState::Failed);
        assert_eq!(
            facts(false, Some(ReleaseStatus::Applied), 2, 2).state(),
            ReleaseState::Applied
        );
        assert_eq!(
            facts(false, Some(ReleaseStatus::Failed), 1, 2).state(),
            ReleaseState::Failed
        );
        assert_eq!(
            facts(false, Some(ReleaseStatus::Reverted), 0, 2).state(),
            ReleaseState::Reverted
        );
        assert_eq!(
            facts(true, Some(ReleaseStatus::Applied), 2, 2).state(),
            ReleaseState::Committed
        );
    }
}
