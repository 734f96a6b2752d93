use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Parses a version, accepting one to three numeric components (`1.0` is `1.0.0`).
pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(anyhow!("version must not be empty"));
    }

    let split_at = trimmed
        .find(|ch: char| ch == '-' || ch == '+')
        .unwrap_or(trimmed.len());
    let (numeric, suffix) = trimmed.split_at(split_at);
    let parts = numeric.split('.').collect::<Vec<_>>();
    if parts.len() > 3 || parts.iter().any(|part| part.is_empty()) {
        return Err(anyhow!("invalid version '{input}'"));
    }

    let mut normalized = parts.join(".");
    for _ in parts.len()..3 {
        normalized.push_str(".0");
    }
    normalized.push_str(suffix);
    Version::parse(&normalized).with_context(|| format!("invalid version '{input}'"))
}

pub mod serde_version {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(version)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_version(&raw).map_err(serde::de::Error::custom)
    }
}

/// A contiguous range of versions.
///
/// Accepts interval notation (`[1.0,2.0)`, `[1.2.3]`), comparator lists
/// (`>=1.0, <2.0`), a bare version meaning "this version or newer", and `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSet {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl VersionSet {
    pub const ANY: VersionSet = VersionSet {
        lower: Bound::Unbounded,
        upper: Bound::Unbounded,
    };

    pub fn any() -> Self {
        Self::ANY
    }

    pub fn exact(version: &Version) -> Self {
        Self {
            lower: Bound::Included(version.clone()),
            upper: Bound::Included(version.clone()),
        }
    }

    pub fn at_least(version: &Version) -> Self {
        Self {
            lower: Bound::Included(version.clone()),
            upper: Bound::Unbounded,
        }
    }

    pub fn from_bounds(lower: Bound<Version>, upper: Bound<Version>) -> Option<Self> {
        bounds_admit_versions(&lower, &upper).then_some(Self { lower, upper })
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        match trimmed.chars().next() {
            Some('[' | '(') => parse_interval(trimmed),
            Some('>' | '<' | '=') => parse_comparators(trimmed),
            _ => Ok(Self::at_least(&parse_version(trimmed)?)),
        }
    }

    pub fn lower(&self) -> &Bound<Version> {
        &self.lower
    }

    pub fn upper(&self) -> &Bound<Version> {
        &self.upper
    }

    pub fn is_any(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        )
    }

    pub fn exact_version(&self) -> Option<&Version> {
        match (&self.lower, &self.upper) {
            (Bound::Included(lower), Bound::Included(upper)) if lower == upper => Some(lower),
            _ => None,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above = match &self.lower {
            Bound::Included(lower) => version >= lower,
            Bound::Excluded(lower) => version > lower,
            Bound::Unbounded => true,
        };
        let below = match &self.upper {
            Bound::Included(upper) => version <= upper,
            Bound::Excluded(upper) => version < upper,
            Bound::Unbounded => true,
        };
        above && below
    }

    pub fn intersect(&self, other: &VersionSet) -> Option<VersionSet> {
        Self::from_bounds(
            tighter_lower(&self.lower, &other.lower),
            tighter_upper(&self.upper, &other.upper),
        )
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("*");
        }
        if let Some(version) = self.exact_version() {
            return write!(f, "[{version}]");
        }

        match &self.lower {
            Bound::Included(version) => write!(f, "[{version}, ")?,
            Bound::Excluded(version) => write!(f, "({version}, ")?,
            Bound::Unbounded => f.write_str("(, ")?,
        }
        match &self.upper {
            Bound::Included(version) => write!(f, "{version}]"),
            Bound::Excluded(version) => write!(f, "{version})"),
            Bound::Unbounded => f.write_str(")"),
        }
    }
}

impl FromStr for VersionSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionSet {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionSet> for String {
    fn from(value: VersionSet) -> Self {
        value.to_string()
    }
}

fn parse_interval(input: &str) -> Result<VersionSet> {
    let lower_inclusive = input.starts_with('[');
    let upper_inclusive = match input.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err(anyhow!("version range '{input}' is missing a closing bracket")),
    };
    if input.len() < 2 {
        return Err(anyhow!("invalid version range '{input}'"));
    }
    let inner = &input[1..input.len() - 1];

    let Some((raw_lower, raw_upper)) = inner.split_once(',') else {
        if !(lower_inclusive && upper_inclusive) {
            return Err(anyhow!(
                "exact version range must use inclusive brackets: '{input}'"
            ));
        }
        return Ok(VersionSet::exact(&parse_version(inner)?));
    };

    let lower = interval_bound(raw_lower, lower_inclusive)?;
    let upper = interval_bound(raw_upper, upper_inclusive)?;
    VersionSet::from_bounds(lower, upper)
        .ok_or_else(|| anyhow!("version range '{input}' admits no versions"))
}

fn interval_bound(raw: &str, inclusive: bool) -> Result<Bound<Version>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Bound::Unbounded);
    }
    let version = parse_version(raw)?;
    Ok(if inclusive {
        Bound::Included(version)
    } else {
        Bound::Excluded(version)
    })
}

fn parse_comparators(input: &str) -> Result<VersionSet> {
    let mut set = VersionSet::any();
    for comparator in input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
    {
        let next = if let Some(rest) = comparator.strip_prefix(">=") {
            VersionSet::at_least(&parse_version(rest)?)
        } else if let Some(rest) = comparator.strip_prefix("<=") {
            VersionSet {
                lower: Bound::Unbounded,
                upper: Bound::Included(parse_version(rest)?),
            }
        } else if let Some(rest) = comparator.strip_prefix('>') {
            VersionSet {
                lower: Bound::Excluded(parse_version(rest)?),
                upper: Bound::Unbounded,
            }
        } else if let Some(rest) = comparator.strip_prefix('<') {
            VersionSet {
                lower: Bound::Unbounded,
                upper: Bound::Excluded(parse_version(rest)?),
            }
        } else if let Some(rest) = comparator.strip_prefix('=') {
            VersionSet::exact(&parse_version(rest)?)
        } else {
            return Err(anyhow!(
                "invalid comparator '{comparator}' in version range '{input}'"
            ));
        };

        set = set
            .intersect(&next)
            .ok_or_else(|| anyhow!("version range '{input}' admits no versions"))?;
    }
    Ok(set)
}

fn tighter_lower(left: &Bound<Version>, right: &Bound<Version>) -> Bound<Version> {
    match (left, right) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other.clone(),
        (Bound::Included(a), Bound::Included(b)) => Bound::Included(a.max(b).clone()),
        (Bound::Excluded(a), Bound::Excluded(b)) => Bound::Excluded(a.max(b).clone()),
        (Bound::Included(inc), Bound::Excluded(exc))
        | (Bound::Excluded(exc), Bound::Included(inc)) => {
            if inc > exc {
                Bound::Included(inc.clone())
            } else {
                Bound::Excluded(exc.clone())
            }
        }
    }
}

fn tighter_upper(left: &Bound<Version>, right: &Bound<Version>) -> Bound<Version> {
    match (left, right) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other.clone(),
        (Bound::Included(a), Bound::Included(b)) => Bound::Included(a.min(b).clone()),
        (Bound::Excluded(a), Bound::Excluded(b)) => Bound::Excluded(a.min(b).clone()),
        (Bound::Included(inc), Bound::Excluded(exc))
        | (Bound::Excluded(exc), Bound::Included(inc)) => {
            if inc < exc {
                Bound::Included(inc.clone())
            } else {
                Bound::Excluded(exc.clone())
            }
        }
    }
}

fn bounds_admit_versions(lower: &Bound<Version>, upper: &Bound<Version>) -> bool {
    match (lower, upper) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Included(low), Bound::Included(high)) => low <= high,
        (Bound::Included(low), Bound::Excluded(high))
        | (Bound::Excluded(low), Bound::Included(high))
        | (Bound::Excluded(low), Bound::Excluded(high)) => low < high,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSelectMethod {
    /// Keep the installed version when it fits, otherwise the newest stable fit.
    #[default]
    Suit,
    /// Installed packages keep their versions and requested versions are exact.
    Strict,
    /// Newest fit, ignoring what is installed.
    Latest,
}

impl VersionSelectMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Suit => "suit",
            Self::Strict => "strict",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for VersionSelectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionSelectMethod {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suit" => Ok(Self::Suit),
            "strict" => Ok(Self::Strict),
            "latest" => Ok(Self::Latest),
            other => Err(anyhow!("invalid version select method: {other}")),
        }
    }
}

pub fn preference_order(
    mut candidates: Vec<Version>,
    installed: Option<&Version>,
    method: VersionSelectMethod,
) -> Vec<Version> {
    candidates.sort_by(|a, b| b.cmp(a));
    candidates.dedup();

    match method {
        VersionSelectMethod::Latest => candidates,
        VersionSelectMethod::Suit | VersionSelectMethod::Strict => {
            let (mut ordered, rest): (Vec<_>, Vec<_>) = candidates
                .into_iter()
                .partition(|version| installed == Some(version));
            let (stable, prerelease): (Vec<_>, Vec<_>) =
                rest.into_iter().partition(|version| version.pre.is_empty());
            ordered.extend(stable);
            ordered.extend(prerelease);
            ordered
        }
    }
}
