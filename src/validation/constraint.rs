//! Semantic versions and pub-style version constraints.
//!
//! Supported constraint forms: `any`, `1.2.3`, `^1.2.3`, and space separated
//! comparisons such as `>=1.0.0 <2.0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("empty version constraint")]
    Empty,

    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    #[error("unexpected token '{0}' in constraint")]
    UnexpectedToken(String),

    #[error("constraint has more than one {0} bound")]
    DuplicateBound(&'static str),

    #[error("constraint '{0}' can never be satisfied")]
    Unsatisfiable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    /// Exclusive upper bound implied by `^self`
    pub fn next_breaking(&self) -> Version {
        if self.major > 0 {
            Version::new(self.major + 1, 0, 0)
        } else {
            Version::new(0, self.minor + 1, 0)
        }
    }
}

fn valid_identifiers(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

impl FromStr for Version {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConstraintError::InvalidVersion(s.to_string());

        let (rest, build) = match s.split_once('+') {
            Some((r, b)) => (r, Some(b)),
            None => (s, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((c, p)) => (c, Some(p)),
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        if pre.is_some_and(|p| !valid_identifiers(p)) || build.is_some_and(|b| !valid_identifiers(b)) {
            return Err(invalid());
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre: pre.map(str::to_string),
            build: build.map(str::to_string),
        })
    }
}

fn compare_pre(a: &str, b: &str) -> Ordering {
    for (x, y) in a.split('.').zip(b.split('.')) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.split('.').count().cmp(&b.split('.').count())
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_pre(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Any,
    Exact(Version),
    Caret(Version),
    Range { min: Option<Bound>, max: Option<Bound> },
}

impl VersionConstraint {
    /// No upper bound: any future major release is accepted
    pub fn is_open_ended(&self) -> bool {
        matches!(self, VersionConstraint::Any | VersionConstraint::Range { max: None, .. })
    }

    /// Whether some version strictly below `version` satisfies the constraint
    pub fn allows_below(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) | VersionConstraint::Caret(v) => v < version,
            VersionConstraint::Range { min: None, .. } => true,
            VersionConstraint::Range { min: Some(b), .. } => &b.version < version,
        }
    }

    pub fn allows(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => v == version,
            VersionConstraint::Caret(v) => version >= v && *version < v.next_breaking(),
            VersionConstraint::Range { min, max } => {
                let above = min.as_ref().is_none_or(|b| {
                    if b.inclusive { version >= &b.version } else { version > &b.version }
                });
                let below = max.as_ref().is_none_or(|b| {
                    if b.inclusive { version <= &b.version } else { version < &b.version }
                });
                above && below
            }
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConstraintError::Empty);
        }
        if s == "any" {
            return Ok(VersionConstraint::Any);
        }
        if let Some(v) = s.strip_prefix('^') {
            return Ok(VersionConstraint::Caret(v.trim().parse()?));
        }
        if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            if s.contains(char::is_whitespace) {
                return Err(ConstraintError::UnexpectedToken(s.to_string()));
            }
            return Ok(VersionConstraint::Exact(s.parse()?));
        }

        let mut min: Option<Bound> = None;
        let mut max: Option<Bound> = None;
        for token in s.split_whitespace() {
            let (op, rest) = if let Some(r) = token.strip_prefix(">=") {
                (">=", r)
            } else if let Some(r) = token.strip_prefix("<=") {
                ("<=", r)
            } else if let Some(r) = token.strip_prefix('>') {
                (">", r)
            } else if let Some(r) = token.strip_prefix('<') {
                ("<", r)
            } else {
                return Err(ConstraintError::UnexpectedToken(token.to_string()));
            };
            let bound = Bound {
                version: rest.parse()?,
                inclusive: op.ends_with('='),
            };
            let slot = if op.starts_with('>') { &mut min } else { &mut max };
            if slot.is_some() {
                return Err(ConstraintError::DuplicateBound(if op.starts_with('>') { "lower" } else { "upper" }));
            }
            *slot = Some(bound);
        }

        if let (Some(lo), Some(hi)) = (&min, &max) {
            let empty = match lo.version.cmp(&hi.version) {
                Ordering::Greater => true,
                Ordering::Equal => !(lo.inclusive && hi.inclusive),
                Ordering::Less => false,
            };
            if empty {
                return Err(ConstraintError::Unsatisfiable(s.to_string()));
            }
        }

        Ok(VersionConstraint::Range { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_version() {
        let version = v("1.2.3-beta.1+build.7");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert_eq!(version.pre.as_deref(), Some("beta.1"));
        assert_eq!(version.build.as_deref(), Some("build.7"));
        assert_eq!(version.to_string(), "1.2.3-beta.1+build.7");
    }

    #[test]
    fn test_parse_version_rejects_malformed() {
        for bad in ["1.2", "1.2.3.4", "a.b.c", "1..3", "1.2.3-", "1.2.3+", "01.x.2", ""] {
            assert!(bad.parse::<Version>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha.2") < v("1.0.0-alpha.10"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert_eq!(v("1.0.0+a").cmp(&v("1.0.0+b")), Ordering::Equal);
    }

    #[test]
    fn test_next_breaking() {
        assert_eq!(v("1.4.2").next_breaking(), v("2.0.0"));
        assert_eq!(v("0.4.2").next_breaking(), v("0.5.0"));
    }

    #[test]
    fn test_parse_constraints() {
        assert_eq!("any".parse::<VersionConstraint>().unwrap(), VersionConstraint::Any);
        assert_eq!("^1.2.0".parse::<VersionConstraint>().unwrap(), VersionConstraint::Caret(v("1.2.0")));
        assert_eq!("1.2.0".parse::<VersionConstraint>().unwrap(), VersionConstraint::Exact(v("1.2.0")));

        let range: VersionConstraint = ">=1.0.0 <2.0.0".parse().unwrap();
        assert!(!range.is_open_ended());
        assert!(range.allows(&v("1.5.0")));
        assert!(!range.allows(&v("2.0.0")));

        let open: VersionConstraint = ">=1.0.0".parse().unwrap();
        assert!(open.is_open_ended());
    }

    #[test]
    fn test_parse_constraint_errors() {
        assert_eq!("".parse::<VersionConstraint>().unwrap_err(), ConstraintError::Empty);
        assert!(matches!(
            "~1.0.0".parse::<VersionConstraint>().unwrap_err(),
            ConstraintError::UnexpectedToken(_)
        ));
        assert!(matches!(
            ">=1.0.0 >=1.1.0".parse::<VersionConstraint>().unwrap_err(),
            ConstraintError::DuplicateBound("lower")
        ));
        assert!(matches!(
            ">=2.0.0 <1.0.0".parse::<VersionConstraint>().unwrap_err(),
            ConstraintError::Unsatisfiable(_)
        ));
        assert!(matches!(
            "^1.x".parse::<VersionConstraint>().unwrap_err(),
            ConstraintError::InvalidVersion(_)
        ));
        assert!(matches!(
            "1.0.0 2.0.0".parse::<VersionConstraint>().unwrap_err(),
            ConstraintError::UnexpectedToken(_)
        ));
    }

    #[test]
    fn test_caret_allows() {
        let c: VersionConstraint = "^0.13.0".parse().unwrap();
        assert!(c.allows(&v("0.13.6")));
        assert!(!c.allows(&v("0.14.0")));
    }

    #[test]
    fn test_allows_below() {
        let fixed = v("0.13.3");
        assert!("^0.13.0".parse::<VersionConstraint>().unwrap().allows_below(&fixed));
        assert!(!"^0.13.3".parse::<VersionConstraint>().unwrap().allows_below(&fixed));
        assert!("any".parse::<VersionConstraint>().unwrap().allows_below(&fixed));
        assert!("<1.0.0".parse::<VersionConstraint>().unwrap().allows_below(&fixed));
        assert!(!">=1.0.0 <2.0.0".parse::<VersionConstraint>().unwrap().allows_below(&fixed));
    }
}
