//! Debian package versions and their total order.
//!
//! A version has the shape `[epoch:]upstream[-revision]`. Comparison follows
//! dpkg: epochs compare numerically, then the upstream part and the revision
//! are compared with the `verrevcmp` algorithm, which alternates between
//! non-digit runs (compared character by character with `~` sorting before
//! everything, even the end of the string) and digit runs (compared
//! numerically).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors produced when parsing a [`DebVersion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,

    #[error("invalid epoch in version {0:?}")]
    InvalidEpoch(String),

    #[error("empty upstream version in {0:?}")]
    EmptyUpstream(String),
}

/// A parsed Debian version.
///
/// Equality is defined by the dpkg ordering, so `1.0` and `1.00` are equal
/// even though their textual forms differ.
#[derive(Debug, Clone)]
pub struct DebVersion {
    epoch: u32,
    upstream: String,
    revision: String,
    raw: String,
}

impl DebVersion {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] if the string is empty, the epoch is not a
    /// number, or the upstream part is empty.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let raw = text.trim();
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                let epoch = epoch
                    .parse::<u32>()
                    .map_err(|_| VersionError::InvalidEpoch(raw.to_string()))?;
                (epoch, rest)
            }
            None => (0, raw),
        };

        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, revision),
            None => (rest, ""),
        };

        if upstream.is_empty() {
            return Err(VersionError::EmptyUpstream(raw.to_string()));
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.to_string(),
            raw: raw.to_string(),
        })
    }

    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Debian revision, empty for native packages.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for DebVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| verrevcmp(&self.revision, &other.revision))
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

/// Sort weight of one character in a non-digit run.
///
/// End of string and digits weigh 0, `~` sorts before both, letters sort
/// before all other characters.
fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

fn is_digit_at(s: &[u8], i: usize) -> bool {
    s.get(i).is_some_and(u8::is_ascii_digit)
}

fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        while (i < a.len() && !is_digit_at(a, i)) || (j < b.len() && !is_digit_at(b, j)) {
            let ac = char_order(a.get(i).copied());
            let bc = char_order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit_at(a, i) && is_digit_at(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if is_digit_at(a, i) {
            return Ordering::Greater;
        }
        if is_digit_at(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DebVersion {
        DebVersion::parse(s).expect("valid version")
    }

    #[test]
    fn parses_epoch_upstream_revision() {
        let ver = v("2:1.18.4-1ubuntu2");
        assert_eq!(ver.epoch(), 2);
        assert_eq!(ver.upstream(), "1.18.4");
        assert_eq!(ver.revision(), "1ubuntu2");
        assert_eq!(ver.to_string(), "2:1.18.4-1ubuntu2");
    }

    #[test]
    fn hyphenated_upstream_splits_on_last_hyphen() {
        let ver = v("1.0-beta-3");
        assert_eq!(ver.upstream(), "1.0-beta");
        assert_eq!(ver.revision(), "3");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(DebVersion::parse("  "), Err(VersionError::Empty));
        assert!(matches!(
            DebVersion::parse("x:1.0"),
            Err(VersionError::InvalidEpoch(_))
        ));
        assert!(matches!(
            DebVersion::parse("1:-3"),
            Err(VersionError::EmptyUpstream(_))
        ));
    }

    #[test]
    fn numeric_runs_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.0.1") > v("1.0"));
        assert_eq!(v("1.0"), v("1.00"));
    }

    #[test]
    fn tilde_sorts_before_release() {
        assert!(v("1.0~rc1") < v("1.0"));
        assert!(v("1.0~~") < v("1.0~"));
        assert!(v("1.0~rc1") < v("1.0~rc2"));
    }

    #[test]
    fn letters_sort_before_symbols() {
        assert!(v("1.0a") < v("1.0+"));
        assert!(v("1.0") < v("1.0a"));
    }

    #[test]
    fn epoch_dominates() {
        assert!(v("1:0.1") > v("9.9"));
    }

    #[test]
    fn revision_breaks_ties() {
        assert!(v("1.0-2") > v("1.0-1"));
        assert!(v("1.0-1") > v("1.0"));
        assert!(v("1.0-1ubuntu1") > v("1.0-1"));
    }
}
