// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian package version string handling.

Version semantics are defined at
<https://www.debian.org/doc/debian-policy/ch-controlfields.html#version>.
aptly compares versions with the same algorithm, so ordering here must agree
with the server for rotation decisions to be correct.
*/

use {
    std::{
        cmp::Ordering,
        fmt::{Display, Formatter},
        hash::{Hash, Hasher},
        num::ParseIntError,
        str::FromStr,
    },
    thiserror::Error,
};

#[derive(Clone, Debug, Error)]
pub enum VersionError {
    #[error("error parsing epoch to integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("non-ASCII character in version {0} (position {1}, code point {2:x})")]
    NonAscii(String, usize, u32),

    #[error("the epoch component has non-digit characters: {0}")]
    EpochNonNumeric(String),

    #[error("upstream_version component is empty or does not start with a digit: {0}")]
    UpstreamVersionMissing(String),

    #[error("upstream_version component of {0} has illegal character (position {1}, code point {2:X})")]
    UpstreamVersionIllegalChar(String, usize, u32),

    #[error("debian_revision component is empty: {0}")]
    DebianRevisionEmpty(String),

    #[error("debian_revision component of {0} has illegal character (position {1}, code point {2:X})")]
    DebianRevisionIllegalChar(String, usize, u32),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// A Debian package version.
///
/// The concise form of the format is `[epoch:]upstream_version[-debian_revision]`
/// and each component has rules about what characters are allowed.
///
/// An absent epoch is equivalent to `0` and an absent revision is equivalent
/// to `0`: `1.2`, `0:1.2`, and `1.2-0` all compare (and hash) as equal.
/// [Display] preserves the original input; [Self::canonical] renders the
/// fully-defaulted form.
#[derive(Clone, Debug)]
pub struct PackageVersion {
    original: String,
    epoch: u64,
    upstream_version: String,
    debian_revision: String,
}

impl PackageVersion {
    /// Construct an instance by parsing a version string.
    pub fn parse(s: &str) -> Result<Self> {
        if let Some((pos, c)) = s.char_indices().find(|(_, c)| !c.is_ascii()) {
            return Err(VersionError::NonAscii(s.to_string(), pos, c as u32));
        }

        // Epoch is the part before the first colon. No colon means epoch 0.
        let (epoch, remainder) = match s.find(':') {
            Some(pos) => (&s[0..pos], &s[pos + 1..]),
            None => ("0", s),
        };

        // upstream_version and debian_revision split on the last hyphen. No
        // hyphen means revision 0; a trailing hyphen leaves the revision
        // empty, which is rejected below.
        let (upstream, revision) = match remainder.rfind('-') {
            Some(pos) => (&remainder[0..pos], &remainder[pos + 1..]),
            None => (remainder, "0"),
        };

        if epoch.is_empty() || !epoch.chars().all(|c| c.is_ascii_digit()) {
            return Err(VersionError::EpochNonNumeric(s.to_string()));
        }
        let epoch = u64::from_str(epoch)?;

        if !upstream.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(VersionError::UpstreamVersionMissing(s.to_string()));
        }

        if let Some((pos, c)) = upstream
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '+' | '~' | '-' | ':'))
        {
            return Err(VersionError::UpstreamVersionIllegalChar(
                s.to_string(),
                pos,
                c as u32,
            ));
        }

        if revision.is_empty() {
            return Err(VersionError::DebianRevisionEmpty(s.to_string()));
        }

        if let Some((pos, c)) = revision
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '+' | '~'))
        {
            return Err(VersionError::DebianRevisionIllegalChar(
                s.to_string(),
                pos,
                c as u32,
            ));
        }

        Ok(Self {
            original: s.to_string(),
            epoch,
            upstream_version: upstream.to_string(),
            debian_revision: revision.to_string(),
        })
    }

    /// The `epoch` component, with `0` assumed when absent from the input.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// `upstream` component of the version string.
    pub fn upstream_version(&self) -> &str {
        &self.upstream_version
    }

    /// `debian_revision` component, with `0` assumed when absent from the input.
    pub fn debian_revision(&self) -> &str {
        &self.debian_revision
    }

    /// The fully-defaulted `{epoch}:{upstream}-{revision}` form.
    ///
    /// Unlike [Display], which round-trips the input, this form is identical
    /// for all equal versions.
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}-{}",
            self.epoch, self.upstream_version, self.debian_revision
        )
    }
}

impl Display for PackageVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split a string into its leading digit or non-digit run and the remainder.
fn split_run(s: &str, digits: bool) -> (&str, &str) {
    match s.find(|c: char| c.is_ascii_digit() != digits) {
        Some(pos) => (&s[0..pos], &s[pos..]),
        None => (s, ""),
    }
}

/// Sort weight of a character within a non-digit run.
///
/// Tilde sorts before the end of the run, which sorts before letters, which
/// sort before every other symbol.
fn char_weight(c: Option<char>) -> i32 {
    match c {
        None => 0,
        Some('~') => -1,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

fn compare_nondigit_runs(a: &str, b: &str) -> Ordering {
    let a_chars = a.chars().collect::<Vec<_>>();
    let b_chars = b.chars().collect::<Vec<_>>();

    for pos in 0..=std::cmp::max(a_chars.len(), b_chars.len()) {
        let res = char_weight(a_chars.get(pos).copied()).cmp(&char_weight(b_chars.get(pos).copied()));
        if res != Ordering::Equal {
            return res;
        }
    }

    Ordering::Equal
}

/// Compare digit runs numerically without overflowing on absurd inputs.
///
/// An empty run counts as zero.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        res => res,
    }
}

/// Compare a version component string using Debian rules.
///
/// The comparison alternates between two steps until both inputs are
/// exhausted: the leading non-digit runs are compared with the custom lexical
/// sort, then the leading digit runs are compared numerically. Either run may
/// be empty.
fn compare_component(a: &str, b: &str) -> Ordering {
    let mut a_remaining = a;
    let mut b_remaining = b;
    let mut digits = false;

    while !a_remaining.is_empty() || !b_remaining.is_empty() {
        let (a_run, a_rest) = split_run(a_remaining, digits);
        let (b_run, b_rest) = split_run(b_remaining, digits);

        let res = if digits {
            compare_digit_runs(a_run, b_run)
        } else {
            compare_nondigit_runs(a_run, b_run)
        };

        if res != Ordering::Equal {
            return res;
        }

        a_remaining = a_rest;
        b_remaining = b_rest;
        digits = !digits;
    }

    Ordering::Equal
}

/// Decompose a component into its normalized run sequence.
///
/// Digit runs lose leading zeros and a trailing implicit `0` digit run is
/// made explicit, so that components that compare equal produce identical
/// sequences. This is the basis for [Hash] agreeing with [PartialEq].
fn component_runs(s: &str) -> Vec<String> {
    let mut runs = vec![];
    let mut remaining = s;
    let mut digits = false;

    while !remaining.is_empty() {
        let (run, rest) = split_run(remaining, digits);

        runs.push(if digits {
            let normalized = run.trim_start_matches('0');
            if normalized.is_empty() { "0" } else { normalized }.to_string()
        } else {
            run.to_string()
        });

        remaining = rest;
        digits = !digits;
    }

    // A component ending in a non-digit run compares as if followed by 0.
    // After consuming a non-digit run the flag has flipped to expect digits.
    if digits {
        runs.push("0".to_string());
    }

    runs
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        component_runs(&self.upstream_version).hash(state);
        component_runs(&self.debian_revision).hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_component(&self.upstream_version, &other.upstream_version))
            .then_with(|| compare_component(&self.debian_revision, &other.debian_revision))
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        std::collections::hash_map::DefaultHasher,
    };

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s).unwrap()
    }

    #[test]
    fn parse() -> Result<()> {
        let version = PackageVersion::parse("1:4.7.0+dfsg1-2")?;
        assert_eq!(version.epoch(), 1);
        assert_eq!(version.upstream_version(), "4.7.0+dfsg1");
        assert_eq!(version.debian_revision(), "2");

        let version = PackageVersion::parse("3.3.2.final~github")?;
        assert_eq!(version.epoch(), 0);
        assert_eq!(version.upstream_version(), "3.3.2.final~github");
        assert_eq!(version.debian_revision(), "0");

        let version = PackageVersion::parse("0.18.0+dfsg-2+b1")?;
        assert_eq!(version.upstream_version(), "0.18.0+dfsg");
        assert_eq!(version.debian_revision(), "2+b1");

        // Hyphens inside upstream belong to upstream; only the last one
        // starts the revision.
        let version = PackageVersion::parse("1.2-3-4")?;
        assert_eq!(version.upstream_version(), "1.2-3");
        assert_eq!(version.debian_revision(), "4");

        Ok(())
    }

    #[test]
    fn parse_rejects() {
        assert!(matches!(
            PackageVersion::parse("1.2\u{2764}"),
            Err(VersionError::NonAscii(_, 3, 0x2764))
        ));
        assert!(matches!(
            PackageVersion::parse("a:1.2"),
            Err(VersionError::EpochNonNumeric(_))
        ));
        assert!(matches!(
            PackageVersion::parse(":1.2"),
            Err(VersionError::EpochNonNumeric(_))
        ));
        assert!(matches!(
            PackageVersion::parse("abc"),
            Err(VersionError::UpstreamVersionMissing(_))
        ));
        assert!(matches!(
            PackageVersion::parse(""),
            Err(VersionError::UpstreamVersionMissing(_))
        ));
        assert!(matches!(
            PackageVersion::parse("1.1-"),
            Err(VersionError::DebianRevisionEmpty(_))
        ));
        assert!(matches!(
            PackageVersion::parse("1;2"),
            Err(VersionError::UpstreamVersionIllegalChar(_, 1, 0x3b))
        ));
        assert!(matches!(
            PackageVersion::parse("1.2-1_2"),
            Err(VersionError::DebianRevisionIllegalChar(_, 1, 0x5f))
        ));
    }

    #[test]
    fn format_round_trips() -> Result<()> {
        for s in ["1:4.7.0+dfsg1-2", "3.3.2.final~github", "0.18.0+dfsg-2+b1", "1.2"] {
            assert_eq!(PackageVersion::parse(s)?.to_string(), s);
        }

        Ok(())
    }

    #[test]
    fn canonical_form() {
        assert_eq!(v("1.2").canonical(), "0:1.2-0");
        assert_eq!(v("1:1.2-3").canonical(), "1:1.2-3");
        assert_eq!(v("1.2-0").canonical(), "0:1.2-0");
    }

    #[test]
    fn ordering_spot_checks() {
        assert!(v("1.2") < v("1.10"));
        assert!(v("1.2~1") < v("1.2"));
        assert!(v("1.2~1") < v("1.2-1"));
        assert!(v("1.2.ananas") < v("1.2.apple"));
        assert!(v("1.2") < v("1.2.1"));
        assert!(v("1.2-1~1") < v("1.2-1a"));
        assert!(v("1.0~beta1~svn1245") < v("1.0~beta1"));
        assert!(v("1.0~beta1") < v("1.0"));
        assert!(v("1:0.1") > v("2.0"));
    }

    #[test]
    fn defaulted_components_are_equal() {
        assert_eq!(v("1.2"), v("1.2-0"));
        assert_eq!(v("1.2"), v("0:1.2"));
        assert_eq!(v("1.2"), v("0:1.2-0"));
        assert_ne!(v("1.2"), v("1.2-1"));
    }

    fn hash_of(version: &PackageVersion) -> u64 {
        let mut hasher = DefaultHasher::new();
        version.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_versions_hash_equal() {
        for (a, b) in [("1.2", "1.2-0"), ("1.2", "0:1.2"), ("1.2.", "1.2.0-0")] {
            assert_eq!(v(a), v(b), "{} == {}", a, b);
            assert_eq!(hash_of(&v(a)), hash_of(&v(b)), "hash {} == {}", a, b);
        }
    }

    #[test]
    fn huge_digit_runs_do_not_overflow() {
        let big = "1.184467440737095516161844674407370955161618446744073709551616";
        assert!(v(big) > v("1.2"));
        assert_eq!(v(big), v(big));
    }
}
