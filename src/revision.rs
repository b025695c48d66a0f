//! Revision specifiers and range coalescing
//!
//! Operators enter (or pick from history) revision expressions such as
//! `101-103,107`. They are parsed into a [`RevisionSpec`] at the boundary;
//! the compact text form is only used for display and for the `svn merge -c`
//! argument.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single revision or an inclusive contiguous run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevisionToken {
    /// One revision, rendered as `n`
    Single(u64),
    /// Inclusive run `a-b` with `b > a`
    Range(u64, u64),
}

impl RevisionToken {
    /// First revision covered by this token
    pub const fn start(self) -> u64 {
        match self {
            Self::Single(n) | Self::Range(n, _) => n,
        }
    }

    /// Last revision covered by this token
    pub const fn end(self) -> u64 {
        match self {
            Self::Single(n) | Self::Range(_, n) => n,
        }
    }

    /// All revisions covered by this token
    pub fn revisions(self) -> impl Iterator<Item = u64> {
        self.start()..=self.end()
    }

    fn from_run(start: u64, end: u64) -> Self {
        if start == end {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(a, b) => write!(f, "{a}-{b}"),
        }
    }
}

impl FromStr for RevisionToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once('-') {
            Some((a, b)) => {
                let start = parse_revision_number(a)?;
                let end = parse_revision_number(b)?;
                if end < start {
                    return Err(Error::InvalidRevision(format!(
                        "range '{s}' ends before it starts"
                    )));
                }
                Ok(Self::from_run(start, end))
            }
            None => parse_revision_number(s).map(Self::Single),
        }
    }
}

/// Parse one positive revision number, tolerating an `r` prefix
pub fn parse_revision_number(s: &str) -> Result<u64> {
    let s = s.trim();
    let digits = s.strip_prefix('r').unwrap_or(s);
    match digits.parse::<u64>() {
        Ok(0) => Err(Error::InvalidRevision("revision 0 cannot be merged".to_string())),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::InvalidRevision(format!("'{s}' is not a revision number"))),
    }
}

/// A parsed revision specifier: a comma-joined list of tokens
///
/// Parsing preserves the operator's token order; [`RevisionSpec::normalized`]
/// yields the coalesced form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionSpec {
    tokens: Vec<RevisionToken>,
}

impl RevisionSpec {
    /// Spec covering exactly one revision
    pub fn single(revision: u64) -> Self {
        Self {
            tokens: vec![RevisionToken::Single(revision)],
        }
    }

    /// Parse an operator-entered expression; blank input yields `None`
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        if s.trim().is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some)
        }
    }

    /// Tokens in entry order
    pub fn tokens(&self) -> &[RevisionToken] {
        &self.tokens
    }

    /// Every revision covered
    ///
    /// Materialises each revision; prefer [`RevisionSpec::count`] and
    /// [`RevisionSpec::lowest`] for operator-entered ranges.
    pub fn expand(&self) -> BTreeSet<u64> {
        self.tokens.iter().flat_map(|t| t.revisions()).collect()
    }

    /// Disjoint ascending runs covering the same revisions
    fn runs(&self) -> Vec<(u64, u64)> {
        let mut bounds: Vec<(u64, u64)> =
            self.tokens.iter().map(|t| (t.start(), t.end())).collect();
        bounds.sort_unstable();

        let mut runs: Vec<(u64, u64)> = Vec::with_capacity(bounds.len());
        for (start, end) in bounds {
            match runs.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => runs.push((start, end)),
            }
        }
        runs
    }

    /// Number of distinct revisions covered, saturating at `u64::MAX`
    pub fn count(&self) -> u64 {
        self.runs().into_iter().fold(0u64, |total, (start, end)| {
            total.saturating_add((end - start).saturating_add(1))
        })
    }

    /// The `limit` lowest distinct revisions, ascending
    pub fn lowest(&self, limit: usize) -> Vec<u64> {
        self.runs()
            .into_iter()
            .flat_map(|(start, end)| start..=end)
            .take(limit)
            .collect()
    }

    /// The same revisions as the minimal ascending token list
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            tokens: self
                .runs()
                .into_iter()
                .map(|(start, end)| RevisionToken::from_run(start, end))
                .collect(),
        }
    }

    /// Whether this spec names exactly one revision
    pub fn as_single(&self) -> Option<u64> {
        match self.tokens.as_slice() {
            [RevisionToken::Single(n)] => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for RevisionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

impl FromStr for RevisionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tokens = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<RevisionToken>>>()?;
        if tokens.is_empty() {
            return Err(Error::InvalidRevision(format!("'{s}' names no revisions")));
        }
        Ok(Self { tokens })
    }
}

impl From<Vec<RevisionToken>> for RevisionSpec {
    fn from(tokens: Vec<RevisionToken>) -> Self {
        Self { tokens }
    }
}

/// Coalesce revisions into the minimal ascending list of singles and runs
///
/// Duplicates are ignored. `[1, 2, 3, 7]` becomes `1-3,7`.
pub fn coalesce<I: IntoIterator<Item = u64>>(revisions: I) -> Vec<RevisionToken> {
    let sorted: BTreeSet<u64> = revisions.into_iter().collect();
    let mut tokens = Vec::new();
    let mut iter = sorted.into_iter();

    let Some(first) = iter.next() else {
        return tokens;
    };
    let (mut start, mut end) = (first, first);

    for rev in iter {
        if rev == end + 1 {
            end = rev;
        } else {
            tokens.push(RevisionToken::from_run(start, end));
            start = rev;
            end = rev;
        }
    }
    tokens.push(RevisionToken::from_run(start, end));

    tokens
}

/// Coalesce textual history ids (as picked from a log listing)
pub fn coalesce_ids<S: AsRef<str>>(ids: &[S]) -> Result<Vec<RevisionToken>> {
    let revisions = ids
        .iter()
        .map(|id| parse_revision_number(id.as_ref()))
        .collect::<Result<Vec<u64>>>()?;
    Ok(coalesce(revisions))
}
