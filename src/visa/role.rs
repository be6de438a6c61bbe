//! Applicant roles within a single visa application batch.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Highest accompanying-member index the form has room for.
pub const MAX_ACCOMPANYING: u8 = 7;

const PRIMARY_KEY: &str = "primary";
const ACCOMPANYING_PREFIX: &str = "accompanying";

/// Which slot of the application form a record belongs to.
///
/// Ordering is the display order: the primary applicant first, then
/// accompanying members by ascending index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApplicantRole {
    Primary,
    Accompanying(u8),
}

impl ApplicantRole {
    /// Build an accompanying role, rejecting indices outside `1..=7`.
    pub fn accompanying(index: u8) -> Option<Self> {
        (1..=MAX_ACCOMPANYING)
            .contains(&index)
            .then_some(Self::Accompanying(index))
    }

    /// Every role the form supports, in display order.
    pub fn all() -> impl Iterator<Item = ApplicantRole> {
        std::iter::once(Self::Primary).chain((1..=MAX_ACCOMPANYING).map(Self::Accompanying))
    }

    /// Member key as used by the upload form (`primary`, `accompanying3`, ...).
    pub fn member_key(&self) -> String {
        match self {
            Self::Primary => PRIMARY_KEY.to_string(),
            Self::Accompanying(index) => format!("{ACCOMPANYING_PREFIX}{index}"),
        }
    }
}

impl fmt::Display for ApplicantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.member_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown applicant role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ApplicantRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key == PRIMARY_KEY {
            return Ok(Self::Primary);
        }

        key.strip_prefix(ACCOMPANYING_PREFIX)
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u8>().ok())
            .and_then(Self::accompanying)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl Serialize for ApplicantRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.member_key())
    }
}
