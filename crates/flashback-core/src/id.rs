//! Strongly-typed identifiers.

use std::fmt;

/// Dense identifier assigned by the recorder to a live player or entity.
///
/// Ids start at 1 and are never reused within one recording. Players and
/// entities draw from the same counter, so an id names exactly one object
/// in a log regardless of its kind. Playback re-materialises objects under
/// the same id, independent of the external identity they were captured
/// from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurrogateId(pub u32);

impl SurrogateId {
    /// The first id handed out by a recorder.
    pub const FIRST: SurrogateId = SurrogateId(1);

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SurrogateId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_bare_numbers() {
        assert_eq!(SurrogateId(7).to_string(), "7");
        assert_eq!(SurrogateId::from(3), SurrogateId(3));
    }

    #[test]
    fn next_is_monotonic() {
        assert_eq!(SurrogateId::FIRST.next(), SurrogateId(2));
    }
}
