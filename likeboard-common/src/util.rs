use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Cuts `text` to at most `limit` characters, marking the cut with `...`.
///
/// Whitespace left dangling at the cut is dropped before the marker is added.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_owned(),
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
    }
}

/// `#[serde(with)]` helpers writing a [`time::UtcDateTime`] as RFC 3339.
pub mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{OffsetDateTime, UtcDateTime};

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time::serde::rfc3339::serialize(&OffsetDateTime::from(*value), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

        let Wrapper(value) = Wrapper::deserialize(deserializer)?;
        Ok(value.to_utc())
    }
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, truncate_with_ellipsis};
    use time::Duration;

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-5)).is_err());
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_ellipsis("hello", 120), "hello");
        assert_eq!(truncate_with_ellipsis(&"a".repeat(120), 120), "a".repeat(120));
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "ä".repeat(130);
        let preview = truncate_with_ellipsis(&text, 120);

        assert_eq!(preview.chars().count(), 123);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn dangling_whitespace_is_trimmed() {
        let text = format!("{} tail", "a".repeat(119));
        assert_eq!(truncate_with_ellipsis(&text, 120), format!("{}...", "a".repeat(119)));
    }
}
