//! Backup keys
//!
//! Keys carry their creation time in milliseconds since the epoch:
//! - automatic: `backup-<millis>`
//! - manual: `<label> (<millis>)`
//!
//! Ordering always goes through the parsed timestamp. Comparing the raw
//! strings breaks as soon as two timestamps differ in digit count.

use std::cmp::Ordering;
use std::fmt;

use crate::storage::Namespace;

/// Prefix of every automatic backup key
pub const AUTO_KEY_PREFIX: &str = "backup-";

/// Parsed backup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackupKey {
    Auto { timestamp: i64 },
    Manual { label: String, timestamp: i64 },
}

impl BackupKey {
    pub fn auto(timestamp: i64) -> Self {
        Self::Auto { timestamp }
    }

    pub fn manual(label: impl Into<String>, timestamp: i64) -> Self {
        Self::Manual {
            label: label.into(),
            timestamp,
        }
    }

    /// Creation time in milliseconds since the epoch
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Auto { timestamp } | Self::Manual { timestamp, .. } => *timestamp,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Auto { .. } => None,
            Self::Manual { label, .. } => Some(label),
        }
    }

    /// Namespace this key is written to
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Auto { .. } => Namespace::Auto,
            Self::Manual { .. } => Namespace::Manual,
        }
    }

    /// Parse a key read back from the given namespace
    pub fn parse(namespace: Namespace, key: &str) -> Option<Self> {
        match namespace {
            Namespace::Auto => Self::parse_auto(key),
            Namespace::Manual => Self::parse_manual(key),
        }
    }

    fn parse_auto(key: &str) -> Option<Self> {
        let digits = key.strip_prefix(AUTO_KEY_PREFIX)?;
        parse_millis(digits).map(Self::auto)
    }

    fn parse_manual(key: &str) -> Option<Self> {
        // Labels may themselves contain " (", so split on the last one
        let (label, digits) = key.strip_suffix(')')?.rsplit_once(" (")?;
        parse_millis(digits).map(|timestamp| Self::manual(label, timestamp))
    }
}

fn parse_millis(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for BackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto { timestamp } => write!(f, "{}{}", AUTO_KEY_PREFIX, timestamp),
            Self::Manual { label, timestamp } => write!(f, "{} ({})", label, timestamp),
        }
    }
}

impl Ord for BackupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp()
            .cmp(&other.timestamp())
            .then_with(|| self.label().cmp(&other.label()))
    }
}

impl PartialOrd for BackupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse raw keys from a namespace and sort them newest first
///
/// Each parsed key is paired with the string it was read from, which is
/// what the store knows it by (`backup-0012` parses like `backup-12`).
/// Keys that don't follow the namespace's scheme are dropped.
pub fn newest_first<I, S>(namespace: Namespace, keys: I) -> Vec<(BackupKey, String)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parsed: Vec<(BackupKey, String)> = keys
        .into_iter()
        .filter_map(|raw| {
            let raw: String = raw.into();
            BackupKey::parse(namespace, &raw).map(|key| (key, raw))
        })
        .collect();
    parsed.sort_by(|a, b| b.cmp(a));
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(BackupKey::auto(1700000000123).to_string(), "backup-1700000000123");
        assert_eq!(
            BackupKey::manual("MyLabel", 1700000000123).to_string(),
            "MyLabel (1700000000123)"
        );
    }

    #[test]
    fn test_parse_auto() {
        let key = BackupKey::parse(Namespace::Auto, "backup-1700000000123").unwrap();
        assert_eq!(key.timestamp(), 1700000000123);
        assert_eq!(key.label(), None);
        assert_eq!(key.namespace(), Namespace::Auto);

        assert!(BackupKey::parse(Namespace::Auto, "backup-").is_none());
        assert!(BackupKey::parse(Namespace::Auto, "backup-12ab").is_none());
        assert!(BackupKey::parse(Namespace::Auto, "backup--5").is_none());
        assert!(BackupKey::parse(Namespace::Auto, "snapshot-123").is_none());
    }

    #[test]
    fn test_parse_manual_label_with_parentheses() {
        let key =
            BackupKey::parse(Namespace::Manual, "before refine (v2) (1700000000123)").unwrap();
        assert_eq!(key.label(), Some("before refine (v2)"));
        assert_eq!(key.timestamp(), 1700000000123);

        assert!(BackupKey::parse(Namespace::Manual, "no timestamp").is_none());
        assert!(BackupKey::parse(Namespace::Manual, "bad (12x)").is_none());
    }

    #[test]
    fn test_display_parse_agree() {
        let key = BackupKey::manual("MyLabel", 42);
        assert_eq!(BackupKey::parse(Namespace::Manual, &key.to_string()), Some(key));
    }

    #[test]
    fn test_ordering_is_numeric_not_lexical() {
        // Lexically "backup-999" > "backup-1000"
        let sorted = newest_first(Namespace::Auto, ["backup-999", "backup-1000", "backup-50"]);
        let timestamps: Vec<i64> = sorted.iter().map(|(key, _)| key.timestamp()).collect();
        assert_eq!(timestamps, vec![1000, 999, 50]);
    }

    #[test]
    fn test_newest_first_drops_foreign_keys() {
        let sorted = newest_first(
            Namespace::Auto,
            vec!["backup-2".to_string(), "settings".to_string(), "backup-1".to_string()],
        );
        assert_eq!(
            sorted,
            vec![
                (BackupKey::auto(2), "backup-2".to_string()),
                (BackupKey::auto(1), "backup-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_newest_first_keeps_stored_spelling() {
        let sorted = newest_first(Namespace::Auto, ["backup-0012", "backup-99"]);
        assert_eq!(sorted[0].1, "backup-99");
        assert_eq!(sorted[1].0, BackupKey::auto(12));
        assert_eq!(sorted[1].1, "backup-0012");
    }
}
