//! Bounded, ordered transcript of chat activity.

use std::{collections::VecDeque, fmt};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::ServerEvent;

/// Default transcript capacity.
pub const DEFAULT_CAPACITY: usize = 600;

/// Unique transcript entry identifier.
///
/// UUIDv7: millisecond clock plus random bits, so ids stay distinct across
/// sessions and controller instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Transcript entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Message,
    System,
    Presence,
    Error,
}

/// UI-ready form of a server event or local notice.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
}

impl TranscriptEntry {
    fn new(kind: EntryKind, text: String) -> Self {
        Self {
            id: EntryId::new(),
            kind,
            text,
            from: None,
            room: None,
            at: None,
        }
    }

    /// Local informational notice.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(EntryKind::System, text.into())
    }

    /// Local problem notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(EntryKind::Error, text.into())
    }

    /// Fold a server event into exactly one entry.
    #[must_use]
    pub fn from_event(event: ServerEvent) -> Self {
        match event {
            ServerEvent::Message {
                room,
                from,
                text,
                at,
            } => Self {
                from: Some(from),
                room: Some(room),
                at,
                ..Self::new(EntryKind::Message, text)
            },
            ServerEvent::Presence {
                room,
                from,
                action,
                at,
            } => Self {
                room: Some(room),
                at,
                ..Self::new(EntryKind::Presence, format!("{from} {}", action.verb()))
            },
            ServerEvent::System { text, at, room } => Self {
                room,
                at,
                ..Self::new(EntryKind::System, text)
            },
            ServerEvent::Error { text, at } => Self {
                at,
                ..Self::new(EntryKind::Error, text)
            },
        }
    }

    /// Parsed timestamp, if present and valid.
    ///
    /// RFC 3339 first; ISO-8601 date-times without an offset are read as
    /// local time.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        let at = self.at.as_deref()?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(at) {
            return Some(parsed);
        }
        NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(|local| local.fixed_offset())
    }

    /// Local `HH:MM`, or empty when the timestamp is absent or unparsable.
    #[must_use]
    pub fn display_time(&self) -> String {
        self.timestamp()
            .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_default()
    }

    /// Whether this is a message authored by `nickname`.
    #[must_use]
    pub fn is_mine(&self, nickname: &str) -> bool {
        self.kind == EntryKind::Message && self.from.as_deref() == Some(nickname)
    }
}

/// Fixed-capacity ring of entries indexed by insertion sequence.
///
/// When full, the oldest entry is evicted first. The backing buffer is
/// allocated once up front.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
    capacity: usize,
    /// Sequence number the next appended entry will receive.
    next_seq: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Transcript {
    /// Create an empty transcript. Capacity is at least 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Append an entry, returning the evicted one if the ring was full.
    pub fn push(&mut self, entry: TranscriptEntry) -> Option<TranscriptEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        self.next_seq += 1;
        evicted
    }

    /// Entry by insertion sequence, if it has not been evicted.
    #[must_use]
    pub fn get(&self, seq: u64) -> Option<&TranscriptEntry> {
        let offset = seq.checked_sub(self.first_seq())?;
        self.entries.get(usize::try_from(offset).ok()?)
    }

    /// Sequence number of the oldest retained entry.
    #[must_use]
    pub fn first_seq(&self) -> u64 {
        self.next_seq - self.entries.len() as u64
    }

    /// Number of entries ever appended.
    #[must_use]
    pub const fn total_appended(&self) -> u64 {
        self.next_seq
    }

    /// Number of entries evicted so far.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.first_seq()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.back()
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TranscriptEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Owned copy for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TranscriptEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::protocol::PresenceAction;

    #[test]
    fn test_bounded_fifo_eviction() {
        let mut transcript = Transcript::new(3);
        for i in 0..10 {
            transcript.push(TranscriptEntry::system(format!("entry {i}")));
            assert!(transcript.len() <= 3);
        }

        let texts: Vec<_> = transcript.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["entry 7", "entry 8", "entry 9"]);
        assert_eq!(transcript.total_appended(), 10);
        assert_eq!(transcript.evicted(), 7);
    }

    #[test]
    fn test_push_returns_evicted_oldest() {
        let mut transcript = Transcript::new(2);
        assert!(transcript.push(TranscriptEntry::system("a")).is_none());
        assert!(transcript.push(TranscriptEntry::system("b")).is_none());
        let evicted = transcript.push(TranscriptEntry::system("c")).unwrap();
        assert_eq!(evicted.text, "a");
    }

    #[test]
    fn test_get_by_sequence() {
        let mut transcript = Transcript::new(2);
        for text in ["a", "b", "c"] {
            transcript.push(TranscriptEntry::system(text));
        }
        assert!(transcript.get(0).is_none());
        assert_eq!(transcript.get(1).unwrap().text, "b");
        assert_eq!(transcript.get(2).unwrap().text, "c");
        assert!(transcript.get(3).is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut transcript = Transcript::new(0);
        transcript.push(TranscriptEntry::system("a"));
        transcript.push(TranscriptEntry::system("b"));
        assert_eq!(transcript.capacity(), 1);
        assert_eq!(transcript.last().unwrap().text, "b");
    }

    #[test]
    fn test_ids_are_distinct() {
        let ids: HashSet<_> = (0..5000).map(|_| TranscriptEntry::system("x").id).collect();
        assert_eq!(ids.len(), 5000);
    }

    #[test]
    fn test_presence_mapping() {
        let entry = TranscriptEntry::from_event(ServerEvent::Presence {
            room: "geral".to_string(),
            from: "Ana".to_string(),
            action: PresenceAction::Join,
            at: Some("2024-01-01T10:00:00Z".to_string()),
        });
        assert_eq!(entry.kind, EntryKind::Presence);
        assert_eq!(entry.text, "Ana joined");
        assert_eq!(entry.room.as_deref(), Some("geral"));

        let leave = TranscriptEntry::from_event(ServerEvent::Presence {
            room: "geral".to_string(),
            from: "Ana".to_string(),
            action: PresenceAction::Leave,
            at: None,
        });
        assert_eq!(leave.text, "Ana left");
    }

    #[test]
    fn test_message_mapping() {
        let entry = TranscriptEntry::from_event(ServerEvent::Message {
            room: "geral".to_string(),
            from: "Bob".to_string(),
            text: "oi".to_string(),
            at: Some("2024-01-01T10:00:05Z".to_string()),
        });
        assert_eq!(entry.kind, EntryKind::Message);
        assert_eq!(entry.from.as_deref(), Some("Bob"));
        assert_eq!(entry.text, "oi");
        assert_eq!(entry.room.as_deref(), Some("geral"));
        assert!(entry.is_mine("Bob"));
        assert!(!entry.is_mine("Ana"));
    }

    #[test]
    fn test_error_and_system_mapping() {
        let error = TranscriptEntry::from_event(ServerEvent::error("room is full"));
        assert_eq!(error.kind, EntryKind::Error);
        assert!(error.room.is_none());

        let system = TranscriptEntry::from_event(ServerEvent::System {
            text: "welcome".to_string(),
            at: None,
            room: Some("geral".to_string()),
        });
        assert_eq!(system.kind, EntryKind::System);
        assert_eq!(system.room.as_deref(), Some("geral"));
    }

    #[test]
    fn test_display_time() {
        let mut entry = TranscriptEntry::system("x");
        assert_eq!(entry.display_time(), "");

        entry.at = Some("yesterday-ish".to_string());
        assert_eq!(entry.display_time(), "");
        assert!(entry.timestamp().is_none());

        entry.at = Some("2024-01-01T10:00:05Z".to_string());
        assert_eq!(entry.display_time().len(), 5);
        let utc = entry.timestamp().unwrap().with_timezone(&chrono::Utc);
        assert_eq!(utc.format("%H:%M:%S").to_string(), "10:00:05");
    }

    #[test]
    fn test_display_time_without_offset() {
        let mut entry = TranscriptEntry::system("x");
        entry.at = Some("2024-01-01T10:00:00".to_string());
        assert_eq!(entry.display_time(), "10:00");

        entry.at = Some("2024-01-01T23:59:30.250".to_string());
        assert_eq!(entry.display_time(), "23:59");

        entry.at = Some("2024-01-01".to_string());
        assert_eq!(entry.display_time(), "");
    }
}
