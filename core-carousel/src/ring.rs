//! # Stream Ring
//!
//! Circular, cursor-addressed sequence of live streams. Built once from the
//! feed; afterwards only the cursor moves. Every operation is O(1): jumps go
//! through an id → position index built at construction.

use crate::error::{CarouselError, Result};
use crate::navigation::Direction;
use crate::slot::SlotRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a stream, unique within a feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One entry of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    #[serde(alias = "playbackUrl")]
    pub playback_url: String,
    /// Opaque presentation data (title, channel, thumbnails...).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Stream {
    pub fn new(id: impl Into<StreamId>, playback_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            playback_url: playback_url.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Feed manifest as published next to the web app:
///
/// ```json
/// { "streams": [ { "id": "a", "stream": { "playbackUrl": "https://...", "title": "..." } } ] }
/// ```
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub streams: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub id: StreamId,
    pub stream: ManifestStream,
}

#[derive(Debug, Deserialize)]
pub struct ManifestStream {
    #[serde(rename = "playbackUrl")]
    pub playback_url: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_streams(self) -> Vec<Stream> {
        self.streams
            .into_iter()
            .map(|entry| Stream {
                id: entry.id,
                playback_url: entry.stream.playback_url,
                metadata: serde_json::Value::Object(entry.stream.metadata),
            })
            .collect()
    }
}

// ============================================================================
// Window
// ============================================================================

/// The three ring positions around the cursor.
///
/// On rings shorter than three the positions overlap; [`Window::members`]
/// yields each distinct stream once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub prev: StreamId,
    pub active: StreamId,
    pub next: StreamId,
}

impl Window {
    /// Distinct members with the role each one should get, active first.
    pub fn members(&self) -> Vec<(StreamId, SlotRole)> {
        let mut members = vec![(self.active.clone(), SlotRole::Active)];
        if self.next != self.active {
            members.push((self.next.clone(), SlotRole::Next));
        }
        if self.prev != self.active && self.prev != self.next {
            members.push((self.prev.clone(), SlotRole::Prev));
        }
        members
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        &self.prev == id || &self.active == id || &self.next == id
    }

    /// Role a slot holding `id` should have, if `id` is in the window.
    pub fn role_of(&self, id: &StreamId) -> Option<SlotRole> {
        if &self.active == id {
            Some(SlotRole::Active)
        } else if &self.next == id {
            Some(SlotRole::Next)
        } else if &self.prev == id {
            Some(SlotRole::Prev)
        } else {
            None
        }
    }
}

// ============================================================================
// StreamRing
// ============================================================================

#[derive(Debug, Clone)]
pub struct StreamRing {
    streams: Vec<Stream>,
    positions: HashMap<StreamId, usize>,
    cursor: usize,
}

impl StreamRing {
    /// Build a ring positioned on the first stream.
    ///
    /// # Errors
    ///
    /// - [`CarouselError::EmptyRing`] for an empty feed
    /// - [`CarouselError::DuplicateStream`] if two entries share an id
    pub fn new(streams: Vec<Stream>) -> Result<Self> {
        if streams.is_empty() {
            return Err(CarouselError::EmptyRing);
        }

        let mut positions = HashMap::with_capacity(streams.len());
        for (position, stream) in streams.iter().enumerate() {
            if positions.insert(stream.id.clone(), position).is_some() {
                return Err(CarouselError::DuplicateStream(stream.id.clone()));
            }
        }

        Ok(Self {
            streams,
            positions,
            cursor: 0,
        })
    }

    /// Parse a feed manifest and build a ring from it.
    pub fn from_manifest_json(text: &str) -> Result<Self> {
        Self::new(Manifest::from_json(text)?.into_streams())
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Always `false`; empty rings cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn current(&self) -> &Stream {
        &self.streams[self.cursor]
    }

    pub fn next(&self) -> &Stream {
        &self.streams[(self.cursor + 1) % self.len()]
    }

    pub fn prev(&self) -> &Stream {
        &self.streams[(self.cursor + self.len() - 1) % self.len()]
    }

    pub fn advance(&mut self) -> &Stream {
        self.cursor = (self.cursor + 1) % self.len();
        self.current()
    }

    pub fn retreat(&mut self) -> &Stream {
        self.cursor = (self.cursor + self.len() - 1) % self.len();
        self.current()
    }

    pub fn step(&mut self, direction: Direction) -> &Stream {
        match direction {
            Direction::Advance => self.advance(),
            Direction::Retreat => self.retreat(),
        }
    }

    /// Move the cursor onto `id`.
    ///
    /// The cursor is left untouched when `id` is unknown.
    pub fn jump(&mut self, id: &StreamId) -> Result<&Stream> {
        let position = self
            .position_of(id)
            .ok_or_else(|| CarouselError::NotFound(id.clone()))?;
        self.cursor = position;
        Ok(self.current())
    }

    pub fn position_of(&self, id: &StreamId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &StreamId) -> Option<&Stream> {
        self.position_of(id).map(|position| &self.streams[position])
    }

    pub fn window(&self) -> Window {
        Window {
            prev: self.prev().id.clone(),
            active: self.current().id.clone(),
            next: self.next().id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(ids: &[&str]) -> StreamRing {
        StreamRing::new(
            ids.iter()
                .map(|id| Stream::new(*id, format!("https://cdn.test/{}.m3u8", id)))
                .collect(),
        )
        .unwrap()
    }

    fn id(s: &str) -> StreamId {
        StreamId::from(s)
    }

    #[test]
    fn test_empty_ring_rejected() {
        assert!(matches!(
            StreamRing::new(Vec::new()),
            Err(CarouselError::EmptyRing)
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let streams = vec![Stream::new("a", "u1"), Stream::new("a", "u2")];
        match StreamRing::new(streams) {
            Err(CarouselError::DuplicateStream(dup)) => assert_eq!(dup, id("a")),
            other => panic!("expected DuplicateStream, got {:?}", other),
        }
    }

    #[test]
    fn test_neighbours_wrap_around() {
        let mut ring = ring(&["a", "b", "c", "d"]);
        assert_eq!(ring.current().id, id("a"));
        assert_eq!(ring.prev().id, id("d"));
        assert_eq!(ring.next().id, id("b"));

        ring.retreat();
        assert_eq!(ring.current().id, id("d"));
        assert_eq!(ring.next().id, id("a"));

        ring.advance();
        ring.advance();
        assert_eq!(ring.current().id, id("b"));
    }

    #[test]
    fn test_full_cycle_returns_home() {
        let mut ring = ring(&["a", "b", "c"]);
        for _ in 0..3 {
            ring.step(Direction::Advance);
        }
        assert_eq!(ring.cursor(), 0);
    }

    #[test]
    fn test_jump() {
        let mut ring = ring(&["a", "b", "c", "d"]);
        assert_eq!(ring.jump(&id("c")).unwrap().id, id("c"));
        assert_eq!(ring.window().prev, id("b"));
        assert_eq!(ring.window().next, id("d"));

        assert!(matches!(
            ring.jump(&id("zzz")),
            Err(CarouselError::NotFound(_))
        ));
        assert_eq!(ring.current().id, id("c"));
    }

    #[test]
    fn test_window_members_on_short_rings() {
        let single = ring(&["a"]);
        assert_eq!(single.window().members(), vec![(id("a"), SlotRole::Active)]);

        let pair = ring(&["a", "b"]);
        assert_eq!(
            pair.window().members(),
            vec![(id("a"), SlotRole::Active), (id("b"), SlotRole::Next)]
        );

        let full = ring(&["a", "b", "c"]);
        assert_eq!(full.window().members().len(), 3);
        assert_eq!(full.window().role_of(&id("c")), Some(SlotRole::Prev));
    }

    #[test]
    fn test_manifest_parsing() {
        let json = r#"{
            "streams": [
                {"id": "s1", "stream": {"playbackUrl": "https://x/1.m3u8", "title": "One"}},
                {"id": "s2", "stream": {"playbackUrl": "https://x/2.m3u8"}}
            ]
        }"#;

        let ring = StreamRing::from_manifest_json(json).unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.current().playback_url, "https://x/1.m3u8");
        assert_eq!(ring.current().metadata["title"], "One");
    }

    #[test]
    fn test_manifest_missing_url() {
        let json = r#"{"streams": [{"id": "s1", "stream": {}}]}"#;
        assert!(matches!(
            StreamRing::from_manifest_json(json),
            Err(CarouselError::Manifest(_))
        ));
    }
}
