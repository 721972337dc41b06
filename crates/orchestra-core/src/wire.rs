//! Orchestra wire format: the two payloads that cross process boundaries.
//!
//! * `Announcement` is the JSON datagram a musician multicasts every tick.
//! * `ActiveMusician` is one element of the JSON array the auditor writes to
//!   a query client before closing the connection.
//!
//! The instrument table below is the only place sounds and instrument names
//! are paired. Both roles compile it in, so the mapping is identical on each
//! end of the wire.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Multicast group musicians announce on.
pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 22, 5);

/// UDP port announcements are sent to.
pub const MULTICAST_PORT: u16 = 9907;

/// TCP port on which the auditor serves roster snapshots.
pub const QUERY_PORT: u16 = 2205;

/// TCP port of the auditor's HTTP status API.
pub const API_PORT: u16 = 2206;

/// A musician silent for longer than this is no longer active.
pub const STALENESS_SECS: u64 = 5;

/// Period between two announcements from the same musician.
pub const ANNOUNCE_INTERVAL_MS: u64 = 1000;

/// Receive buffer size: the largest UDP payload over IPv4. Announcements are
/// free-form JSON, so nothing shorter is guaranteed to hold one uncut.
pub const MAX_DATAGRAM: usize = 65_507;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed announcement: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("announcement carries an empty uuid")]
    EmptyIdentity,
    #[error("unknown instrument {0:?}")]
    UnknownInstrument(String),
}

// ── Instrument ────────────────────────────────────────────────────────────────

/// The closed set of instruments an orchestra can contain.
///
/// On the wire a musician never names its instrument, it emits the sound
/// the instrument makes. The auditor maps the sound back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Trumpet,
    Flute,
    Violin,
    Drum,
}

/// (instrument, label, sound). Row order follows the enum declaration order.
const INSTRUMENT_TABLE: [(Instrument, &str, &str); 5] = [
    (Instrument::Piano, "piano", "ti-ta-ti"),
    (Instrument::Trumpet, "trumpet", "pouet"),
    (Instrument::Flute, "flute", "trulu"),
    (Instrument::Violin, "violin", "gzi-gzi"),
    (Instrument::Drum, "drum", "boum-boum"),
];

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Piano,
        Instrument::Trumpet,
        Instrument::Flute,
        Instrument::Violin,
        Instrument::Drum,
    ];

    /// Human-readable name, e.g. "piano".
    pub fn label(self) -> &'static str {
        INSTRUMENT_TABLE[self as usize].1
    }

    /// Sound emitted on the wire, e.g. "ti-ta-ti".
    pub fn sound(self) -> &'static str {
        INSTRUMENT_TABLE[self as usize].2
    }

    /// Reverse lookup. An unknown sound is not an error, it just has no instrument.
    pub fn from_sound(sound: &str) -> Option<Self> {
        INSTRUMENT_TABLE
            .iter()
            .find(|(_, _, s)| *s == sound)
            .map(|(instrument, _, _)| *instrument)
    }
}

impl FromStr for Instrument {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        INSTRUMENT_TABLE
            .iter()
            .find(|(_, label, _)| *label == wanted)
            .map(|(instrument, _, _)| *instrument)
            .ok_or_else(|| WireError::UnknownInstrument(s.to_string()))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Announcement ──────────────────────────────────────────────────────────────

/// Presence datagram, multicast by every musician once per interval.
///
/// ```json
/// {"uuid":"aa7d8cb3-a15f-4f06-a0eb-b8feb6244a60","sound":"gzi-gzi","timestamp":"2024-03-12T10:11:12.345Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    /// Stable identity of the announcing musician.
    pub uuid: String,

    /// Sound of the instrument. Missing or unknown sounds still count as a
    /// presence announcement.
    #[serde(default)]
    pub sound: Option<String>,

    /// Emission time on the musician's clock. Encoded as RFC 3339; integer
    /// milliseconds since the epoch are accepted on decode.
    #[serde(deserialize_with = "timestamp_from_wire")]
    pub timestamp: DateTime<Utc>,
}

impl Announcement {
    pub fn new(uuid: impl Into<String>, instrument: Instrument, timestamp: DateTime<Utc>) -> Self {
        Self {
            uuid: uuid.into(),
            sound: Some(instrument.sound().to_string()),
            timestamp,
        }
    }

    /// Instrument behind the announced sound, if the sound is known.
    pub fn instrument(&self) -> Option<Instrument> {
        self.sound.as_deref().and_then(Instrument::from_sound)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let announcement: Announcement = serde_json::from_slice(bytes)?;
        if announcement.uuid.trim().is_empty() {
            return Err(WireError::EmptyIdentity);
        }
        Ok(announcement)
    }
}

fn timestamp_from_wire<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(DateTime<Utc>),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        RawTimestamp::Text(t) => Ok(t),
    }
}

// ── Query response ────────────────────────────────────────────────────────────

/// One musician in a roster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMusician {
    pub uuid: String,
    /// `null` when the musician announced a sound we do not know.
    pub instrument: Option<Instrument>,
    /// Timestamp of the most recent announcement.
    #[serde(rename = "activeSince")]
    pub active_since: DateTime<Utc>,
}
