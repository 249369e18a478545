use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Reserved wire token for [`Command::Quit`].
pub const QUIT_TOKEN: &str = "quit";
/// Reserved wire token for [`Command::BuildMultiVariantIndex`].
pub const MULTI_VARIANT_TOKEN: &str = "multi";

static SHIP_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*,\s*(\d+)\s*,\s*([01])\s*,\s*(\S+)\s*$")
        .expect("ship segment pattern is valid")
});

/// A unit of work for the transfer worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stops the worker once every command queued before it has been processed.
    Quit,
    /// Render and ship the multi-variant playlist.
    BuildMultiVariantIndex,
    /// Ship segment `last_segment` and refresh its profile's media playlist.
    ShipSegment(SegmentCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand {
    /// First segment index of the stream, the lower clamp of the playlist window
    pub first_segment: u64,
    /// Newest finished segment
    pub last_segment: u64,
    /// Stream is over; the playlist gets an end marker
    pub stream_ended: bool,
    /// Encoding profile the segment belongs to
    pub profile_name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Malformed command: {0:?}")]
    Malformed(String),

    #[error("Segment index out of range in {0:?}")]
    IndexOutOfRange(String),
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CommandParseError::Empty);
        }
        if trimmed.eq_ignore_ascii_case(QUIT_TOKEN) {
            return Ok(Command::Quit);
        }
        if trimmed.eq_ignore_ascii_case(MULTI_VARIANT_TOKEN) {
            return Ok(Command::BuildMultiVariantIndex);
        }

        let caps = SHIP_SEGMENT_RE
            .captures(trimmed)
            .ok_or_else(|| CommandParseError::Malformed(trimmed.to_string()))?;
        let index = |i: usize| {
            caps[i]
                .parse::<u64>()
                .map_err(|_| CommandParseError::IndexOutOfRange(trimmed.to_string()))
        };

        Ok(Command::ShipSegment(SegmentCommand {
            first_segment: index(1)?,
            last_segment: index(2)?,
            stream_ended: &caps[3] == "1",
            profile_name: caps[4].to_string(),
        }))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Quit => f.write_str(QUIT_TOKEN),
            Command::BuildMultiVariantIndex => f.write_str(MULTI_VARIANT_TOKEN),
            Command::ShipSegment(seg) => write!(
                f,
                "{},{},{},{}",
                seg.first_segment,
                seg.last_segment,
                u8::from(seg.stream_ended),
                seg.profile_name
            ),
        }
    }
}
