use serde::Deserialize;

/// A named bitrate variant of the stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncodingProfile {
    pub name: String,
    /// Peak bits per second, announced as `BANDWIDTH` in the master playlist
    pub bandwidth: u64,
}

impl EncodingProfile {
    pub fn new(name: impl Into<String>, bandwidth: u64) -> Self {
        Self {
            name: name.into(),
            bandwidth,
        }
    }
}
