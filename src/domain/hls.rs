use super::naming::{media_playlist_name, segment_name};
use super::profile::EncodingProfile;
use std::fmt::Write;
use std::ops::RangeInclusive;

pub struct MediaSegment {
    pub duration: u64,
    pub uri: String,
}

/// Rolling-window media playlist for one encoding profile.
pub struct MediaPlaylist {
    pub target_duration: u64,
    pub media_sequence: u64,
    pub segments: Vec<MediaSegment>,
    pub end_list: bool,
}

impl MediaPlaylist {
    pub fn new(target_duration: u64) -> Self {
        Self {
            target_duration,
            media_sequence: 1,
            segments: Vec::new(),
            end_list: false,
        }
    }

    pub fn add_segment(&mut self, duration: u64, uri: String) {
        self.segments.push(MediaSegment { duration, uri });
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("#EXTM3U\n");
        let _ = writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration);
        let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence);

        for segment in &self.segments {
            let _ = writeln!(out, "#EXTINF:{},", segment.duration);
            out.push_str(&segment.uri);
            out.push('\n');
        }

        if self.end_list {
            out.push_str("#EXT-X-ENDLIST\n");
        }

        out.into_bytes()
    }
}

pub struct VariantStream {
    pub bandwidth: u64,
    pub uri: String,
}

/// Multi-variant playlist, one entry per encoding profile.
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::from("#EXTM3U\n");
        for variant in &self.variants {
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={}",
                variant.bandwidth
            );
            out.push_str(&variant.uri);
            out.push('\n');
        }
        out.into_bytes()
    }
}

/// Which segments a rolling playlist lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistWindow {
    pub window_size: u64,
    pub first_segment: u64,
    pub last_segment: u64,
}

impl PlaylistWindow {
    pub fn new(window_size: u64, first_segment: u64, last_segment: u64) -> Self {
        Self {
            window_size,
            first_segment,
            last_segment,
        }
    }

    /// Sequence number announced by `#EXT-X-MEDIA-SEQUENCE`.
    pub fn media_sequence(&self) -> u64 {
        if self.window_size > 0 && self.last_segment >= self.window_size {
            self.last_segment - (self.window_size - 1)
        } else {
            1
        }
    }

    /// Ascending indices in `first_segment..=last_segment` newer than `last_segment - window_size`.
    /// Empty for a zero-sized window.
    pub fn indices(&self) -> RangeInclusive<u64> {
        if self.window_size == 0 {
            return RangeInclusive::new(1, 0);
        }
        let oldest_in_window = self.last_segment.saturating_sub(self.window_size - 1);
        self.first_segment.max(oldest_in_window)..=self.last_segment
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_media_playlist(
    window_size: u64,
    segment_duration: u64,
    segment_prefix: &str,
    profile_name: &str,
    url_prefix: &str,
    first_segment: u64,
    last_segment: u64,
    stream_ended: bool,
) -> Vec<u8> {
    let window = PlaylistWindow::new(window_size, first_segment, last_segment);

    let mut playlist = MediaPlaylist::new(segment_duration);
    playlist.media_sequence = window.media_sequence();
    playlist.end_list = stream_ended;
    for index in window.indices() {
        playlist.add_segment(
            segment_duration,
            format!(
                "{}{}",
                url_prefix,
                segment_name(segment_prefix, profile_name, index)
            ),
        );
    }

    playlist.render()
}

pub fn render_master_playlist(
    index_prefix: &str,
    profiles: &[EncodingProfile],
    url_prefix_for_playlists: &str,
) -> Vec<u8> {
    let playlist = MasterPlaylist {
        variants: profiles
            .iter()
            .map(|profile| VariantStream {
                bandwidth: profile.bandwidth,
                uri: format!(
                    "{}{}",
                    url_prefix_for_playlists,
                    media_playlist_name(index_prefix, &profile.name)
                ),
            })
            .collect(),
    };
    playlist.render()
}
