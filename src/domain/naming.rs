//! Deterministic destination names for segments and playlists.

/// `<segment_prefix>_<profile>-NNNNN.ts`
pub fn segment_name(segment_prefix: &str, profile_name: &str, index: u64) -> String {
    format!("{}_{}-{:05}.ts", segment_prefix, profile_name, index)
}

/// `<index_prefix>_<profile>.m3u8`
pub fn media_playlist_name(index_prefix: &str, profile_name: &str) -> String {
    format!("{}_{}.m3u8", index_prefix, profile_name)
}

/// `<index_prefix>_multi.m3u8`
pub fn master_playlist_name(index_prefix: &str) -> String {
    format!("{}_multi.m3u8", index_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name_is_zero_padded() {
        assert_eq!(segment_name("stream", "720p", 7), "stream_720p-00007.ts");
        assert_eq!(segment_name("live", "ep_64k", 12345), "live_ep_64k-12345.ts");
    }

    #[test]
    fn test_segment_name_wider_than_padding() {
        assert_eq!(segment_name("s", "p", 123456), "s_p-123456.ts");
    }

    #[test]
    fn test_playlist_names() {
        assert_eq!(media_playlist_name("index", "720p"), "index_720p.m3u8");
        assert_eq!(master_playlist_name("index"), "index_multi.m3u8");
    }
}
