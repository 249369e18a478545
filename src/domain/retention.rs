use super::naming::segment_name;

/// Name of the segment that falls out of retention once `last_segment` is shipped.
///
/// Returns `None` when `retention_depth` reaches past the start of the stream. Deletion of the
/// returned name is requested whether or not the segment was ever uploaded.
pub fn segment_to_retire(
    last_segment: u64,
    retention_depth: u64,
    segment_prefix: &str,
    profile_name: &str,
) -> Option<String> {
    last_segment
        .checked_sub(retention_depth)
        .map(|index| segment_name(segment_prefix, profile_name, index))
}
