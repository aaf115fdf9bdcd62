//! Splitting prompts into segments and joining them back under a length cap.

/// Separator placed between segments in a blended prompt.
pub const SEPARATOR: &str = ", ";

/// Split a prompt on commas, trimming each piece and dropping empty ones.
pub fn split_segments(prompt: &str) -> Vec<&str> {
    prompt
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join segments with [`SEPARATOR`], keeping only whole segments that fit in
/// `max_length` characters.
///
/// Returns the joined text and whether any segment was dropped.
pub fn join_truncated(segments: &[&str], max_length: usize) -> (String, bool) {
    let separator_len = SEPARATOR.chars().count();
    let mut joined = String::new();
    let mut length = 0;

    for (kept, segment) in segments.iter().enumerate() {
        let added = if kept == 0 {
            segment.chars().count()
        } else {
            separator_len + segment.chars().count()
        };
        if length + added > max_length {
            return (joined, true);
        }
        if kept > 0 {
            joined.push_str(SEPARATOR);
        }
        joined.push_str(segment);
        length += added;
    }

    (joined, false)
}
