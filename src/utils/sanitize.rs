//! Filename sanitization utilities

/// Sanitize a name for use as a file or directory name
///
/// Keeps only alphanumeric characters, spaces, `-` and `_`. Everything else
/// is dropped (not replaced), and surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("AC/DC: Live! - Band?"), "ACDC Live - Band");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Build the file stem for a track: `"<title> - <artist>"`, sanitized
pub fn track_file_stem(title: &str, artist: &str) -> String {
    sanitize_filename(&format!("{} - {}", title, artist))
}
