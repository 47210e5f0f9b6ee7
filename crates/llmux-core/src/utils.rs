//! Utility helpers: data path, log previews, image MIME detection.

use std::path::PathBuf;

/// Get the llmux data directory (e.g. `~/.llmux/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".llmux")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// MIME type for an image reference, from its file extension.
///
/// Query strings and fragments are ignored. Anything unrecognized is
/// treated as JPEG.
pub fn image_mime_type(reference: &str) -> &'static str {
    let path = reference
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or(reference);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
        assert!(result.len() <= 15);
    }

    #[test]
    fn test_truncate_unicode() {
        let result = truncate_string("こんにちは世界です", 5);
        assert_eq!(result, "こん...");
    }

    #[test]
    fn test_image_mime_known_extensions() {
        assert_eq!(image_mime_type("https://cdn.example.com/cat.png"), "image/png");
        assert_eq!(image_mime_type("photo.JPG"), "image/jpeg");
        assert_eq!(image_mime_type("/tmp/anim.gif"), "image/gif");
        assert_eq!(image_mime_type("a.webp?size=large#top"), "image/webp");
    }

    #[test]
    fn test_image_mime_fallback() {
        assert_eq!(image_mime_type("https://cdn.example.com/scan.tiff"), "image/jpeg");
        assert_eq!(image_mime_type("https://cdn.example.com/noext"), "image/jpeg");
        assert_eq!(image_mime_type("https://cdn.example.com.au/pic"), "image/jpeg");
    }

    #[test]
    fn test_data_path_ends_with_llmux() {
        assert!(get_data_path().ends_with(".llmux"));
    }
}
