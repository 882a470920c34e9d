//! File-list helpers.
//!
//! Pure functions over swarm file lists, independent of engine state.

use crate::engine::SwarmFile;

/// Extensions treated as playable video.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "avif", "av1", "mov", "flv", "f4v", "webm", "wmv", "mpeg", "mpg", "mlv",
    "hevc",
];

fn extension(path: &str) -> Option<String> {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether a display path looks like a video file.
pub fn is_video_path(path: &str) -> bool {
    extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// MIME type served for a display path.
pub fn mime_for_path(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("flv") => "video/x-flv",
        Some("wmv") => "video/x-ms-wmv",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        _ => "application/octet-stream",
    }
}

/// All video files in a swarm, in list order.
pub fn video_files(files: &[SwarmFile]) -> Vec<&SwarmFile> {
    files
        .iter()
        .filter(|f| is_video_path(&f.display_path))
        .collect()
}

/// The biggest video file, the usual main-feature heuristic.
pub fn largest_video_file(files: &[SwarmFile]) -> Option<&SwarmFile> {
    video_files(files).into_iter().max_by_key(|f| f.size_bytes)
}

/// Render a byte count as a short human-readable figure.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ["K", "M", "G", "T", "P", "E"][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// Render a rate as bytes-per-second.
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(index: usize, path: &str, size: u64) -> SwarmFile {
        SwarmFile {
            index,
            display_path: path.to_string(),
            size_bytes: size,
        }
    }

    #[test]
    fn test_is_video_path() {
        assert!(is_video_path("Show/Episode 01.mkv"));
        assert!(is_video_path("movie.MP4"));
        assert!(!is_video_path("notes.txt"));
        assert!(!is_video_path("no-extension"));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("a.mp4"), "video/mp4");
        assert_eq!(mime_for_path("a.mkv"), "video/x-matroska");
        assert_eq!(mime_for_path("a.MPG"), "video/mpeg");
        assert_eq!(mime_for_path("a.nfo"), "application/octet-stream");
    }

    #[test]
    fn test_largest_video_file_ignores_extras() {
        let files = vec![
            file(0, "readme.txt", 10_000_000_000),
            file(1, "op.mkv", 50_000_000),
            file(2, "episode.mkv", 700_000_000),
        ];
        let largest = largest_video_file(&files).unwrap();
        assert_eq!(largest.index, 2);
    }

    #[test]
    fn test_largest_video_file_empty() {
        assert!(largest_video_file(&[]).is_none());
        assert!(largest_video_file(&[file(0, "a.txt", 5)]).is_none());
    }

    #[test]
    fn test_video_files_keep_order() {
        let files = vec![
            file(0, "a.mkv", 1),
            file(1, "b.txt", 2),
            file(2, "c.mp4", 3),
        ];
        let videos = video_files(&files);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].index, 0);
        assert_eq!(videos[1].index, 2);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_speed(2048), "2.0 KB/s");
    }
}
