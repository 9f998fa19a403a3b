//! Media root scanning.
//!
//! Walks the media root recursively, picks up files with a configured video
//! extension and derives a display title from the file name (release-name
//! junk stripped).

use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A media file found on disk, not yet part of the catalog.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub title: String,
    /// Relative to the media root.
    pub path: PathBuf,
    pub format: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub parent_dir: Option<String>,
    pub poster: Option<String>,
}

// Bracketed release junk and parenthesized year tags.
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*?\]|\(\d{4}\)").expect("bracket regex is valid")
});

// A release year or quality/source marker; everything from the first such
// token onward is noise, not title.
static JUNK_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((19|20)\d{2}|480p|720p|1080p|2160p|HDTV|DVDRip|BRRip|BluRay|WEBRip|WEB-DL|x264|x265|h264|h265|HEVC)$")
        .expect("junk token regex is valid")
});

/// Scan `media_root` for video files with one of `extensions` (lowercase,
/// without the dot).
pub fn scan_directory(media_root: &Path, extensions: &[String]) -> Vec<ScannedFile> {
    let mut found = Vec::new();

    for entry in WalkDir::new(media_root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let format = ext.to_lowercase();
        if !extensions.iter().any(|e| e == &format) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(media_root) else {
            continue;
        };
        let Ok(metadata) = entry.metadata() else {
            debug!("no metadata for {}", path.display());
            continue;
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let title = clean_title(stem);

        let parent_dir = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|s| s.to_string());

        // Poster images are keyed by the containing directory when the file
        // lives in its own folder, by title otherwise.
        let poster_key = match parent_dir.as_deref() {
            Some(dir) if !dir.eq_ignore_ascii_case("movies") => dir.to_string(),
            _ => title.clone(),
        };

        found.push(ScannedFile {
            title,
            path: relative.to_path_buf(),
            format,
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            parent_dir,
            poster: Some(format!("/movies/thumbnails/{poster_key}.webp")),
        });
    }

    found
}

/// Strip release-name noise from a file stem and normalize separators.
pub fn clean_title(stem: &str) -> String {
    let no_brackets = BRACKETED.replace_all(stem, " ");
    let spaced = no_brackets.replace(['.', '_'], " ");
    let mut words = Vec::new();
    for token in spaced.split_whitespace() {
        if JUNK_TOKEN.is_match(token) {
            break;
        }
        words.push(token);
    }
    if words.is_empty() {
        // Stems that are nothing but a year or marker keep the raw stem.
        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_year_and_quality() {
        assert_eq!(clean_title("The.Matrix.1999.1080p.BluRay"), "The Matrix");
        assert_eq!(clean_title("Inception (2010)"), "Inception");
        assert_eq!(clean_title("Some.Movie.720p.HDTV"), "Some Movie");
        assert_eq!(clean_title("Plain Title"), "Plain Title");
    }

    #[test]
    fn clean_title_strips_bracketed_junk() {
        assert_eq!(clean_title("Movie [x265 rip]"), "Movie");
    }

    #[test]
    fn scan_finds_videos_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Alien")).unwrap();
        std::fs::write(dir.path().join("Alien/Alien.1979.mkv"), b"fake").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a movie").unwrap();
        std::fs::write(dir.path().join("trailer.mp4"), b"fake").unwrap();

        let extensions = vec!["mp4".to_string(), "mkv".to_string()];
        let mut found = scan_directory(dir.path(), &extensions);
        found.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, PathBuf::from("Alien/Alien.1979.mkv"));
        assert_eq!(found[0].title, "Alien");
        assert_eq!(found[0].format, "mkv");
        assert_eq!(found[0].parent_dir.as_deref(), Some("Alien"));
        assert_eq!(found[1].path, PathBuf::from("trailer.mp4"));
    }

    #[test]
    fn scan_records_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), vec![0u8; 128]).unwrap();

        let found = scan_directory(dir.path(), &["mp4".to_string()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].size, 128);
        assert!(found[0].last_modified.is_some());
    }
}
