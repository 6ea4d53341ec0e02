//! Output directory layout and listing of generated viewers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::constants::{IMAGE_SUBDIR, INDEX_FILENAME, VIEWER_SUFFIX};
use crate::error::WordImageError;

/// Where generated files are written.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    output_dir: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory holding viewers and the session index
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding generated images
    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGE_SUBDIR)
    }

    /// Viewer path for a word; the same word always maps to the same file
    pub fn viewer_path(&self, word_stem: &str) -> PathBuf {
        self.output_dir.join(viewer_filename(word_stem))
    }

    /// Scene JSON path for a word
    pub fn scene_path(&self, word_stem: &str) -> PathBuf {
        self.output_dir.join(format!("{word_stem}_scene.json"))
    }

    /// Session index path
    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILENAME)
    }

    /// Creates the output and image directories
    pub async fn ensure_dirs(&self) -> Result<(), WordImageError> {
        tokio::fs::create_dir_all(self.image_dir()).await?;
        Ok(())
    }
}

/// `{word}_viewer.html`
pub fn viewer_filename(word_stem: &str) -> String {
    format!("{word_stem}{VIEWER_SUFFIX}")
}

/// Reduces a user supplied name to a single safe path component.
///
/// Keeps ASCII letters, digits, `-`, `_` and `.`; whitespace and path
/// separators become `_`; leading and trailing dots/underscores are dropped.
/// May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for part in name
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
    {
        if !cleaned.is_empty() {
            cleaned.push('_');
        }
        cleaned.extend(
            part.chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')),
        );
    }
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// One generated viewer on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputFileEntry {
    /// Viewer file name
    pub filename: String,
    /// Word the viewer was generated for
    pub word: String,
    /// Local modification time, `%Y-%m-%d %H:%M:%S`
    pub modified: String,
    /// Path the web front end serves it under
    pub url: String,
}

/// Lists `*_viewer.html` files in `output_dir`, newest first.
pub async fn list_output_files(output_dir: &Path) -> Result<Vec<OutputFileEntry>, WordImageError> {
    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut found: Vec<(SystemTime, OutputFileEntry)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Some(word) = filename.strip_suffix(VIEWER_SUFFIX).map(str::to_owned) else {
            continue;
        };
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let modified = DateTime::<Local>::from(modified_at)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        found.push((
            modified_at,
            OutputFileEntry {
                url: format!("/view/{filename}"),
                filename,
                word,
                modified,
            },
        ));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.filename.cmp(&b.1.filename)));
    Ok(found.into_iter().map(|(_, entry)| entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("beg_viewer.html"), "beg_viewer.html");
        assert_eq!(sanitize_filename("ice cream"), "ice_cream");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename("café"), "caf");
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("out");
        assert_eq!(layout.image_dir(), PathBuf::from("out/images"));
        assert_eq!(layout.viewer_path("beg"), PathBuf::from("out/beg_viewer.html"));
        assert_eq!(layout.index_path(), PathBuf::from("out/index.html"));
    }

    #[tokio::test]
    async fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let listed = list_output_files(&dir.path().join("nope"))
            .await
            .expect("list");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn lists_viewers_newest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let older = dir.path().join("beg_viewer.html");
        let newer = dir.path().join("hello_viewer.html");
        std::fs::write(&older, "old").expect("write");
        std::fs::write(&newer, "new").expect("write");
        std::fs::write(dir.path().join("index.html"), "index").expect("write");
        std::fs::create_dir(dir.path().join("images")).expect("mkdir");

        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&older)
            .and_then(|file| file.set_modified(past))
            .expect("set mtime");

        let listed = list_output_files(dir.path()).await.expect("list");
        let words: Vec<&str> = listed.iter().map(|entry| entry.word.as_str()).collect();
        assert_eq!(words, vec!["hello", "beg"]);
        assert_eq!(listed[0].url, "/view/hello_viewer.html");
        assert_eq!(listed[1].filename, "beg_viewer.html");
    }
}
