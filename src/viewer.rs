//! Static HTML pages for generated words.

use std::path::{Path, PathBuf};
use std::process::Command;

use askama::Template;
use chrono::Local;
use tracing::{info, warn};

use crate::constants::IMAGE_SUBDIR;
use crate::cost::{CostBreakdown, format_cost_display};
use crate::error::WordImageError;
use crate::outputs::{OutputLayout, viewer_filename};
use crate::scene::SceneData;

#[derive(Template)]
#[template(path = "viewer.html")]
struct ViewerTemplate<'a> {
    word: &'a str,
    scene_description: &'a str,
    core_image: &'a str,
    illustration_prompt: &'a str,
    image_src: String,
    has_cost: bool,
    cost_display: String,
    generated_at: String,
}

struct IndexLink {
    href: String,
    word: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    links: Vec<IndexLink>,
}

/// Image path as seen from a viewer in the output directory, always `/`-separated.
fn relative_image_src(image_path: &Path, output_dir: &Path) -> String {
    match image_path.strip_prefix(output_dir) {
        Ok(relative) => relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => {
            let name = image_path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            format!("{IMAGE_SUBDIR}/{name}")
        }
    }
}

/// Renders the viewer page for one word.
pub fn render_viewer_html(
    scene: &SceneData,
    image_src: &str,
    cost: Option<&CostBreakdown>,
) -> Result<String, WordImageError> {
    Ok(ViewerTemplate {
        word: &scene.word,
        scene_description: &scene.scene_description,
        core_image: &scene.core_image,
        illustration_prompt: &scene.illustration_prompt,
        image_src: image_src.to_string(),
        has_cost: cost.is_some(),
        cost_display: cost.map(format_cost_display).unwrap_or_default(),
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
    .render()?)
}

/// Writes `{word}_viewer.html`, replacing any earlier viewer for the same word.
pub async fn write_viewer(
    layout: &OutputLayout,
    word_stem: &str,
    scene: &SceneData,
    image_path: &Path,
    cost: Option<&CostBreakdown>,
) -> Result<PathBuf, WordImageError> {
    let image_src = relative_image_src(image_path, layout.output_dir());
    let html = render_viewer_html(scene, &image_src, cost)?;
    let path = layout.viewer_path(word_stem);
    tokio::fs::write(&path, html).await.map_err(|err| {
        WordImageError::FileIo(format!("Failed to write {}: {err}", path.display()))
    })?;
    info!("Wrote viewer {}", path.display());
    Ok(path)
}

/// Writes `index.html` linking to the viewers of `word_stems`.
pub async fn write_index(
    layout: &OutputLayout,
    word_stems: &[String],
) -> Result<PathBuf, WordImageError> {
    let links = word_stems
        .iter()
        .map(|stem| IndexLink {
            href: viewer_filename(stem),
            word: stem.clone(),
        })
        .collect();
    let html = IndexTemplate { links }.render()?;
    let path = layout.index_path();
    tokio::fs::write(&path, html).await?;
    info!("Wrote index {}", path.display());
    Ok(path)
}

/// Opens a local HTML file in the default browser. Failures are only logged.
pub fn open_in_browser(path: &Path) {
    let url = match path
        .canonicalize()
        .ok()
        .and_then(|absolute| url::Url::from_file_path(absolute).ok())
    {
        Some(url) => url,
        None => {
            warn!("Can't build a file URL for {}", path.display());
            return;
        }
    };

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };
    match command.arg(url.as_str()).spawn() {
        Ok(_) => info!("Opened {url} in the browser"),
        Err(err) => warn!("Couldn't open a browser ({err}), open {url} manually"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{chat_cost, image_cost, total_cost};
    use crate::openai::TokenUsage;
    use crate::pricing::Quality;

    fn scene() -> SceneData {
        SceneData {
            word: "beg".to_string(),
            scene_description: "The mouse <kneels> before the cat".to_string(),
            core_image: "To ask earnestly".to_string(),
            illustration_prompt: "A mouse kneels.\nNo text, no words, no dialogue.".to_string(),
            usage: TokenUsage::default(),
        }
    }

    #[test]
    fn viewer_embeds_scene_and_escapes_text() {
        let html = render_viewer_html(&scene(), "images/beg_20250711_120000.png", None)
            .expect("render");
        assert!(html.contains("Word Image Maker - beg"));
        assert!(html.contains("images/beg_20250711_120000.png"));
        assert!(html.contains("&lt;kneels&gt;"));
        assert!(!html.contains("<kneels>"));
        assert!(!html.contains("Generation cost"));
    }

    #[test]
    fn viewer_includes_cost_section_when_given() {
        let breakdown = total_cost(
            chat_cost("gpt-4o-mini", 500, 200),
            image_cost("gpt-image-1", Quality::Auto, "1024x1024", 1, 40, 300, 1056),
        );
        let html = render_viewer_html(&scene(), "images/beg.png", Some(&breakdown))
            .expect("render");
        assert!(html.contains("Generation cost"));
        assert!(html.contains("- Total: $"));
    }

    #[test]
    fn image_src_is_relative_to_output_dir() {
        let output = Path::new("out");
        assert_eq!(
            relative_image_src(Path::new("out/images/beg_1.png"), output),
            "images/beg_1.png"
        );
        assert_eq!(
            relative_image_src(Path::new("/elsewhere/beg_1.png"), output),
            "images/beg_1.png"
        );
    }

    #[tokio::test]
    async fn index_links_every_viewer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = OutputLayout::new(dir.path());
        let path = write_index(&layout, &["beg".to_string(), "hello".to_string()])
            .await
            .expect("index");
        let html = std::fs::read_to_string(path).expect("read");
        assert!(html.contains(r#"href="beg_viewer.html""#));
        assert!(html.contains(r#"href="hello_viewer.html""#));
    }
}
