//! Config handling

use std::path::PathBuf;

use tracing::log::LevelFilter;

use crate::constants::{DEFAULT_CHARACTER_DESCRIPTION, DEFAULT_EXPLANATION_LANGUAGE};
use crate::pricing::Quality;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Settings for one generation request, built fresh by each caller.
#[derive(Clone)]
pub struct GenerationConfig {
    /// OpenAI API key used for both calls
    pub api_key: String,
    /// Base character image sent to the image edit endpoint
    pub base_image: PathBuf,
    /// Who is in the base image, woven into the scene prompt
    pub character_description: String,
    /// Requested output quality tier
    pub quality: Quality,
    /// Language for the scene description and core image text
    pub explanation_language: String,
}

impl GenerationConfig {
    /// Config with the default characters, `auto` quality and Japanese explanations.
    pub fn new(api_key: impl Into<String>, base_image: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            base_image: base_image.into(),
            character_description: DEFAULT_CHARACTER_DESCRIPTION.to_string(),
            quality: Quality::Auto,
            explanation_language: DEFAULT_EXPLANATION_LANGUAGE.to_string(),
        }
    }

    /// Replaces the character description
    pub fn with_character_description(mut self, description: impl Into<String>) -> Self {
        self.character_description = description.into();
        self
    }

    /// Replaces the quality tier
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("base_image", &self.base_image)
            .field("character_description", &self.character_description)
            .field("quality", &self.quality)
            .field("explanation_language", &self.explanation_language)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_api_key() {
        let config = GenerationConfig::new("sk-secret", "image/cat_and_mouse.png")
            .with_quality(Quality::High);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("High"));
    }
}
