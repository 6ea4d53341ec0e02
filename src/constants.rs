//! Shared constants/setters for things
//!

use std::time::Duration;

/// The default place generated viewers go
pub const OUTPUT_DIR: &str = "./output";

/// The default place base character images are looked up by the web front end
pub const CHARACTER_DIR: &str = "./image";

/// Subdirectory of the output dir holding generated images
pub const IMAGE_SUBDIR: &str = "images";

/// Suffix shared by every viewer file name
pub const VIEWER_SUFFIX: &str = "_viewer.html";

/// Session index written by the batch CLI
pub const INDEX_FILENAME: &str = "index.html";

/// Base URL for the OpenAI REST API
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used to write the scene and illustration prompt
pub const CHAT_MODEL: &str = "gpt-4o-mini";

/// Model used to edit the base character image
pub const IMAGE_MODEL: &str = "gpt-image-1";

/// Output size requested from the image model
pub const IMAGE_SIZE: &str = "1024x1024";

/// Sampling temperature for the scene request
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Completion cap for the scene request
pub const CHAT_MAX_TOKENS: u32 = 1000;

/// Timeout for downloading an image by URL, the only timed call
pub const IMAGE_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Phrase every illustration prompt has to carry
pub const NO_TEXT_PHRASE: &str = "No text, no words, no dialogue";

/// Sentence appended when [`NO_TEXT_PHRASE`] is missing
pub const NO_TEXT_SENTENCE: &str = "No text, no words, no dialogue.";

/// Default base character image for the web front end, inside [`CHARACTER_DIR`]
pub const DEFAULT_CHARACTER_IMAGE: &str = "cat_and_mouse.png";

/// Default description of the characters in the base image
pub const DEFAULT_CHARACTER_DESCRIPTION: &str = "a cat and a mouse who are good friends";

/// Language the scene and core image explanations are written in
pub const DEFAULT_EXPLANATION_LANGUAGE: &str = "Japanese";
