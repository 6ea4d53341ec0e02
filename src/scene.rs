//! Asks the language model for a scene that shows what a word means.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::constants::{
    CHAT_MAX_TOKENS, CHAT_MODEL, CHAT_TEMPERATURE, NO_TEXT_PHRASE, NO_TEXT_SENTENCE,
};
use crate::error::WordImageError;
use crate::openai::{ChatRequest, GenerativeApi, TokenUsage};

/// Keys the model has to answer with
pub const REQUIRED_KEYS: [&str; 4] = [
    "word",
    "scene_description",
    "core_image",
    "illustration_prompt",
];

/// What the language model came up with for one word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneData {
    /// The word as echoed by the model
    pub word: String,
    /// Visual description of the scene
    pub scene_description: String,
    /// The meaning the scene is meant to convey
    pub core_image: String,
    /// Prompt sent to the image model, always ends with the no-text rule
    pub illustration_prompt: String,
    /// Chat call usage
    pub usage: TokenUsage,
}

fn system_prompt(config: &GenerationConfig) -> String {
    format!(
        r#"You help make illustrations for English vocabulary lessons.
Invent a scene that shows the meaning of an English word visually, then write a prompt for drawing it.

Characters: {characters}

Answer in this format:
```json
{{
    "word": "the English word",
    "scene_description": "Detailed description of the scene in {language}: the characters' expressions, actions and background elements",
    "core_image": "The core image of the word in {language}: its essential meaning, where it is used and its emotional nuance. Explain the word itself, not the scene",
    "illustration_prompt": "Illustration prompt in English describing the characters' appearance, expressions, actions and background in detail. It must end with '{rule}'"
}}
```

Rules:
- No speech or written text of any kind
- Express the meaning through the visual scene alone
- Keep the composition simple enough for children
- Show feelings through the characters' expressions and actions
- core_image explains the dictionary meaning of the word, it is not a summary of the scene
- scene_description is rich in visual detail
- illustration_prompt is concrete and detailed English"#,
        characters = config.character_description,
        language = config.explanation_language,
        rule = NO_TEXT_SENTENCE,
    )
}

fn user_prompt(word: &str, context: &str) -> String {
    let mut prompt = format!("English word: {word}");
    if !context.is_empty() {
        prompt.push_str(&format!("\nHint: {context}"));
    }
    prompt.push_str("\n\nDesign a scene that expresses the core image of this word.");
    prompt
}

/// Pulls the JSON body out of a fenced ```json block, or returns the whole reply.
pub fn extract_json_block(content: &str) -> &str {
    const FENCE: &str = "```json";
    if let Some(start) = content.find(FENCE) {
        let body = &content[start + FENCE.len()..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    content.trim()
}

/// Appends the no-text sentence unless the prompt already carries it.
pub fn ensure_no_text_constraint(prompt: &str) -> String {
    if prompt.contains(NO_TEXT_PHRASE) {
        prompt.to_string()
    } else {
        format!("{prompt}\n{NO_TEXT_SENTENCE}")
    }
}

/// Parses and validates the model's reply.
pub fn parse_scene(content: &str, usage: TokenUsage) -> Result<SceneData, WordImageError> {
    let value: Value = serde_json::from_str(extract_json_block(content))?;
    let Value::Object(mut fields) = value else {
        return Err(WordImageError::Validation(
            "scene reply is not a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| fields.get(*key).and_then(Value::as_str).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(WordImageError::Validation(format!(
            "missing required keys: {}",
            missing.join(", ")
        )));
    }

    Ok(SceneData {
        word: take_text(&mut fields, "word"),
        scene_description: take_text(&mut fields, "scene_description"),
        core_image: take_text(&mut fields, "core_image"),
        illustration_prompt: ensure_no_text_constraint(&take_text(
            &mut fields,
            "illustration_prompt",
        )),
        usage,
    })
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    }
}

/// Asks the model for a scene illustrating `word`, with an optional hint.
pub async fn request_scene<A: GenerativeApi>(
    api: &A,
    word: &str,
    context: &str,
    config: &GenerationConfig,
) -> Result<SceneData, WordImageError> {
    info!("Generating scene for {word:?}");
    let request = ChatRequest {
        model: CHAT_MODEL.to_string(),
        system: system_prompt(config),
        user: user_prompt(word, context),
        temperature: CHAT_TEMPERATURE,
        max_tokens: CHAT_MAX_TOKENS,
    };
    let completion = api.chat_completion(&request).await?;
    let scene = parse_scene(&completion.content, completion.usage)?;
    debug!("Scene for {word:?}: {}", scene.scene_description);
    Ok(scene)
}

/// Writes scene data as pretty JSON.
pub async fn save_scene(scene: &SceneData, path: &Path) -> Result<(), WordImageError> {
    let json = serde_json::to_vec_pretty(scene)
        .map_err(|err| WordImageError::InternalServerError(err.to_string()))?;
    tokio::fs::write(path, json).await?;
    info!("Saved scene data to {}", path.display());
    Ok(())
}

/// Reads scene data written by [`save_scene`].
pub async fn load_scene(path: &Path) -> Result<SceneData, WordImageError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
