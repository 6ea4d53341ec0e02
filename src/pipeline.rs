//! Runs scene → image → cost → viewer for each word of a batch.
//!
//! Words are processed one at a time in input order. A failing word is
//! recorded as an error result and the batch moves on.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info};

use crate::config::GenerationConfig;
use crate::constants::{IMAGE_MODEL, IMAGE_SIZE};
use crate::cost::{self, CostBreakdown};
use crate::error::WordImageError;
use crate::illustration::request_illustration;
use crate::openai::GenerativeApi;
use crate::outputs::{OutputLayout, sanitize_filename};
use crate::scene::{SceneData, request_scene, save_scene};
use crate::viewer::write_viewer;

/// A word to illustrate, with an optional disambiguating hint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WordRequest {
    /// The word itself
    pub word: String,
    /// Hint such as "to ask urgently", empty when absent
    pub context: String,
}

impl WordRequest {
    /// Request without a hint
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            context: String::new(),
        }
    }
}

/// Parses one `word` or `word#context` line; `None` for blank lines.
pub fn parse_word_line(line: &str) -> Option<WordRequest> {
    let (word, context) = match line.split_once('#') {
        Some((word, context)) => (word.trim(), context.trim()),
        None => (line.trim(), ""),
    };
    if word.is_empty() {
        return None;
    }
    Some(WordRequest {
        word: word.to_string(),
        context: context.to_string(),
    })
}

/// Parses newline separated words, skipping blank lines.
pub fn parse_word_list(raw: &str) -> Vec<WordRequest> {
    raw.lines().filter_map(parse_word_line).collect()
}

/// Files and cost produced for a word.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedWord {
    /// Saved PNG
    pub image_path: PathBuf,
    /// Viewer page
    pub html_path: PathBuf,
    /// Viewer file name, for building `/view/` links
    pub html_filename: String,
    /// Total USD for this word
    pub cost: f64,
    /// Cost details
    pub cost_breakdown: CostBreakdown,
    /// Scene the image was drawn from
    pub scene: SceneData,
}

/// Outcome for one word.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WordOutcome {
    /// Everything was generated
    Success(Box<GeneratedWord>),
    /// Some step failed
    Error {
        /// Error class, see [`WordImageError::kind`]
        error_kind: String,
        /// Human readable message
        error: String,
    },
}

/// Result for one word of a batch.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationResult {
    /// Requested word
    pub word: String,
    /// Requested hint
    pub context: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: WordOutcome,
}

impl GenerationResult {
    /// Whether the word was generated
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, WordOutcome::Success(_))
    }

    /// Cost of the word, zero for failures
    pub fn cost(&self) -> f64 {
        match &self.outcome {
            WordOutcome::Success(generated) => generated.cost,
            WordOutcome::Error { .. } => 0.0,
        }
    }
}

/// Every result of a batch plus the running cost total.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchSummary {
    /// One entry per requested word, in order
    pub results: Vec<GenerationResult>,
    /// Sum of successful word costs
    pub total_cost: f64,
}

impl BatchSummary {
    /// Successful results
    pub fn succeeded(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|result| result.is_success())
    }

    /// Failed results
    pub fn failed(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|result| !result.is_success())
    }
}

/// Drives the generation steps against an API and an output directory.
#[derive(Debug)]
pub struct Pipeline<'a, A> {
    api: &'a A,
    layout: OutputLayout,
    save_scenes: bool,
}

impl<'a, A: GenerativeApi> Pipeline<'a, A> {
    /// Pipeline writing under `layout`
    pub fn new(api: &'a A, layout: OutputLayout) -> Self {
        Self {
            api,
            layout,
            save_scenes: false,
        }
    }

    /// Also write `{word}_scene.json` next to each viewer
    pub fn with_saved_scenes(mut self, save_scenes: bool) -> Self {
        self.save_scenes = save_scenes;
        self
    }

    /// The output layout in use
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Generates scene, image and viewer for a single word.
    pub async fn generate_word(
        &self,
        request: &WordRequest,
        config: &GenerationConfig,
    ) -> Result<GeneratedWord, WordImageError> {
        let word_stem = sanitize_filename(&request.word);
        if word_stem.is_empty() {
            return Err(WordImageError::InvalidField(format!(
                "{:?} can't be used in a file name",
                request.word
            )));
        }
        self.layout.ensure_dirs().await?;

        let scene = request_scene(self.api, &request.word, &request.context, config).await?;
        if self.save_scenes {
            save_scene(&scene, &self.layout.scene_path(&word_stem)).await?;
        }

        let image = request_illustration(
            self.api,
            &word_stem,
            &scene.illustration_prompt,
            config,
            &self.layout.image_dir(),
        )
        .await?;

        let chat_cost = cost::chat_cost(
            &scene.usage.model,
            scene.usage.prompt_tokens,
            scene.usage.completion_tokens,
        );
        let image_cost = cost::image_cost(
            IMAGE_MODEL,
            config.quality,
            IMAGE_SIZE,
            1,
            image.usage.text_tokens,
            image.usage.image_tokens,
            image.usage.output_tokens,
        );
        let cost_breakdown = cost::total_cost(chat_cost, image_cost);

        let html_path = write_viewer(
            &self.layout,
            &word_stem,
            &scene,
            &image.path,
            Some(&cost_breakdown),
        )
        .await?;
        let html_filename = html_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(GeneratedWord {
            image_path: image.path,
            html_path,
            html_filename,
            cost: cost_breakdown.total_cost,
            cost_breakdown,
            scene,
        })
    }

    /// Generates every word in order, recording failures instead of stopping.
    pub async fn run_batch(
        &self,
        requests: &[WordRequest],
        config: &GenerationConfig,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let total = requests.len();
        for (idx, request) in requests.iter().enumerate() {
            info!("[{}/{}] {}", idx + 1, total, request.word);
            let outcome = match self.generate_word(request, config).await {
                Ok(generated) => {
                    summary.total_cost += generated.cost;
                    info!("Finished {:?} (${:.6})", request.word, generated.cost);
                    WordOutcome::Success(Box::new(generated))
                }
                Err(err) => {
                    error!("Failed to generate {:?}: {}", request.word, err);
                    WordOutcome::Error {
                        error_kind: err.kind().to_string(),
                        error: err.to_string(),
                    }
                }
            };
            summary.results.push(GenerationResult {
                word: request.word.clone(),
                context: request.context.clone(),
                outcome,
            });
        }
        summary
    }
}
