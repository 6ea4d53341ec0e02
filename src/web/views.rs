use std::path::PathBuf;

use axum::extract::{FromRequest, Multipart};
use axum::http::header::CONTENT_TYPE;
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::prelude::*;
use crate::config::GenerationConfig;
use crate::constants::{DEFAULT_CHARACTER_DESCRIPTION, DEFAULT_CHARACTER_IMAGE};
use crate::openai::OpenAiClient;
use crate::outputs::OutputFileEntry;
use crate::pipeline::{GenerationResult, Pipeline, parse_word_list};
use crate::pricing::Quality;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) has_files: bool,
    pub(crate) output_files: Vec<OutputFileEntry>,
}

/// handles the / GET
pub(crate) async fn root_handler(
    State(state): State<AppState>,
) -> Result<HomeTemplate, WordImageError> {
    let output_files = list_output_files(state.layout.output_dir()).await?;
    Ok(HomeTemplate {
        has_files: !output_files.is_empty(),
        output_files,
    })
}

/// Form posted to `/generate`, every field optional so we can answer with our own errors.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateForm {
    api_key: Option<String>,
    words: Option<String>,
    quality: Option<String>,
    character_image: Option<String>,
    character_description: Option<String>,
}

/// Trimmed field value, `None` when absent or blank
fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty())
}

impl GenerateForm {
    /// Reads the form from either a urlencoded or a `multipart/form-data` body.
    async fn from_body(request: Request) -> Result<Self, WordImageError> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| {
                value
                    .trim_start()
                    .to_ascii_lowercase()
                    .starts_with("multipart/form-data")
            });
        if !is_multipart {
            let Form(form) = Form::<Self>::from_request(request, &())
                .await
                .map_err(|err| WordImageError::InvalidField(err.body_text()))?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|err| WordImageError::InvalidField(err.body_text()))?;
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| WordImageError::InvalidField(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let slot = match name.as_str() {
                "api_key" => &mut form.api_key,
                "words" => &mut form.words,
                "quality" => &mut form.quality,
                "character_image" => &mut form.character_image,
                "character_description" => &mut form.character_description,
                _ => continue,
            };
            let value = field
                .text()
                .await
                .map_err(|err| WordImageError::InvalidField(err.body_text()))?;
            *slot = Some(value);
        }
        Ok(form)
    }

    /// Builds the per-request config and the base image location.
    fn generation_config(
        &self,
        character_dir: &std::path::Path,
    ) -> Result<GenerationConfig, WordImageError> {
        let api_key = non_blank(self.api_key.as_ref())
            .ok_or(WordImageError::MissingField("API Key is required"))?;
        let quality = match non_blank(self.quality.as_ref()) {
            Some(quality) => quality.parse::<Quality>()?,
            None => Quality::default(),
        };
        let image_name = non_blank(self.character_image.as_ref())
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_CHARACTER_IMAGE.to_string());
        let description = non_blank(self.character_description.as_ref())
            .unwrap_or(DEFAULT_CHARACTER_DESCRIPTION);

        Ok(GenerationConfig::new(api_key, character_dir.join(image_name))
            .with_quality(quality)
            .with_character_description(description))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    success: bool,
    results: Vec<GenerationResult>,
    total_cost: f64,
    output_files: Vec<OutputFileEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutputsResponse {
    output_files: Vec<OutputFileEntry>,
}

/// handles the /generate POST, urlencoded or multipart
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerateResponse>, WordImageError> {
    let form = GenerateForm::from_body(request).await?;
    if non_blank(form.api_key.as_ref()).is_none() {
        return Err(WordImageError::MissingField("API Key is required"));
    }
    let words = non_blank(form.words.as_ref())
        .map(parse_word_list)
        .filter(|words| !words.is_empty())
        .ok_or(WordImageError::MissingField("Words are required"))?;
    let config = form.generation_config(&state.character_dir)?;
    info!(
        "Generating {} word(s) with {} as the base image",
        words.len(),
        config.base_image.display()
    );

    let client =
        OpenAiClient::with_base_url(state.http.clone(), &state.openai_base_url, &config.api_key);
    let summary = Pipeline::new(&client, state.layout.clone())
        .run_batch(&words, &config)
        .await;
    let output_files = match list_output_files(state.layout.output_dir()).await {
        Ok(files) => files,
        Err(err) => {
            warn!("Couldn't list generated files after the batch: {}", err);
            Vec::new()
        }
    };

    Ok(Json(GenerateResponse {
        success: true,
        results: summary.results,
        total_cost: summary.total_cost,
        output_files,
    }))
}

/// handles the /outputs GET
pub(crate) async fn outputs_handler(
    State(state): State<AppState>,
) -> Result<Json<OutputsResponse>, WordImageError> {
    let output_files = list_output_files(state.layout.output_dir()).await?;
    Ok(Json(OutputsResponse { output_files }))
}

/// Resolves a requested name inside `dir`, or `None` if it doesn't name a file there.
async fn existing_file(dir: PathBuf, requested: &str) -> Option<PathBuf> {
    let name = sanitize_filename(requested);
    if name.is_empty() {
        return None;
    }
    let path = dir.join(name);
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => Some(path),
        _ => None,
    }
}

async fn serve_file(path: PathBuf, request: Request) -> Response {
    debug!("Serving {}", path.display());
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// handles the /view/{filename} GET
pub(crate) async fn view_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, WordImageError> {
    let path = existing_file(state.layout.output_dir().to_path_buf(), &filename)
        .await
        .ok_or_else(|| WordImageError::NotFound("File not found".to_string()))?;
    Ok(serve_file(path, request).await)
}

/// handles the /view/images/{filename} GET
pub(crate) async fn view_image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, WordImageError> {
    let path = existing_file(state.layout.image_dir(), &filename)
        .await
        .ok_or_else(|| WordImageError::NotFound("Image not found".to_string()))?;
    Ok(serve_file(path, request).await)
}
