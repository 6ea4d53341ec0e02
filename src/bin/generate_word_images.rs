use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::warn;
use word_image_maker::config::{GenerationConfig, setup_logging};
use word_image_maker::constants::{
    CHARACTER_DIR, DEFAULT_CHARACTER_DESCRIPTION, DEFAULT_CHARACTER_IMAGE, OUTPUT_DIR,
};
use word_image_maker::illustration::image_info;
use word_image_maker::openai::OpenAiClient;
use word_image_maker::outputs::{OutputLayout, sanitize_filename};
use word_image_maker::pipeline::{
    BatchSummary, Pipeline, WordOutcome, WordRequest, parse_word_line, parse_word_list,
};
use word_image_maker::pricing::Quality;
use word_image_maker::viewer::{open_in_browser, write_index};

/// Illustrate English words with the base characters acting out their meaning.
///
///   generate_word_images beg "lead#to guide someone"
#[derive(Parser, Debug)]
#[command(name = "generate_word_images")]
struct Args {
    /// Words to illustrate, `word#hint` adds a disambiguating hint
    words: Vec<String>,

    /// File with one word (or `word#hint`) per line
    #[arg(long)]
    words_file: Option<PathBuf>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base character image to redraw
    #[arg(long, default_value_t = default_base_image())]
    base_image: String,

    /// Don't open the result in a browser
    #[arg(long)]
    no_browser: bool,

    /// Image quality: auto, low, medium or high
    #[arg(long, default_value = "auto")]
    quality: Quality,

    /// Who is in the base image
    #[arg(long, default_value = DEFAULT_CHARACTER_DESCRIPTION)]
    character_description: String,

    /// Where viewers and images are written
    #[arg(long, default_value = OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Also write `{word}_scene.json` for each word
    #[arg(long)]
    save_scene: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn default_base_image() -> String {
    PathBuf::from(CHARACTER_DIR)
        .join(DEFAULT_CHARACTER_IMAGE)
        .display()
        .to_string()
}

async fn collect_words(args: &Args) -> Result<Vec<WordRequest>> {
    let mut words: Vec<WordRequest> = args
        .words
        .iter()
        .filter_map(|word| parse_word_line(word))
        .collect();
    if let Some(path) = &args.words_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read words file {}", path.display()))?;
        words.extend(parse_word_list(&raw));
    }
    Ok(words)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!(
        "Done: {} succeeded, {} failed",
        summary.succeeded().count(),
        summary.failed().count()
    );
    for result in &summary.results {
        match &result.outcome {
            WordOutcome::Success(generated) => {
                println!(
                    "  ok    {:<20} ${:.6}  {}",
                    result.word,
                    generated.cost,
                    generated.html_path.display()
                );
                match image_info(&generated.image_path) {
                    Ok(info) => println!(
                        "        {}x{} {} {}",
                        info.width,
                        info.height,
                        info.format,
                        human_size(info.file_size)
                    ),
                    Err(err) => warn!("Couldn't read {}: {}", generated.image_path.display(), err),
                }
            }
            WordOutcome::Error { error, .. } => {
                println!("  error {:<20} {}", result.word, error);
            }
        }
    }
    println!("Total cost: ${:.6}", summary.total_cost);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if setup_logging(args.debug).is_err() {
        bail!("Failed to set up logging");
    }

    let words = collect_words(&args).await?;
    if words.is_empty() {
        bail!("No words given, pass them as arguments or with --words-file");
    }
    let Some(api_key) = args.openai_api_key.as_deref().filter(|key| !key.trim().is_empty())
    else {
        bail!("An OpenAI API key is required, use --openai-api-key or OPENAI_API_KEY");
    };
    let base_image = PathBuf::from(&args.base_image);
    if !base_image.is_file() {
        bail!("Base image {} not found", base_image.display());
    }

    let config = GenerationConfig::new(api_key.trim(), base_image)
        .with_quality(args.quality)
        .with_character_description(args.character_description.as_str());
    let client = OpenAiClient::new(reqwest::Client::new(), config.api_key.as_str());
    let pipeline = Pipeline::new(&client, OutputLayout::new(&args.output_dir))
        .with_saved_scenes(args.save_scene);

    println!("Generating {} word(s)", words.len());
    let summary = pipeline.run_batch(&words, &config).await;
    print_summary(&summary);

    let generated: Vec<_> = summary
        .succeeded()
        .filter_map(|result| match &result.outcome {
            WordOutcome::Success(generated) => Some((result, generated)),
            WordOutcome::Error { .. } => None,
        })
        .collect();

    let to_open = match generated.as_slice() {
        [] => None,
        [(_, only)] if words.len() == 1 => Some(only.html_path.clone()),
        many => {
            let stems: Vec<String> = many
                .iter()
                .map(|(result, _)| sanitize_filename(&result.word))
                .collect();
            let index = write_index(pipeline.layout(), &stems)
                .await
                .context("Failed to write the index page")?;
            println!("Index: {}", index.display());
            Some(index)
        }
    };

    if let Some(path) = to_open
        && !args.no_browser
    {
        open_in_browser(&path);
    }
    Ok(())
}
