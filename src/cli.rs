//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{CHARACTER_DIR, OPENAI_API_BASE, OUTPUT_DIR};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "WORDIMAGE_DEBUG")]
    /// Enable debug logging. Env: WORDIMAGE_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "WORDIMAGE_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: WORDIMAGE_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "WORDIMAGE_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: WORDIMAGE_LISTEN_ADDRESS
    pub listen_address: String,
    #[clap(long, short, default_value = OUTPUT_DIR, env = "WORDIMAGE_OUTPUT_DIR")]
    /// Where viewers and images are written.
    /// Env: WORDIMAGE_OUTPUT_DIR
    pub output_dir: PathBuf,
    #[clap(long, short, default_value = CHARACTER_DIR, env = "WORDIMAGE_CHARACTER_DIR")]
    /// Directory holding the base character images picked by `character_image`.
    /// Env: WORDIMAGE_CHARACTER_DIR
    pub character_dir: PathBuf,
    #[clap(long, default_value = OPENAI_API_BASE, env = "WORDIMAGE_OPENAI_BASE_URL")]
    /// OpenAI compatible API base, eg for a proxy.
    /// Env: WORDIMAGE_OPENAI_BASE_URL
    pub openai_base_url: String,
}
