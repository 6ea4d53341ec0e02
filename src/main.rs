use clap::Parser;
use tracing::{error, warn};
use word_image_maker::config::setup_logging;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = word_image_maker::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    if !cli.character_dir.is_dir() {
        warn!(
            "Character image directory {} doesn't exist, generation requests will fail",
            cli.character_dir.display()
        );
    }

    if let Err(err) = word_image_maker::web::setup_server(
        &cli.listen_address,
        cli.port,
        cli.output_dir,
        cli.character_dir,
        &cli.openai_base_url,
    )
    .await
    {
        error!("Application error: {}", err);
        std::process::exit(1);
    }
}
