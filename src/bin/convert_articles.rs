use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mydub_backend::convert::{ConvertOptions, DEFAULT_AUTHOR, convert_directory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Convert markdown news articles into JSON documents.
#[derive(Debug, Parser)]
#[command(name = "convert-articles", version)]
struct Args {
    /// Directory containing the markdown articles
    #[arg(long)]
    input: PathBuf,

    /// Directory the JSON documents are written to
    #[arg(long)]
    output: PathBuf,

    /// Manifest file (defaults to <input>/manifest.json)
    #[arg(long)]
    manifest: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_AUTHOR)]
    author: String,

    /// Publication date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let options = ConvertOptions {
        input_dir: args.input,
        output_dir: args.output,
        manifest: args.manifest,
        author: args.author,
        publish_date: args
            .date
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
    };

    match convert_directory(&options) {
        Ok(articles) => {
            tracing::info!(
                "Converted {} articles to HTML and saved as JSON files in {}",
                articles.len(),
                options.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
