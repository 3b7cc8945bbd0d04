use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use image_translator_rust::{server, settings};

#[derive(Parser, Debug)]
#[command(
    name = "image-translator-rust",
    version,
    about = "Extract text from images and translate it into a DOCX document"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload form and the /upload endpoint
    Serve {
        /// Listen address (overrides [server] addr)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
    /// Translate a local image once and write the document
    Translate {
        /// Image to translate (png/jpg/jpeg)
        #[arg(short = 'd', long = "data")]
        data: PathBuf,

        /// Target language; repeat or separate with commas
        #[arg(short = 'l', long = "lang", required = true)]
        lang: Vec<String>,

        /// Output document path
        #[arg(short = 'o', long = "out", default_value = server::OUTPUT_FILENAME)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    image_translator_rust::logging::init(cli.verbose)?;

    match cli.command {
        Command::Serve { addr } => {
            let mut settings =
                settings::load_settings(cli.read_settings.as_deref().map(std::path::Path::new))?;
            if let Some(addr) = addr {
                settings.server_addr = addr;
            }
            server::run_server(settings).await
        }
        Command::Translate { data, lang, out } => {
            let config = image_translator_rust::Config {
                image: data,
                languages: lang,
                out: out.clone(),
                settings_path: cli.read_settings,
            };
            let document = image_translator_rust::run(config).await?;
            for page in document.pages() {
                if page.failed {
                    eprintln!("{}", page.body);
                }
            }
            info!("wrote {} page(s) to {}", document.pages().len(), out.display());
            println!("{}", out.display());
            Ok(())
        }
    }
}
