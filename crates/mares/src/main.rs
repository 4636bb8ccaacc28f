//! Mares CLI - static site generator for a flat-file record archive.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "mares")]
#[command(about = "Static site generator for the mares record archive")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to mares.toml config file
    #[arg(short, long, default_value = "mares.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the site from the archive
    Generate {
        /// Archive directory (defaults to config or "db")
        #[arg(long = "input-db", alias = "db")]
        input_db: Option<PathBuf>,

        /// Output directory (defaults to config or "build")
        #[arg(short = 'o', long)]
        build_dir: Option<PathBuf>,

        /// Template directory (defaults to config or "templates")
        #[arg(short = 't', long)]
        template_dir: Option<PathBuf>,

        /// Static assets directory (defaults to config or "static")
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Run the CSS compiler after generating pages
        #[arg(long)]
        compile_tailwind: bool,
    },

    /// Serve the generated site
    Serve {
        /// Host to bind to (defaults to config or "localhost")
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to config or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory to serve (defaults to config or "build")
        #[arg(short = 'd', long)]
        build_dir: Option<PathBuf>,

        /// Do not reload browsers when files change
        #[arg(long)]
        no_livereload: bool,

        /// Open browser on start
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let file_config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Generate {
            input_db,
            build_dir,
            template_dir,
            static_dir,
            compile_tailwind,
        } => {
            let options = commands::generate::GenerateOptions {
                input_db,
                build_dir,
                template_dir,
                static_dir,
                compile_css: compile_tailwind,
            };
            commands::generate::run(&file_config, options)?;
        }
        Commands::Serve {
            host,
            port,
            build_dir,
            no_livereload,
            open,
        } => {
            let options = commands::serve::ServeOptions {
                host,
                port,
                build_dir,
                live_reload: !no_livereload,
                open,
            };
            commands::serve::run(&file_config, options).await?;
        }
    }

    Ok(())
}
