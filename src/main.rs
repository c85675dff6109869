use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use tokio::net::TcpListener;

use sshelf::core::config::{self, CliOverrides};
use sshelf::core::library::DirectorySource;
use sshelf::server::shutdown::{self, ShutdownCoordinator};
use sshelf::server::{SessionContext, ssh};
use sshelf::tui::banner::Banner;
use sshelf::tui::keymap::KeyMap;
use sshelf::tui::markdown::MarkdownRenderer;
use sshelf::tui::theme::Theme;

#[derive(Parser)]
#[command(name = "sshelf", about = "Browse a shelf of markdown documents over SSH")]
struct Args {
    /// Config file (default: ./sshelf.toml, then the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of documents to serve
    #[arg(short, long)]
    documents: Option<PathBuf>,

    /// Also write debug-level logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log debug output to the terminal
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(args: &Args) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = &args.log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, log_config, file)),
            Err(e) => eprintln!("Could not open log file {}: {e}", path.display()),
        }
    }
    let _ = CombinedLogger::init(loggers);
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_logging(&args);

    let file_config = config::load_config(args.config.as_deref()).map_err(io::Error::other)?;
    let cli = CliOverrides {
        host: args.host.clone(),
        port: args.port,
        documents: args.documents.clone(),
    };
    let resolved = config::resolve(&file_config, &cli);

    // Art is rendered once and shared; sessions never spawn tools.
    let banner = match Banner::generate(&resolved.banner).await {
        Ok(banner) => Ok(banner),
        Err(e) if resolved.banner.required => {
            error!("Failed to generate banner, sessions will be refused: {e}");
            Err(e)
        }
        Err(e) => {
            warn!("Failed to generate banner, continuing without it: {e}");
            Ok(Banner::default())
        }
    };

    let ctx = Arc::new(SessionContext {
        source: Arc::new(DirectorySource::new(
            resolved.documents_dir.clone(),
            resolved.extension.clone(),
            resolved.header_lines,
        )),
        renderer: Arc::new(MarkdownRenderer),
        theme: Theme::from_accent(&resolved.accent),
        keymap: KeyMap::from_config(&resolved.keys),
        banner,
        title: resolved.title.clone(),
        intro: resolved.intro.clone(),
        markdown_theme: resolved.markdown_theme.clone(),
        header_lines: resolved.header_lines,
    });

    let host_key = ssh::load_or_generate_host_key(&resolved.host_key_path)
        .await
        .map_err(io::Error::other)?;
    let listener = TcpListener::bind((resolved.host.as_str(), resolved.port)).await?;
    info!(
        "Starting SSH server on {}:{} serving {}",
        resolved.host,
        resolved.port,
        resolved.documents_dir.display()
    );

    let coordinator = Arc::new(ShutdownCoordinator::new(resolved.shutdown_timeout));
    let server = tokio::spawn(ssh::serve(
        listener,
        ssh::ssh_config(host_key),
        ctx,
        coordinator.clone(),
    ));

    shutdown::wait_for_signal().await?;
    info!("Stopping SSH server");
    let aborted = coordinator.shutdown().await;
    if aborted > 0 {
        warn!("Aborted {aborted} session(s) still running after the shutdown timeout");
    }
    if let Err(e) = server.await {
        error!("Accept loop ended abnormally: {e}");
    }
    Ok(())
}
