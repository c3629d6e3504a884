//! Assets command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ConfigLoader;
use crate::storage::{FileEntry, PlaceholderStorage, ProgressCallback, ReportStorage, StaticAssets};

/// Static asset subcommands
#[derive(Subcommand, Debug)]
pub enum AssetsSubcommand {
    /// Show the release descriptor of the static assets
    Release {
        /// Static asset directory (defaults to storage.staticDir)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Publish a report together with the static assets
    Publish {
        /// Report identifier
        report_id: String,
        /// Report files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Static asset directory (defaults to storage.staticDir)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

/// Handle assets subcommands
pub async fn handle_assets_command(cmd: AssetsSubcommand) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;

    match cmd {
        AssetsSubcommand::Release { static_dir } => {
            let dir = static_dir.unwrap_or(config.storage.static_dir);
            let assets = StaticAssets::scan(&dir)?;

            println!("Release: {}", assets.release());
            println!(
                "Files: {} ({} bytes) in {}",
                assets.files().len(),
                assets.total_bytes(),
                assets.dir().display()
            );
        }
        AssetsSubcommand::Publish {
            report_id,
            files,
            static_dir,
        } => {
            let dir = static_dir.unwrap_or(config.storage.static_dir);
            let storage = PlaceholderStorage::new(&dir, &config.storage.base_url)?;

            let entries = files
                .iter()
                .map(|path| read_report_file(path))
                .collect::<Result<Vec<_>>>()?;

            let mut show_progress = |percent: u8| {
                eprint!("\rUploading... {:>3}%", percent);
                let _ = std::io::stderr().flush();
            };
            let progress: ProgressCallback<'_> = &mut show_progress;
            let url = storage
                .save_report_files(&report_id, &entries, Some(progress))
                .await?;
            eprintln!();

            println!("{}", url);
        }
    }

    Ok(())
}

/// Read a report file, keyed by its file name
fn read_report_file(path: &Path) -> Result<FileEntry> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read report file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", path.display()))?;
    Ok(FileEntry::new(name, data))
}
