use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treedrop::batch::PendingFile;
use treedrop::config::ClientConfig;
use treedrop::download::DownloadTracker;
use treedrop::listing::{self, ListingView};
use treedrop::transport::HttpClient;
use treedrop::tree::{is_search_active, TreeBrowser};
use treedrop::upload::{DeliveryMode, UploadController, UploadMode, UploadSequencer};
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(name = "treedrop", version, about = "Upload, browse and download file transfers")]
struct Cli {
    /// Backend base URL (overrides TREEDROP_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a directory, or loose files with --files
    Upload(UploadArgs),
    /// Print the file tree of a transfer
    Browse(BrowseArgs),
    /// Save a transfer as <id>.zip
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
struct UploadArgs {
    /// Directory to upload, or files when --files is set
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Upload the given paths as loose files in a single request
    #[arg(long)]
    files: bool,

    /// Recipient address (repeatable)
    #[arg(long = "email", value_name = "ADDRESS")]
    emails: Vec<String>,

    /// Print a shareable link instead of emailing recipients
    #[arg(long, conflicts_with = "emails")]
    link: bool,
}

#[derive(Debug, Args)]
struct BrowseArgs {
    /// Transfer id
    id: String,

    /// Only show entries matching this text (3+ characters)
    #[arg(long)]
    search: Option<String>,

    /// Expand every directory
    #[arg(long)]
    open_all: bool,
}

#[derive(Debug, Args)]
struct DownloadArgs {
    /// Transfer id
    id: String,

    /// Destination directory (overrides TREEDROP_DOWNLOAD_DIR)
    #[arg(long)]
    dest: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url.clone() {
        config.api_url = api_url;
    }
    config.validate()?;

    treedrop::logging::init(&config.log_level);
    treedrop::metrics::init_metrics();

    let client = HttpClient::from_config(&config)?;
    tracing::debug!(api_url = client.base_url(), "Client ready");

    match cli.command {
        Command::Upload(args) => upload(client, &config, args).await,
        Command::Browse(args) => browse(client, args).await,
        Command::Download(args) => {
            let dest = args.dest.unwrap_or_else(|| config.download_dir.clone());
            download(client, &args.id, dest).await
        }
    }
}

async fn upload(client: HttpClient, config: &ClientConfig, args: UploadArgs) -> Result<()> {
    let mode = if args.files {
        UploadMode::Files
    } else {
        UploadMode::Directory
    };
    let files = match mode {
        UploadMode::Files => collect_flat(&args.paths).await?,
        UploadMode::Directory => match args.paths.as_slice() {
            [root] => collect_directory(root).await?,
            _ => bail!("Directory mode takes exactly one directory"),
        },
    };

    let sequencer = UploadSequencer::from_config(Arc::new(client), config)?;
    let mut controller = UploadController::new(sequencer);
    controller.set_mode(mode);
    controller.set_delivery(if args.link {
        DeliveryMode::Link
    } else {
        DeliveryMode::Email
    });
    for email in &args.emails {
        controller.set_recipient_input(email.as_str());
        if let Err(e) = controller.commit_recipient() {
            bail!("{}: {}", e.user_message(), email);
        }
    }

    controller.select(files);
    if let Some(summary) = controller.selection().summary() {
        println!("{summary}");
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    if let Some(mut rx) = controller.sequencer().take_progress_receiver() {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                bar.set_position(update.progress_percent as u64);
                let batch = update.batch.min(update.total_batches);
                bar.set_message(format!("batch {}/{}", batch, update.total_batches));
            }
        });
    }

    match controller.submit().await {
        Ok(outcome) => {
            bar.finish_and_clear();
            println!("{}", outcome.message);
            if let Some(link) = controller.share_link() {
                println!("Share link: {link}");
            }
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            tracing::debug!("Submit error: {:?}", e);
            bail!(controller.message().unwrap_or("Error uploading files").to_string())
        }
    }
}

async fn collect_flat(paths: &[PathBuf]) -> Result<Vec<PendingFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_file() {
            bail!("{} is not a file", path.display());
        }
        if path.file_name().is_none() {
            bail!("{} has no file name", path.display());
        }
        let len = file_len(path).await?;
        files.push(PendingFile::on_disk("", path.clone(), len));
    }
    Ok(files)
}

/// Walk `root`, keying each file by a `/`-separated path that starts with the root's own name
async fn collect_directory(root: &Path) -> Result<Vec<PendingFile>> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    let root_name = root
        .canonicalize()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root)?;
        let mut segments = vec![root_name.clone()];
        segments.extend(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );
        segments.retain(|s| !s.is_empty());

        let len = file_len(entry.path()).await?;
        files.push(PendingFile::on_disk(segments.join("/"), entry.path(), len));
    }
    Ok(files)
}

async fn file_len(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(metadata.len())
}

async fn browse(client: HttpClient, args: BrowseArgs) -> Result<()> {
    let mut browser = match listing::load(&client, &args.id).await {
        ListingView::Ready(browser) => browser,
        ListingView::Empty => {
            println!("No data");
            return Ok(());
        }
        ListingView::Redirect(location) => bail!("Transfer unavailable: {location}"),
    };

    if let Some(query) = &args.search {
        browser.set_query(query.as_str());
    }
    if args.open_all || is_search_active(browser.query()) {
        browser.open_all();
    }

    print_tree(&browser);
    Ok(())
}

fn print_tree(browser: &TreeBrowser) {
    for row in browser.visible_rows() {
        let indent = "  ".repeat(row.depth);
        if row.node.is_directory() {
            let marker = if row.is_open { "v" } else { ">" };
            println!("{indent}{marker} {}/", row.node.name);
        } else {
            let size = row.node.size.as_deref().unwrap_or("");
            println!("{indent}  {} {size}", row.node.name);
        }
    }

    let summary = browser.summary();
    println!(
        "\n{} files shown, {} files in transfer ({})",
        browser.displayed_file_count(),
        summary.number_of_files,
        summary.total_size
    );
}

async fn download(client: HttpClient, id: &str, dest: PathBuf) -> Result<()> {
    tokio::fs::create_dir_all(&dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let tracker = DownloadTracker::new(Arc::new(client), dest);
    let bar = ProgressBar::new_spinner();
    if let Some(mut rx) = tracker.take_receiver() {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                match progress.total {
                    Some(total) => {
                        bar.set_length(total);
                        bar.set_position(progress.loaded);
                    }
                    None => bar.set_message(format!("{} bytes", progress.loaded)),
                }
            }
        });
    }

    let path = tracker.download(id).await;
    bar.finish_and_clear();
    let path = path?;
    println!("Saved {}", path.display());
    Ok(())
}
