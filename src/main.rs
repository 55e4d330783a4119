//! bucketflow - batch move/download runner
//!
//! Drives the move and download queues against a directory-backed store,
//! printing progress until the batch drains.

use anyhow::{bail, Result};
use bucketflow::queue::{Job, QueueManager, QueueSnapshot, TaskExecutor, TaskStatus};
use bucketflow::store::LocalStore;
use bucketflow::transfer::{format_bytes, DownloadItem, DownloadQueue, MoveItem, MoveQueue};
use bucketflow::utils::{default_download_dir, settings_path, QueueSettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Run batched object moves and downloads")]
struct Args {
    /// Directory whose sub-directories act as containers
    #[arg(long)]
    root: PathBuf,

    /// Container (bucket) to operate on
    #[arg(long)]
    container: String,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the concurrency ceiling
    #[arg(long)]
    max_concurrent: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move keys under a destination prefix
    Move {
        /// Destination prefix, empty for the container root
        #[arg(long, default_value = "")]
        to: String,
        /// Keys to move; folder keys end with '/'
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Download keys into a local directory
    Download {
        /// Local directory (defaults to the platform downloads folder)
        #[arg(long)]
        to: Option<PathBuf>,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let settings_file = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = QueueSettings::load_or_default(&settings_file);
    if let Some(max) = args.max_concurrent {
        settings.max_concurrent = QueueSettings::clamp_concurrency(max);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, settings))
}

async fn run(args: Args, settings: QueueSettings) -> Result<()> {
    let store = LocalStore::new(&args.root);
    if !store.root().join(&args.container).is_dir() {
        bail!(
            "Container {:?} not found under {:?}",
            args.container,
            args.root
        );
    }

    match args.command {
        Command::Move { to, keys } => {
            let queue = MoveQueue::for_moves(&settings);
            queue.configure(Arc::new(store), args.container).await;
            let items = keys.into_iter().map(MoveItem::from_key).collect();
            queue.add_tasks(items, to).await;
            watch_until_drained(&queue, |_| String::new()).await;
            report(&queue.snapshot().await)
        }
        Command::Download { to, keys } => {
            let mut items = Vec::with_capacity(keys.len());
            let mut total = 0u64;
            for key in keys {
                let size = store.object_size(&args.container, &key).await?;
                total += size;
                items.push(DownloadItem::new(key, size));
            }
            info!("Downloading {} object(s), {}", items.len(), format_bytes(total));

            let queue = DownloadQueue::for_downloads(&settings);
            queue.configure(Arc::new(store), args.container).await;
            queue
                .add_tasks(items, to.unwrap_or_else(default_download_dir))
                .await;

            let speed_queue = queue.clone();
            watch_until_drained(&queue, move |snapshot| {
                if snapshot.processing_count() > 0 {
                    speed_queue.formatted_speed()
                } else {
                    String::new()
                }
            })
            .await;
            report(&queue.snapshot().await)
        }
    }
}

/// Print one line per published snapshot until nothing is active.
async fn watch_until_drained<E, F>(queue: &QueueManager<E>, extra: F)
where
    E: TaskExecutor,
    F: Fn(&QueueSnapshot<E::Job>) -> String,
{
    let mut rx = queue.subscribe();
    loop {
        let line = {
            let snapshot = rx.borrow_and_update();
            let done = snapshot.tasks.len() - snapshot.active_count();
            let line = format!(
                "[{:>5.1}%] {}/{} done {}",
                snapshot.aggregate_progress * 100.0,
                done,
                snapshot.tasks.len(),
                extra(&snapshot)
            );
            if snapshot.active_count() == 0 {
                println!("{}", line);
                return;
            }
            line
        };
        println!("{}", line);

        if tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .map_or(false, |changed| changed.is_err())
        {
            return;
        }
    }
}

fn report<J: Job>(snapshot: &QueueSnapshot<J>) -> Result<()> {
    let mut failed = 0;
    for task in &snapshot.tasks {
        match &task.status {
            TaskStatus::Completed => println!("  ok        {}", task.display_detail),
            TaskStatus::Cancelled => println!("  skipped   {}", task.display_detail),
            TaskStatus::Failed(reason) => {
                failed += 1;
                println!("  failed    {} ({})", task.display_detail, reason);
            }
            other => println!("  {:<9} {}", other.to_string(), task.display_detail),
        }
    }
    println!("{} task(s), {} failed", snapshot.tasks.len(), failed);
    if failed > 0 {
        bail!("{} task(s) failed", failed);
    }
    Ok(())
}
