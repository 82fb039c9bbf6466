use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tidescout::harvest::challenge::ChallengeCallback;
use tidescout::sink::file::{CsvSink, JsonSink};
use tidescout::sink::sqlite::SqliteStore;
use tidescout::{
    load_file_config, CommentSink, HarvestConfig, HarvestOptions, HarvestRunner, SinkReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Harvest the comment feed of a short-video page.
#[derive(Parser, Debug)]
#[command(name = "tidescout", version, about)]
struct Cli {
    /// Video URL to harvest (https://www.tiktok.com/@user/video/ID).
    url: String,

    /// Export file path. Defaults to comments_<video_id>.<ext> in the
    /// current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export format for the flat-file sink.
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,

    /// Target comment count in bounded mode.
    #[arg(long)]
    max_comments: Option<usize>,

    /// Keep harvesting until the feed stops growing for --max-idle-secs.
    #[arg(long)]
    unlimited: bool,

    /// Idle window for unlimited mode, in seconds.
    #[arg(long)]
    max_idle_secs: Option<u64>,

    /// Settle pause after each scroll, in milliseconds.
    #[arg(long)]
    scroll_pause_ms: Option<u64>,

    /// Skip reply threads entirely.
    #[arg(long)]
    no_replies: bool,

    /// Keep records whose author never rendered.
    #[arg(long)]
    keep_unknown: bool,

    /// Run the browser headless. Challenge interstitials cannot be solved
    /// in this mode; use only where they are unlikely.
    #[arg(long)]
    headless: bool,

    /// Also persist the batch into this SQLite database.
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Budget for the page and comment feed to appear, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Skip avatar downloads.
    #[arg(long)]
    no_avatars: bool,
}

fn resolve_config(cli: &Cli) -> HarvestConfig {
    let file = load_file_config();
    let mut cfg = HarvestConfig::resolve(&file.harvest);

    if let Some(v) = cli.max_comments {
        cfg.max_comments = v;
    }
    if cli.unlimited {
        cfg.unlimited = true;
    }
    if let Some(v) = cli.max_idle_secs {
        cfg.max_idle = Duration::from_secs(v);
    }
    if let Some(v) = cli.scroll_pause_ms {
        cfg.scroll_pause = Duration::from_millis(v);
    }
    if cli.no_replies {
        cfg.include_replies = false;
    }
    if cli.keep_unknown {
        cfg.skip_unknown_author = false;
    }
    cfg
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidescout=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli);
    info!(
        url = %cli.url,
        max = cfg.max_comments,
        unlimited = cfg.unlimited,
        "starting harvest"
    );

    let on_challenge: ChallengeCallback = Arc::new(|| {
        println!();
        println!("==============================================================");
        println!("  Verification challenge detected.");
        println!("  Solve it in the browser window — harvesting will resume");
        println!("  automatically once the challenge disappears.");
        println!("==============================================================");
        println!();
    });

    let runner = HarvestRunner::new(HarvestOptions {
        config: cfg,
        headless: cli.headless,
        nav_timeout: Duration::from_secs(cli.timeout_secs),
        fetch_avatars: !cli.no_avatars,
        progress: Some(Arc::new(|pct, msg| {
            println!("[{pct:>3}%] {msg}");
        })),
        on_challenge: Some(on_challenge),
    });

    let outcome = runner.run(&cli.url).await?;

    if outcome.comments.is_empty() {
        warn!("harvest finished with zero comments; nothing exported");
        bail!("no comments harvested from {}", cli.url);
    }

    let output = cli.output.clone().unwrap_or_else(|| {
        let id = if outcome.video.video_id.is_empty() {
            "unknown".to_string()
        } else {
            outcome.video.video_id.clone()
        };
        PathBuf::from(tidescout::util::clean_filename(&format!(
            "comments_{id}.{}",
            cli.format.extension()
        )))
    });

    let file_report = match cli.format {
        ExportFormat::Csv => CsvSink::new(&output).write_batch(&outcome.video, &outcome.comments)?,
        ExportFormat::Json => {
            JsonSink::new(&output).write_batch(&outcome.video, &outcome.comments)?
        }
    };

    let sink_report: SinkReport = if let Some(db) = &cli.sqlite {
        let store = SqliteStore::open(db)?;
        store.write_batch(&outcome.video, &outcome.comments)?
    } else {
        file_report
    };

    let report = outcome.report(sink_report);
    println!();
    println!("Harvest report");
    println!("  video:       {} (@{})", report.video.video_id, report.video.author);
    println!(
        "  comments:    {} ({} top-level, {} replies)",
        report.total_comments, report.top_level, report.replies
    );
    println!("  duplicates:  {} dropped in-memory", report.duplicates_dropped);
    println!(
        "  loading:     {} items rendered over {} rounds ({:?})",
        report.load.rendered, report.load.rounds, report.load.stop
    );
    println!(
        "  sink:        {} inserted, {} skipped",
        report.sink.inserted, report.sink.skipped
    );
    println!("  export:      {}", output.display());

    Ok(())
}
