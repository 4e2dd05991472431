use anyhow::Context;
use clap::{Parser, Subcommand};
use lyricsync::cache::{LyricsCache, is_valid_key};
use lyricsync::config;
use lyricsync::lyrics::{self, LyricsManager, Song};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Fetch, cache and sync song lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Log debug output to stderr.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every lyrics option for a song (cached for later runs).
    Fetch {
        title: String,
        artist: String,
        #[arg(long)]
        album: Option<String>,
        /// Track duration in seconds.
        #[arg(long)]
        duration: Option<f64>,
        /// Print the line active at this playback position (seconds).
        #[arg(long)]
        at: Option<f64>,
        /// Print the default option as LRC.
        #[arg(long)]
        lrc: bool,
        /// Ignore and replace the cached record.
        #[arg(long)]
        refresh: bool,
    },
    /// Parse a local lyrics file and print its lines.
    Parse {
        path: std::path::PathBuf,
        /// Treat the file as plain text.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect or manage the lyrics cache.
    Cache {
        #[command(subcommand)]
        cmd: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// List live cache records, newest first.
    List,
    /// Remove every cached record.
    Clear,
    /// Remove one record by key (as shown in list).
    Delete { key: String },
    /// Remove expired records.
    Prune,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Fetch {
            title,
            artist,
            album,
            duration,
            at,
            lrc,
            refresh,
        } => {
            let manager = LyricsManager::from_config(&cfg).context("init lyrics manager")?;
            let mut song = Song::new(title, artist);
            song.album = album;
            song.duration = duration;

            let options = if refresh {
                manager.refresh(&song).await
            } else {
                manager.fetch_all_lyrics(&song).await
            };

            if options.is_empty() {
                println!("No lyrics found for {}", song.display_name());
                return Ok(());
            }

            for (i, l) in options.options().iter().enumerate() {
                let marker = if i == options.default_index() { "*" } else { " " };
                let kind = if l.is_synced() { "synced" } else { "plain" };
                println!("{marker} {i}. {} ({kind}, {} lines)", l.source(), l.len());
            }

            let Some(best) = options.default_lyrics() else {
                return Ok(());
            };
            if let Some(t) = at {
                match best.current_line(t) {
                    Some(line) => println!("@{t:.2}s: {}", line.text),
                    None => println!("@{t:.2}s: (no active line)"),
                }
            } else if lrc {
                match best.to_lrc() {
                    Some(text) => println!("{text}"),
                    None => println!("{}", best.plain_text()),
                }
            } else {
                println!();
                println!("{}", best.plain_text());
            }
        }
        Command::Parse { path, plain } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let lines = if plain {
                lyrics::parse_plain(&raw)
            } else {
                lyrics::parse_timed(&raw)
            };
            for line in lines {
                match line.formatted_timestamp() {
                    Some(tag) => println!("{tag} {}", line.text),
                    None => println!("{}", line.text),
                }
            }
        }
        Command::Cache { cmd } => {
            let cache = LyricsCache::open(&cfg.cache);
            match cmd {
                CacheCommand::List => {
                    for record in cache.list_all() {
                        let when = record
                            .cached_at
                            .format(&Rfc3339)
                            .unwrap_or_else(|_| record.cached_at.to_string());
                        let name = match (&record.song_title, &record.song_artist) {
                            (Some(t), Some(a)) => format!("{t} - {a}"),
                            _ => "(unknown)".to_string(),
                        };
                        let kinds: Vec<String> = record.lyrics.iter().map(|o| o.id()).collect();
                        println!("{}  {name}  [{}]  {when}", record.song_key, kinds.join(", "));
                    }
                }
                CacheCommand::Clear => {
                    cache.clear_all();
                    println!("Cleared lyrics cache at {}", cache.dir().display());
                }
                CacheCommand::Delete { key } => {
                    anyhow::ensure!(is_valid_key(&key), "not a cache key: {key:?}");
                    cache.delete(&key);
                    println!("Removed {key}");
                }
                CacheCommand::Prune => {
                    let removed = cache.purge_expired();
                    println!("Removed {removed} expired records");
                }
            }
        }
    }

    Ok(())
}
