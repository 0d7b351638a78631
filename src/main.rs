use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use podshelf::{
    AudioCache, CatalogClient, HttpCatalog, NoopReporter, PlayList, PlaylistStore, ProgressEvent,
    ProgressReporter, ReqwestTransport, SharedProgressReporter, Show, ShowBrowser,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static NOTE: Emoji<'_, '_> = Emoji("🎵 ", "- ");

/// Browse .NET Rocks episodes, manage playlists, and prefetch audio
#[derive(Parser, Debug)]
#[command(name = "podshelf")]
#[command(about = "Browse .NET Rocks episodes, manage playlists, and prefetch audio")]
#[command(version)]
struct Args {
    /// Directory for playlists and cached audio (defaults to the user cache dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List episodes, newest first, one page per batch
    Shows {
        /// Only episodes matching this search text
        #[arg(short, long)]
        filter: Option<String>,

        /// Number of pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,

        /// Episodes per page
        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Print one episode with guests and links
    Show {
        /// Episode number
        number: u32,
    },

    /// Manage playlists
    Playlist {
        #[command(subcommand)]
        command: PlaylistCommand,
    },

    /// Download all episodes of a playlist into the local audio cache
    Download {
        /// Playlist name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    /// List all playlists
    List,
    /// Create a new, empty playlist
    Create { name: String },
    /// Rename a playlist
    Rename { name: String, new_name: String },
    /// Delete a playlist
    Delete { name: String },
    /// Print the episodes of a playlist in order
    Show { name: String },
    /// Add an episode to a playlist
    Add { name: String, show_number: u32 },
    /// Remove an episode from a playlist
    Remove { name: String, show_number: u32 },
    /// Move an episode one position up
    Up { name: String, show_number: u32 },
    /// Move an episode one position down
    Down { name: String, show_number: u32 },
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    main_bar: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            main_bar,
            download_bar: Mutex::new(None),
        }
    }

    fn start_download_bar(&self, length: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(length));
        bar.set_style(style);
        *self.download_bar.lock().unwrap() = Some(bar.clone());
        bar
    }

    fn finish_download_bar(&self) {
        if let Some(bar) = self.download_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::DownloadStarting {
                show_title,
                content_length,
                ..
            } => {
                let bar = self.start_download_bar(content_length.unwrap_or(0));
                bar.set_message(truncate_title(&show_title, 40));
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted { show_title, .. } => {
                self.finish_download_bar();
                self.main_bar.println(format!(
                    "{SUCCESS}{}",
                    truncate_title(&show_title, 60).green()
                ));
            }

            ProgressEvent::DownloadFailed { show_title, error } => {
                self.finish_download_bar();
                self.main_bar.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&show_title, 40).red(),
                    error.red()
                ));
            }

            ProgressEvent::PrefetchProgress { index, total } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}Downloading episode {} of {}",
                    index.to_string().cyan(),
                    total.to_string().cyan()
                ));
            }

            ProgressEvent::StatusMessage { text } => {
                self.main_bar.set_message(text);
            }

            // playback events have no terminal UI here
            ProgressEvent::PlaybackStateChanged { .. }
            | ProgressEvent::PlaybackProgress { .. }
            | ProgressEvent::PlaylistAdvanced { .. }
            | ProgressEvent::PlaylistFinished => {}
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.len() <= max_len {
        title.to_string()
    } else {
        format!("{}...", &title[..max_len.saturating_sub(3)])
    }
}

fn data_dir(args: &Args) -> PathBuf {
    args.data_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("podshelf")
    })
}

fn find_playlist(store: &PlaylistStore, name: &str) -> Result<PlayList> {
    store
        .find_by_name(name)
        .cloned()
        .with_context(|| format!("No playlist named '{}'", name))
}

fn print_show_line(show: &Show, downloaded: bool) {
    let date = show
        .date_published
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());
    let marker = if downloaded {
        format!("{DOWNLOAD}")
    } else {
        "   ".to_string()
    };
    println!(
        "  {} {} {} {}",
        format!("#{}", show.show_number).cyan(),
        date.dimmed(),
        marker,
        show.title
    );
}

async fn cmd_shows(
    catalog: Arc<dyn CatalogClient>,
    cache: &AudioCache,
    filter: Option<String>,
    pages: usize,
    page_size: usize,
) -> Result<()> {
    let mut browser = ShowBrowser::with_page_size(catalog, page_size);
    if let Some(filter) = &filter {
        browser.set_filter(filter);
    }

    for _ in 0..pages {
        let batch = browser
            .next_batch()
            .await
            .context("Failed to fetch episodes from the catalog")?;
        for show in &batch {
            let downloaded = show
                .mp3_url
                .as_deref()
                .is_some_and(|url| cache.is_cached(url));
            print_show_line(show, downloaded);
        }
        if browser.no_more_in_set() {
            println!("\n  {}", "End of results.".dimmed());
            break;
        }
    }
    Ok(())
}

async fn cmd_show(catalog: Arc<dyn CatalogClient>, number: u32) -> Result<()> {
    let show = catalog
        .get_show_with_details(number)
        .await
        .with_context(|| format!("Failed to fetch episode {}", number))?;

    println!(
        "\n{}{} {}",
        NOTE,
        format!("#{}", show.show_number).cyan().bold(),
        show.title.bold()
    );
    if let Some(date) = show.date_published {
        println!("  {}", date.format("%Y-%m-%d").to_string().dimmed());
    }
    if let Some(description) = show.clean_description() {
        println!("\n{}", description);
    }
    if let Some(details) = &show.details {
        if !details.guests.is_empty() {
            println!("\n{}", "Guests:".bold());
            for guest in &details.guests {
                println!("  {}", guest.name.yellow());
            }
        }
        if !details.links.is_empty() {
            println!("\n{}", "Links:".bold());
            for link in &details.links {
                println!("  {} {}", link.title, link.url.cyan().underline());
            }
        }
    }
    if !show.has_audio() {
        println!("\n{}", "This episode has no audio file".red());
    }
    println!();
    Ok(())
}

async fn cmd_playlist(
    store: &mut PlaylistStore,
    catalog: Arc<dyn CatalogClient>,
    command: PlaylistCommand,
) -> Result<()> {
    match command {
        PlaylistCommand::List => {
            if store.playlists().is_empty() {
                println!("  {}", "No playlists yet.".dimmed());
            }
            for playlist in store.playlists() {
                println!(
                    "  {} {} {}",
                    playlist.name.bold(),
                    format!("({} episodes)", playlist.shows.len()).dimmed(),
                    playlist
                        .date_created
                        .format("%Y-%m-%d")
                        .to_string()
                        .dimmed()
                );
            }
        }

        PlaylistCommand::Create { name } => {
            store.create(&name)?;
            println!("{SUCCESS}Created playlist {}", name.trim().bold());
        }

        PlaylistCommand::Rename { name, new_name } => {
            let playlist = find_playlist(store, &name)?;
            store.rename(playlist.id, &new_name)?;
            println!("{SUCCESS}Renamed {} to {}", name.bold(), new_name.trim().bold());
        }

        PlaylistCommand::Delete { name } => {
            let playlist = find_playlist(store, &name)?;
            store.delete(playlist.id)?;
            println!("{SUCCESS}Deleted playlist {}", name.bold());
        }

        PlaylistCommand::Show { name } => {
            let playlist = find_playlist(store, &name)?;
            println!("\n{}{}", HEADPHONES, playlist.name.bold());
            if playlist.shows.is_empty() {
                println!("  {}", "This playlist is empty.".dimmed());
            }
            for show in &playlist.shows {
                print_show_line(show, false);
            }
            println!();
        }

        PlaylistCommand::Add { name, show_number } => {
            let playlist = find_playlist(store, &name)?;
            if playlist.shows.iter().any(|s| s.show_number == show_number) {
                bail!("Episode {} is already in '{}'", show_number, playlist.name);
            }
            let show = catalog
                .get_show_with_details(show_number)
                .await
                .with_context(|| format!("Failed to fetch episode {}", show_number))?;
            let title = show.title.clone();
            store.add_show(playlist.id, show)?;
            println!("{SUCCESS}Added {} to {}", title.bold(), playlist.name.bold());
        }

        PlaylistCommand::Remove { name, show_number } => {
            let playlist = find_playlist(store, &name)?;
            let show = playlist
                .shows
                .iter()
                .find(|s| s.show_number == show_number)
                .with_context(|| {
                    format!("Episode {} is not in '{}'", show_number, playlist.name)
                })?;
            store.remove_show(playlist.id, &show.id)?;
            println!("{SUCCESS}Removed episode {} from {}", show_number, playlist.name.bold());
        }

        PlaylistCommand::Up { name, show_number } => {
            let playlist = find_playlist(store, &name)?;
            let show = playlist
                .shows
                .iter()
                .find(|s| s.show_number == show_number)
                .with_context(|| {
                    format!("Episode {} is not in '{}'", show_number, playlist.name)
                })?;
            store.move_show_up(playlist.id, &show.id)?;
        }

        PlaylistCommand::Down { name, show_number } => {
            let playlist = find_playlist(store, &name)?;
            let show = playlist
                .shows
                .iter()
                .find(|s| s.show_number == show_number)
                .with_context(|| {
                    format!("Episode {} is not in '{}'", show_number, playlist.name)
                })?;
            store.move_show_down(playlist.id, &show.id)?;
        }
    }
    Ok(())
}

async fn cmd_download(
    catalog: Arc<dyn CatalogClient>,
    transport: &ReqwestTransport,
    cache: &AudioCache,
    store: &PlaylistStore,
    name: &str,
    reporter: SharedProgressReporter,
    quiet: bool,
) -> Result<()> {
    let playlist = find_playlist(store, name)?;

    // interrupted runs leave .partial files behind
    cache.purge_partials();

    let pending: Vec<&Show> = playlist
        .shows
        .iter()
        .filter(|s| {
            s.mp3_url
                .as_deref()
                .is_none_or(|url| url.is_empty() || !cache.is_cached(url))
        })
        .collect();

    if pending.is_empty() {
        if !quiet {
            println!("{PARTY}{}", "All episodes are already downloaded.".green());
        }
        return Ok(());
    }

    let total = pending.len();
    let mut downloaded = 0;
    let mut skipped = 0;
    let mut failed = Vec::new();

    for (i, show) in pending.iter().enumerate() {
        reporter.report(ProgressEvent::PrefetchProgress {
            index: i + 1,
            total,
        });

        // refresh from the catalog so the cached copy reflects current metadata
        let show = match catalog.get_show_with_details(show.show_number).await {
            Ok(detailed) => detailed,
            Err(_) => (*show).clone(),
        };
        let Some(url) = show.mp3_url.as_deref().filter(|u| !u.is_empty()) else {
            skipped += 1;
            continue;
        };

        match cache
            .ensure_cached(transport, url, &show.title, &reporter)
            .await
        {
            Ok(_) => downloaded += 1,
            Err(e) => failed.push((show.title.clone(), e.to_string())),
        }
    }

    if !quiet {
        println!(
            "\n{PARTY}{} {} downloaded, {} skipped, {} failed",
            "Download complete:".bold().green(),
            downloaded.to_string().green().bold(),
            skipped.to_string().yellow(),
            if failed.is_empty() {
                failed.len().to_string().green()
            } else {
                failed.len().to_string().red().bold()
            }
        );
        for (title, error) in &failed {
            println!("  {FAILURE}{} - {}", title.yellow(), error.dimmed());
        }
        println!(
            "\n{FOLDER}Audio cache: {}\n",
            cache.root().display().to_string().cyan()
        );
    }

    if !failed.is_empty() && downloaded == 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podshelf".bold().magenta(),
            "- .NET Rocks Episode Browser".dimmed()
        );
    }

    let data_dir = data_dir(&args);
    let transport = ReqwestTransport::new();
    let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalog::new(transport.clone()));
    let cache = AudioCache::new(data_dir.join("audio"));
    let mut store = PlaylistStore::open(data_dir.join("playlists.json"));

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    match args.command {
        Command::Shows {
            filter,
            pages,
            page_size,
        } => cmd_shows(catalog, &cache, filter, pages, page_size).await?,

        Command::Show { number } => cmd_show(catalog, number).await?,

        Command::Playlist { command } => cmd_playlist(&mut store, catalog, command).await?,

        Command::Download { name } => {
            cmd_download(catalog, &transport, &cache, &store, &name, reporter, args.quiet).await?
        }
    }

    Ok(())
}
