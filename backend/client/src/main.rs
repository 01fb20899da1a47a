use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use client::{
    ApiClient, Cache, SearchParams, Searcher, Session, SessionState, SystemClipboard, Toasts,
};
use indicatif::{ProgressBar, ProgressStyle};
use lgtm::{HostPolicy, LgtmOptions, Renderer, image_client, options::parse_hex_color};
use shared::{ImageSource, ImageType};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server API base, overrides NEXT_PUBLIC_APP_URL.
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search a provider.
    Search {
        query: String,

        #[arg(short, long, default_value = "unsplash")]
        source: ImageSource,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,

        /// Pixabay only.
        #[arg(long)]
        image_type: Option<ImageType>,

        /// Skip the on-disk cache.
        #[arg(long)]
        no_cache: bool,
    },

    /// Stamp an image and copy or save it.
    Generate {
        url: String,

        #[arg(long, default_value = "LGTM")]
        text: String,

        #[arg(long)]
        font_size: Option<f32>,

        #[arg(long, default_value_t = 800)]
        max_width: u32,

        #[arg(long, default_value_t = 800)]
        max_height: u32,

        /// `#rrggbb` or `#rrggbbaa`.
        #[arg(long)]
        color: Option<String>,

        #[arg(long, env = "LGTM_FONT_PATH")]
        font: Option<PathBuf>,

        /// Copy the PNG to the clipboard.
        #[arg(long, conflicts_with = "markdown")]
        copy: bool,

        /// Copy `![LGTM](data url)` to the clipboard.
        #[arg(long)]
        markdown: bool,

        /// Seconds to keep serving the clipboard on X11/Wayland, or until
        /// another program takes it. 0 exits at once.
        #[arg(long, default_value_t = 30)]
        hold_secs: u64,

        /// Save the PNG into this directory.
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[arg(long)]
        filename: Option<String>,
    },

    /// Check the server.
    Health,

    /// Remove cached searches.
    ClearCache {
        /// Remove every entry, not only expired ones.
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let api = match args.api {
        Some(base) => ApiClient::new(base),
        None => ApiClient::from_env(),
    };

    match args.command {
        Command::Search {
            query,
            source,
            page,
            per_page,
            image_type,
            no_cache,
        } => {
            let cache = if no_cache { None } else { Cache::default_dir().map(Cache::new) };
            let searcher = Searcher::new(api, cache);
            let params = SearchParams {
                query,
                page,
                per_page,
                image_type,
            };

            let Some(result) = searcher.search(source, &params).await? else {
                println!("検索キーワードを入力してください (2文字以上で検索できます)");
                return Ok(ExitCode::SUCCESS);
            };

            if result.images.is_empty() {
                println!("画像が見つかりませんでした");
                println!("別のキーワードで検索してみてください");
                return Ok(ExitCode::SUCCESS);
            }

            println!(
                "{} 件の検索結果 - ページ {} / {}\n",
                result.total_results, result.page, result.total_pages
            );
            for image in &result.images {
                println!("{:<24} {}x{}  {}", image.id, image.width, image.height, image.photographer);
                println!("  {}", image.url);
            }
        }

        Command::Generate {
            url,
            text,
            font_size,
            max_width,
            max_height,
            color,
            font,
            copy,
            markdown,
            hold_secs,
            out,
            filename,
        } => {
            let renderer = Renderer::load(font.as_deref()).context("No usable font found")?;
            let mut options = LgtmOptions {
                text,
                font_size,
                max_width,
                max_height,
                ..Default::default()
            };
            if let Some(color) = color {
                options.text_color =
                    parse_hex_color(&color).with_context(|| format!("Invalid color {color}"))?;
            }

            let clipboard = match hold_secs {
                0 => SystemClipboard::new(),
                secs => SystemClipboard::with_hold(Duration::from_secs(secs)),
            };
            let mut session = Session::new(clipboard);
            let http = image_client(
                Duration::from_secs(30),
                concat!("lgtm-cli/", env!("CARGO_PKG_VERSION")),
            )?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            spinner.set_message(format!("Processing {url}"));
            spinner.enable_steady_tick(Duration::from_millis(100));

            // The image is fetched from this machine, so local hosts are fine.
            let state = session
                .generate(&renderer, &http, &url, options, HostPolicy::AllowPrivate)
                .await
                .clone();
            spinner.finish_and_clear();

            if let SessionState::Error(reason) = state {
                print_toasts(&mut session.toasts);
                eprintln!("{reason}");
                return Ok(ExitCode::FAILURE);
            }

            if let Some(processed) = session.processed() {
                let size = format!("{}x{}", processed.width, processed.height);
                session.toasts.info(format!("{size} の画像を生成しました"));
            }
            print_toasts(&mut session.toasts);

            if (copy || markdown) && hold_secs > 0 {
                eprintln!("クリップボードを最大{hold_secs}秒間保持します (Ctrl+C で終了)");
            }

            // Failures are reported as toasts and do not stop later actions.
            if copy {
                let _ = session.copy_image();
            }
            if markdown {
                let _ = session.copy_markdown();
            }
            if let Some(dir) = out.or_else(|| (!copy && !markdown).then(|| PathBuf::from("."))) {
                if let Ok(path) = session.download(&dir, filename.as_deref()) {
                    println!("{}", path.display());
                }
            }

            print_toasts(&mut session.toasts);
            session.close();
        }

        Command::Health => {
            let health = api.check_health().await?;
            println!(
                "{}: {} v{} (up {}s)",
                api.base_url(),
                health.status,
                health.version,
                health.uptime / 1000
            );
        }

        Command::ClearCache { all } => {
            let cache = Cache::new(Cache::default_dir().context("No cache directory")?);
            let removed = if all { cache.clear_all() } else { cache.clear_expired() };
            println!("Removed {removed} entries from {}", cache.dir().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_toasts(toasts: &mut Toasts) {
    for toast in toasts.drain() {
        println!("[{}] {}", toast.kind, toast.message);
    }
}
