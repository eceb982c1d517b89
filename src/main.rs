// src/main.rs

use actix_web::{dev::ServerHandle, web};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Select};
use local_ip_address::local_ip;
use log::{error, info, warn};
use qrcode::render::unicode;
use qrcode::QrCode;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use story_rotation::archive::{JsonArchive, StoryStore};
use story_rotation::cli::Cli;
use story_rotation::config::{Settings, LEDGERS_FILE_NAME};
use story_rotation::file_utils::{get_archive_path, get_ledgers_path};
use story_rotation::ledger::{load_ledgers, save_client_ledger};
use story_rotation::playback::play_next;
use story_rotation::seed::seed_archive;
use story_rotation::selector::unit_interval;
use story_rotation::server::{run_server, AppState};
use story_rotation::story::StoryRecord;
use story_rotation::ui::{describe_story, view_recent};
use story_rotation::weights::validate_recency_bias;

/// Attempts to open a story's recording with the system's default application.
fn play_audio_locally(story: &StoryRecord) -> Result<(), Box<dyn std::error::Error>> {
    match open::that(&story.audio_url) {
        Ok(_) => {
            println!("Playing '{}' with the default system player.", story.audio_url);
            Ok(())
        }
        Err(e) => Err(format!(
            "Failed to open recording '{}' with the system handler: {}",
            story.audio_url, e
        )
        .into()),
    }
}

fn print_qr(url: &str) {
    if let Ok(code) = QrCode::new(url.as_bytes()) {
        println!(
            "Scan to hear a story on your phone:\n{}",
            code.render::<unicode::Dense1x2>().build()
        );
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_app().await {
        eprintln!("\nApplication Error: {}", err);
        process::exit(1);
    }
}

async fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli_args = Cli::parse();
    let settings = Settings::resolve(&cli_args)?;
    validate_recency_bias(settings.recency_bias)?;

    let archive_path = match &settings.archive_path {
        Some(path) => path.clone(),
        None => get_archive_path()?,
    };
    // Kiosk ledgers live next to an explicitly chosen archive.
    let ledgers_path = match &settings.archive_path {
        Some(path) => path.with_file_name(LEDGERS_FILE_NAME),
        None => get_ledgers_path()?,
    };
    let archive = Arc::new(JsonArchive::new(archive_path));

    if let Some(folder) = &cli_args.seed {
        let folder = PathBuf::from(shellexpand::full(folder)?.into_owned());
        let added = seed_archive(&archive, &folder, !cli_args.non_recursive)?;
        println!("Added {} stories to '{}'.", added, archive.path().display());
        return Ok(());
    }

    info!(
        "Archive '{}', recency bias {}, skipping the last {} stories",
        archive.path().display(),
        settings.recency_bias,
        settings.history_size
    );

    let server_handle = if cli_args.no_server {
        println!("Playback server is disabled via the --no-server flag.");
        None
    } else {
        start_server(&archive, &settings)
    };

    let result = run_kiosk(archive.as_ref(), &settings, &cli_args.client, &ledgers_path);

    if let Some(handle) = server_handle {
        println!("\nStopping playback server...");
        handle.stop(true).await;
        println!("Playback server stopped.");
    }
    result
}

/// Starts the HTTP endpoints in the background. Failures only disable the server.
fn start_server(archive: &Arc<JsonArchive>, settings: &Settings) -> Option<ServerHandle> {
    let host = match local_ip() {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            warn!(
                "Could not get local IP address: {}. Playback server will be disabled.",
                e
            );
            return None;
        }
    };

    let store: Arc<dyn StoryStore> = archive.clone();
    let state = web::Data::new(AppState::new(
        store,
        settings.recency_bias,
        settings.history_size,
    ));

    match run_server(host.clone(), settings.port, state) {
        Ok(server) => {
            let handle = server.handle();
            tokio::spawn(server);
            let url = format!("http://{}:{}/api/stories/random", host, settings.port);
            println!("Playback server is running at http://{}:{}", host, settings.port);
            print_qr(&url);
            Some(handle)
        }
        Err(e) => {
            error!(
                "Failed to start playback server: {}. Continuing without it.",
                e
            );
            None
        }
    }
}

/// The booth operator's loop: hear a story, replay it, look at what was heard, quit.
fn run_kiosk(
    archive: &JsonArchive,
    settings: &Settings,
    client: &str,
    ledgers_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let theme = ColorfulTheme::default();
    let mut book = load_ledgers(Some(ledgers_path))?;
    let mut rng = rand::rng();
    let mut current: Option<StoryRecord> = None;

    loop {
        let mut actions = vec!["Hear a story"];
        if current.is_some() {
            actions.push("Play the recording again");
        }
        actions.extend(["View recently heard", "Quit"]);

        let prompt = match &current {
            Some(story) => format!("Now playing '{}'. What next?", story.id),
            None => format!("Handset '{}' is ready. What next?", client),
        };
        let choice_idx = Select::with_theme(&theme)
            .with_prompt(&prompt)
            .items(&actions)
            .default(0)
            .interact_opt()?
            .unwrap_or(actions.len() - 1);

        match actions.get(choice_idx).copied() {
            Some("Hear a story") => {
                let ledger = book.get(client).cloned().unwrap_or_default();
                let picked = play_next(
                    archive,
                    &ledger,
                    settings.recency_bias,
                    settings.history_size,
                    unit_interval(&mut rng),
                )?;

                match picked {
                    Some(playback) => {
                        println!("\n✨ {}", describe_story(&playback.story));
                        save_client_ledger(&mut book, client, playback.ledger, Some(ledgers_path))?;
                        if let Err(e) = play_audio_locally(&playback.story) {
                            eprintln!("Error playing story: {}", e);
                        }
                        current = Some(playback.story);
                    }
                    None => {
                        println!(
                            "\nNo stories available right now. Record one, or come back after a few new tellers."
                        );
                    }
                }
            }
            Some("Play the recording again") => {
                if let Some(story) = &current {
                    if let Err(e) = play_audio_locally(story) {
                        eprintln!("Error playing story: {}", e);
                    }
                }
            }
            Some("View recently heard") => {
                let stories = archive.list_candidates()?;
                let ledger = book.get(client).cloned().unwrap_or_default();
                view_recent(&ledger, &stories, &theme)?;
            }
            Some("Quit") | Some(_) | None => {
                println!("Goodbye!");
                return Ok(());
            }
        }
    }
}
