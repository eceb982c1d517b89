// src/server.rs

use crate::archive::StoryStore;
use crate::config::{LEDGER_COOKIE_MAX_AGE_SECS, LEDGER_COOKIE_NAME, PHONE_LEDGER_HEADER};
use crate::error::PlaybackError;
use crate::ledger::{parse, serialize, try_parse};
use crate::playback::{play_next, Playback};
use crate::selector::unit_interval;
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::error::BlockingError;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// State shared by the playback handlers.
pub struct AppState {
    pub store: Arc<dyn StoryStore>,
    pub recency_bias: f64,
    pub history_size: usize,
    /// Fallback ledgers for handsets that don't send their own header, keyed by phone number.
    pub phone_ledgers: Mutex<HashMap<u8, Vec<String>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn StoryStore>, recency_bias: f64, history_size: usize) -> Self {
        AppState {
            store,
            recency_bias,
            history_size,
            phone_ledgers: Mutex::new(HashMap::new()),
        }
    }

    fn play_next(&self, ledger: &[String]) -> Result<Option<Playback>, PlaybackError> {
        let mut rng = rand::rng();
        play_next(
            self.store.as_ref(),
            ledger,
            self.recency_bias,
            self.history_size,
            unit_interval(&mut rng),
        )
    }
}

#[derive(Serialize)]
struct PhoneStory<'a> {
    id: &'a str,
    audio_url: &'a str,
    duration_s: Option<f64>,
    keywords: Option<&'a [String]>,
}

#[derive(Serialize)]
struct PhonePlayback<'a> {
    phone: u8,
    story: PhoneStory<'a>,
}

fn no_stories() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "No stories available" }))
}

fn playback_failure(context: &str, err: PlaybackError) -> HttpResponse {
    error!("Error in {}: {}", context, err);
    match err {
        PlaybackError::Store(_) => {
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to fetch stories" }))
        }
        PlaybackError::Selection(_) => {
            HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }))
        }
    }
}

fn worker_failure(context: &str, err: BlockingError) -> HttpResponse {
    error!("Error in {}: {}", context, err);
    HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }))
}

/// Runs a pick on the blocking pool; the archive is file-backed.
async fn play_blocking(
    state: &web::Data<AppState>,
    ledger: Vec<String>,
) -> Result<Result<Option<Playback>, PlaybackError>, BlockingError> {
    let state = state.clone();
    web::block(move || state.play_next(&ledger)).await
}

/// `GET /api/stories/random`: web visitors, with their recently heard list kept in a cookie.
async fn random_story(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    const CONTEXT: &str = "GET /api/stories/random";
    let cookie = req.cookie(LEDGER_COOKIE_NAME);
    let ledger = parse(cookie.as_ref().map(|c| c.value()));

    match play_blocking(&state, ledger).await {
        Ok(Ok(Some(Playback { story, ledger }))) => {
            let cookie = Cookie::build(LEDGER_COOKIE_NAME, serialize(&ledger))
                .path("/")
                .max_age(CookieDuration::seconds(LEDGER_COOKIE_MAX_AGE_SECS))
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish();
            HttpResponse::Ok().cookie(cookie).json(story)
        }
        Ok(Ok(None)) => no_stories(),
        Ok(Err(e)) => playback_failure(CONTEXT, e),
        Err(e) => worker_failure(CONTEXT, e),
    }
}

/// `POST /api/phone/{phone}/playback/start`: a handset was picked up.
/// The handset may send its own ledger; otherwise, or when what it sent is
/// unreadable, the server uses the one it remembers for that phone.
async fn phone_playback_start(
    req: HttpRequest,
    path: web::Path<u8>,
    state: web::Data<AppState>,
) -> HttpResponse {
    const CONTEXT: &str = "POST /api/phone/playback/start";
    let phone = path.into_inner();
    let sent = req
        .headers()
        .get(PHONE_LEDGER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(try_parse);

    let ledger = match sent {
        Some(ledger) => ledger,
        None => state
            .phone_ledgers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&phone)
            .cloned()
            .unwrap_or_default(),
    };

    match play_blocking(&state, ledger).await {
        Ok(Ok(Some(Playback { story, ledger }))) => {
            let header_value = serialize(&ledger);
            state
                .phone_ledgers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(phone, ledger);

            info!(
                "[Phone {}] Playing story {} ({}s)",
                phone,
                story.id,
                story.duration_s.map_or_else(|| "?".to_string(), |d| format!("{d:.0}"))
            );
            HttpResponse::Ok()
                .insert_header((PHONE_LEDGER_HEADER, header_value))
                .json(PhonePlayback {
                    phone,
                    story: PhoneStory {
                        id: &story.id,
                        audio_url: &story.audio_url,
                        duration_s: story.duration_s,
                        keywords: story.keywords.as_deref(),
                    },
                })
        }
        Ok(Ok(None)) => no_stories(),
        Ok(Err(e)) => playback_failure(CONTEXT, e),
        Err(e) => worker_failure(CONTEXT, e),
    }
}

/// `GET /api/stories`: every consented story, newest first.
async fn list_stories(state: web::Data<AppState>) -> HttpResponse {
    const CONTEXT: &str = "GET /api/stories";
    let store = state.store.clone();
    match web::block(move || store.list_candidates()).await {
        Ok(Ok(stories)) => {
            let consented: Vec<_> = stories.into_iter().filter(|s| s.consent).collect();
            HttpResponse::Ok().json(consented)
        }
        Ok(Err(e)) => playback_failure(CONTEXT, e.into()),
        Err(e) => worker_failure(CONTEXT, e),
    }
}

/// Registers the playback routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/stories", web::get().to(list_stories))
        .route("/api/stories/random", web::get().to(random_story))
        .route(
            "/api/phone/{phone}/playback/start",
            web::post().to(phone_playback_start),
        );
}

/// Configures and starts the Actix web server for story playback.
///
/// # Arguments
///
/// * `host` - The host address to bind the server to.
/// * `port` - The port number to bind the server to.
/// * `app_state` - The shared application state.
///
/// # Returns
///
/// A `std::io::Result` containing the Actix server instance if binding is successful.
pub fn run_server(
    host: String,
    port: u16,
    app_state: web::Data<AppState>,
) -> std::io::Result<actix_web::dev::Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes)
    })
    .workers(2)
    .bind((host, port))?
    .run();

    Ok(server)
}
