//! Local web form in front of [`Studio`].

use std::num::NonZeroU16;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::history::History;
use crate::models::GenerateInputs;
use crate::store::PUBLIC_PREFIX;
use crate::studio::Studio;
use crate::Error;

mod views;

use views::{FormValues, IndexTemplate};

/// Upper bound on a multipart submission, reference image included.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    studio: Arc<Studio>,
    history: Arc<RwLock<History>>,
}

impl AppState {
    /// Start from the images already in the current partition.
    pub fn new(studio: Studio) -> Self {
        let history = studio.initial_history();
        info!("Loaded {} image(s) into history", history.len());
        Self::with_history(studio, history)
    }

    pub fn with_history(studio: Studio, history: History) -> Self {
        Self {
            studio: Arc::new(studio),
            history: Arc::new(RwLock::new(history)),
        }
    }

    pub async fn history(&self) -> History {
        self.history.read().await.clone()
    }

    fn gallery(&self, history: &History) -> Vec<String> {
        history
            .paths()
            .iter()
            .filter_map(|path| self.studio.store().public_path(path))
            .collect()
    }

    async fn page(&self, form: FormValues, error: Option<String>) -> IndexTemplate {
        let history = self.history.read().await;
        let latest = history
            .latest()
            .and_then(|path| self.studio.store().public_path(path));
        IndexTemplate::new(form, error, latest, self.gallery(&history))
    }
}

/// HTTP status shown alongside a failed generation.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Upload(_) | Error::Generation(_) | Error::Network(_) | Error::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Default, Deserialize)]
struct IndexParams {
    random: Option<String>,
}

async fn index_handler(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> IndexTemplate {
    let mut form = FormValues::default();
    let wants_random = matches!(params.random.as_deref(), Some("1" | "true" | "on"));
    if wants_random {
        if let Some(prompt) = state.studio.random_prompt() {
            form.prompt = prompt;
        }
    }
    state.page(form, None).await
}

async fn random_prompt_handler(State(state): State<AppState>) -> Response {
    match state.studio.random_prompt() {
        Some(prompt) => prompt.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn generate_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let inputs = match read_generate_form(multipart).await {
        Ok(inputs) => inputs,
        Err(err) => {
            let page = state
                .page(FormValues::default(), Some(err.user_message()))
                .await;
            return (status_for(&err), page).into_response();
        }
    };
    let form = FormValues::from(&inputs);

    let snapshot = state.history().await;
    match state.studio.invoke(&inputs, &snapshot).await {
        Ok(history) => {
            *state.history.write().await = history;
            state.page(form, None).await.into_response()
        }
        Err(err) => {
            error!("Generation from web form failed: {}", err);
            let page = state.page(form, Some(err.user_message())).await;
            (status_for(&err), page).into_response()
        }
    }
}

async fn read_generate_form(mut multipart: Multipart) -> crate::Result<GenerateInputs> {
    let mut inputs = GenerateInputs::new("");
    let mut strength: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| Error::Validation(format!("malformed form data: {}", err)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "reference_image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| Error::Validation(format!("reference image: {}", err)))?;
                // Browsers send an empty part when no file was chosen.
                inputs.reference_image = (!bytes.is_empty()).then(|| bytes.to_vec());
            }
            "prompt" | "aspect_ratio" | "reference_strength" | "raw" | "seed" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| Error::Validation(format!("{}: {}", field_name, err)))?;
                match field_name.as_str() {
                    "prompt" => inputs.prompt = value,
                    "aspect_ratio" => inputs.aspect_ratio = value,
                    "reference_strength" => strength = Some(value),
                    "raw" => inputs.raw = matches!(value.trim(), "true" | "on" | "1"),
                    _ => inputs.seed = Some(value),
                }
            }
            _ => {}
        }
    }

    // The slider only matters alongside a reference image.
    if let (Some(_), Some(value)) = (&inputs.reference_image, strength) {
        inputs.reference_strength = value
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Validation(format!("invalid strength '{}'", value.trim())))?;
    }

    Ok(inputs)
}

fn create_router(output_root: &Path) -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/random-prompt", get(random_prompt_handler))
        .route(
            "/generate",
            post(generate_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service(PUBLIC_PREFIX, ServeDir::new(output_root))
}

/// Router with state attached, ready to serve.
pub fn app(state: AppState) -> Router {
    let output_root = state.studio.store().root().to_path_buf();
    create_router(&output_root).with_state(state)
}

pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    studio: Studio,
) -> Result<(), anyhow::Error> {
    let app = app(AppState::new(studio));

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}
