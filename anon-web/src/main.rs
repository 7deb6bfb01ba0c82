//! Servidor web Axum com WebSocket para anonimização e reversão de documentos

use std::path::PathBuf;
use std::sync::Arc;

use anon_core::{
    corpus::demo_texts, AnonConfig, AnonError, AnonymizationPipeline, Detector, EntityIndex,
    EntitySpan, Mapping, MappingStore, PipelineEvent, RecognizerStatus, TextPages,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Estado compartilhado da aplicação.
///
/// O detector é carregado uma vez e compartilhado; cada anonimização cria o
/// próprio pipeline sobre ele, com contadores próprios.
struct AppState {
    config: AnonConfig,
    detector: Arc<Detector>,
    store: MappingStore,
}

impl AppState {
    fn new(config: AnonConfig) -> Result<Self, AnonError> {
        let detector = Arc::new(Detector::new(&config)?);
        let store = MappingStore::from_config(&config.mapping);
        Ok(Self {
            config,
            detector,
            store,
        })
    }

    fn pipeline(&self) -> Result<AnonymizationPipeline, AnonError> {
        AnonymizationPipeline::with_detector(Arc::clone(&self.detector), &self.config)
    }
}

/// Erro renderizado como `{error, code}`.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Core(AnonError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: String,
}

impl From<AnonError> for ApiError {
    fn from(e: AnonError) -> Self {
        ApiError::Core(e)
    }
}

fn status_for(e: &AnonError) -> StatusCode {
    match e {
        AnonError::Configuration(_)
        | AnonError::PageCountMismatch { .. }
        | AnonError::MappingMalformed { .. } => StatusCode::BAD_REQUEST,
        AnonError::MappingNotFound(_) => StatusCode::NOT_FOUND,
        AnonError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND
        }
        AnonError::AmbiguousReversal { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    code: "ANON_BAD_REQUEST".to_string(),
                },
            ),
            ApiError::Core(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    error!(code = e.code(), "falha interna: {e}");
                } else {
                    warn!(code = e.code(), "requisição rejeitada: {e}");
                }
                (
                    status,
                    ErrorBody {
                        error: e.to_string(),
                        code: e.code().to_string(),
                    },
                )
            }
            ApiError::Internal(msg) => {
                error!("falha interna: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "erro interno do servidor".to_string(),
                        code: "ANON_INTERNAL".to_string(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Executa trabalho síncrono do núcleo fora do runtime assíncrono.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AnonError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn require_pages(pages: &[String]) -> Result<(), ApiError> {
    if pages.is_empty() || pages.iter().all(|p| p.trim().is_empty()) {
        return Err(ApiError::BadRequest("nenhuma página com texto".to_string()));
    }
    Ok(())
}

#[derive(Deserialize)]
struct DetectRequest {
    pages: Vec<String>,
    /// Visão legada do documento inteiro (texto → categoria).
    #[serde(default)]
    legacy: bool,
}

#[derive(Serialize)]
struct DetectResponse {
    spans_per_page: Vec<Vec<EntitySpan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    legacy_index: Option<EntityIndex>,
}

#[derive(Deserialize)]
struct AnonymizeRequest {
    pages: Vec<String>,
    /// Com um caminho de documento, o mapeamento é salvo ao lado dele.
    #[serde(default)]
    anchor_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct AnonymizeResponse {
    #[serde(flatten)]
    outcome: anon_core::AnonymizationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    mapping_path: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RevertRequest {
    pages: Vec<String>,
    #[serde(default)]
    mapping: Option<Mapping>,
    #[serde(default)]
    mapping_path: Option<PathBuf>,
    /// Originais para conferir o resultado página a página.
    #[serde(default)]
    original: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct FileRequest {
    path: PathBuf,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    pages: Vec<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    recognizer: RecognizerStatus,
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .route("/detect", post(detect_handler))
        .route("/anonymize", post(anonymize_handler))
        .route("/revert", post(revert_handler))
        .route("/anonymize-file", post(anonymize_file_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = match std::env::var("ANON_CONFIG") {
        Ok(path) => AnonConfig::load(&path),
        Err(_) => Ok(AnonConfig::default()),
    };
    let state = match config.and_then(AppState::new) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(code = e.code(), "configuração inválida: {e}");
            std::process::exit(1);
        }
    };

    let bind = state.config.server.bind.clone();
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("não foi possível escutar em {bind}: {e}");
            std::process::exit(1);
        }
    };
    info!("Servidor de anonimização iniciado em http://{bind}");
    if let Err(e) = axum::serve(listener, app(state)).await {
        error!("servidor encerrado com erro: {e}");
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        recognizer: state.detector.recognizer_status().clone(),
    })
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(domain, text)| {
            serde_json::json!({
                "domain": domain,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

async fn detect_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, ApiError> {
    require_pages(&req.pages)?;
    let response = blocking(move || {
        let spans_per_page = state.detector.detect_pages(&req.pages);
        let legacy_index = req
            .legacy
            .then(|| state.detector.detect_all_pages(&req.pages));
        Ok(DetectResponse {
            spans_per_page,
            legacy_index,
        })
    })
    .await?;
    Ok(Json(response))
}

async fn anonymize_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnonymizeRequest>,
) -> Result<Json<AnonymizeResponse>, ApiError> {
    require_pages(&req.pages)?;
    let response = blocking(move || {
        let outcome = state.pipeline()?.run(&req.pages)?;
        let mapping_path = match &req.anchor_path {
            Some(anchor) => Some(state.store.save(&outcome.mapping, anchor)?),
            None => None,
        };
        Ok(AnonymizeResponse {
            outcome,
            mapping_path,
        })
    })
    .await?;
    Ok(Json(response))
}

async fn revert_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevertRequest>,
) -> Result<Json<anon_core::RevertReport>, ApiError> {
    if req.mapping.is_none() && req.mapping_path.is_none() {
        return Err(ApiError::BadRequest(
            "informe `mapping` ou `mapping_path`".to_string(),
        ));
    }
    let report = blocking(move || {
        let mapping = match req.mapping {
            Some(mapping) => mapping,
            None => match &req.mapping_path {
                Some(path) => state.store.load(path)?,
                None => Mapping::new(),
            },
        };
        state
            .pipeline()?
            .revert_session(&req.pages, &mapping, req.original.as_deref())
    })
    .await?;
    Ok(Json(report))
}

async fn anonymize_file_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FileRequest>,
) -> Result<Json<anon_core::DocumentOutcome>, ApiError> {
    let outcome = blocking(move || {
        state
            .pipeline()?
            .process_document(&req.path, &TextPages, &TextPages, &state.store)
    })
    .await?;
    Ok(Json(outcome))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe páginas, executa o pipeline e repassa os eventos ao cliente
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {pages}; senão o texto inteiro é uma página
                let pages = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => req.pages,
                    Err(_) => vec![text.trim().to_string()],
                };
                if pages.iter().all(|p| p.trim().is_empty()) {
                    continue;
                }

                info!(pages = pages.len(), "anonimizando via WebSocket");

                let (tx_std, rx_std) = std::sync::mpsc::channel::<PipelineEvent>();
                let state_for_thread = Arc::clone(&state);

                // O pipeline é síncrono: roda fora do runtime
                let handle = tokio::task::spawn_blocking(move || match state_for_thread.pipeline() {
                    Ok(mut pipeline) => {
                        let _ = pipeline.run_streaming(&pages, tx_std);
                    }
                    Err(e) => {
                        let _ = tx_std.send(PipelineEvent::Error {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        });
                    }
                });
                handle.await.ok();

                let events: Vec<PipelineEvent> = rx_std.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return; // cliente desconectou
                        }
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const SCENARIO: &str = "CPF: 123.456.789-09, contato: joao@ex.com";

    fn test_app() -> Router {
        app(Arc::new(AppState::new(AnonConfig::default()).unwrap()))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_pipelines_reuse_state_detector() {
        let state = AppState::new(AnonConfig::default()).unwrap();
        let first = state.pipeline().unwrap();
        let second = state.pipeline().unwrap();
        assert!(std::ptr::eq(first.detector(), &*state.detector));
        assert!(std::ptr::eq(second.detector(), &*state.detector));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymize_then_revert() {
        let (status, body) =
            post_json(test_app(), "/anonymize", serde_json::json!({ "pages": [SCENARIO] })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"][0], "CPF: [TAX_ID_1], contato: [EMAIL_1]");
        assert_eq!(body["mapping"]["123.456.789-09"], "[TAX_ID_1]");

        let (status, reverted) = post_json(
            test_app(),
            "/revert",
            serde_json::json!({ "pages": body["pages"], "mapping": body["mapping"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reverted["pages"][0], SCENARIO);
    }

    #[tokio::test]
    async fn test_empty_pages_rejected() {
        let (status, body) =
            post_json(test_app(), "/detect", serde_json::json!({ "pages": ["  "] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "ANON_BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_ambiguous_reversal_is_conflict() {
        let (status, body) = post_json(
            test_app(),
            "/revert",
            serde_json::json!({
                "pages": ["[P_1] chegou"],
                "mapping": { "João": "[P_1]", "Maria": "[P_1]" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ANON_AMBIGUOUS_REVERSAL");
    }

    #[tokio::test]
    async fn test_missing_mapping_file_is_not_found() {
        let (status, body) = post_json(
            test_app(),
            "/revert",
            serde_json::json!({ "pages": ["x"], "mapping_path": "/nao/existe_mapping.json" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ANON_MAPPING_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_anonymize_saves_mapping_beside_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = dir.path().join("processo.pdf");
        let (status, body) = post_json(
            test_app(),
            "/anonymize",
            serde_json::json!({ "pages": [SCENARIO], "anchor_path": anchor }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let saved = dir.path().join("processo_mapping.json");
        assert_eq!(body["mapping_path"], saved.to_str().unwrap());
        assert!(saved.exists());
    }

    #[tokio::test]
    async fn test_detect_legacy_view() {
        let (status, body) = post_json(
            test_app(),
            "/detect",
            serde_json::json!({ "pages": [SCENARIO], "legacy": true }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["spans_per_page"][0].as_array().unwrap().len(), 2);
        assert_eq!(body["legacy_index"]["123.456.789-09"], "TAX_ID");
    }
}
