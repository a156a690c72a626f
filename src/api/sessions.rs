use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{ApiError, ApiResult, AppState};
use crate::document::DocumentKind;
use crate::pipeline::{BatchReport, UploadedFile};
use crate::session::{ChatTurn, Session};

type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Bounded map of live sessions. The least recently used session is
/// dropped when capacity is reached.
pub struct SessionRegistry {
    sessions: Mutex<LruCache<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(tokio::sync::Mutex::new(Session::new()));
        if let Some((evicted, _)) = self.sessions.lock().push(id, session.clone()) {
            tracing::info!(session = %evicted, "Session evicted, registry at capacity");
        }
        (id, session)
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, ApiError> {
    state.sessions.get(&id).ok_or(ApiError::SessionNotFound(id))
}

#[derive(Serialize)]
pub struct DocumentView {
    name: String,
    kind: DocumentKind,
    chars: usize,
    ingested_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct NamedText {
    name: String,
    text: String,
}

#[derive(Serialize)]
pub struct SessionView {
    id: Uuid,
    upload_token: Uuid,
    documents: Vec<DocumentView>,
    summaries: Vec<NamedText>,
    comparisons: Vec<NamedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison_notice: Option<&'static str>,
    suggestions: Vec<String>,
    chat_history: Vec<ChatTurn>,
    pending_question: String,
    suggestion_clicked: bool,
}

impl SessionView {
    fn new(id: Uuid, session: &Session) -> Self {
        let named = |(name, text): (&str, &String)| NamedText {
            name: name.to_string(),
            text: text.clone(),
        };
        Self {
            id,
            upload_token: session.upload_token(),
            documents: session
                .documents()
                .iter()
                .map(|(name, doc)| DocumentView {
                    name: name.to_string(),
                    kind: doc.kind,
                    chars: doc.text.chars().count(),
                    ingested_at: doc.ingested_at,
                })
                .collect(),
            summaries: session.summaries().iter().map(named).collect(),
            comparisons: session.comparisons().iter().map(named).collect(),
            comparison_notice: (session.documents().len() < 2)
                .then_some("More than one document is required to perform document comparison."),
            suggestions: session.suggestions().to_vec(),
            chat_history: session.chat_history().to_vec(),
            pending_question: session.pending_question().to_string(),
            suggestion_clicked: session.suggestion_clicked(),
        }
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    report: BatchReport,
    session: SessionView,
}

#[derive(Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 4000))]
    question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    answer: String,
    suggestions: Vec<String>,
}

#[derive(Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(max = 4000))]
    text: String,
}

#[derive(Serialize)]
pub struct QuestionResponse {
    pending_question: String,
    suggestion_clicked: bool,
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    let (id, session) = state.sessions.create();
    tracing::info!(session = %id, live = state.sessions.len(), "Session created");
    let session = session.lock().await;
    (StatusCode::CREATED, Json(SessionView::new(id, &session)))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    let session = lookup(&state, id)?;
    let session = session.lock().await;
    Ok(Json(SessionView::new(id, &session)))
}

pub async fn upload_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let session = lookup(&state, id)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;
        files.push(UploadedFile::new(name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::Upload("no files in request".to_string()));
    }

    let mut session = session.lock().await;
    let report = state.pipeline.ingest_batch(&mut session, files).await;
    tracing::info!(
        session = %id,
        files = report.files.len(),
        added = report.added(),
        comparisons = report.new_comparisons,
        "Upload processed"
    );

    Ok(Json(UploadResponse {
        report,
        session: SessionView::new(id, &session),
    }))
}

pub async fn set_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> ApiResult<QuestionResponse> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let session = lookup(&state, id)?;
    let mut session = session.lock().await;

    state.pipeline.set_pending_question(&mut session, &request.text);
    Ok(Json(QuestionResponse {
        pending_question: session.pending_question().to_string(),
        suggestion_clicked: session.suggestion_clicked(),
    }))
}

pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let session = lookup(&state, id)?;
    let mut session = session.lock().await;

    let answer = state.pipeline.ask(&mut session, &request.question).await?;
    tracing::info!(session = %id, turns = session.chat_history().len(), "Question answered");

    Ok(Json(AskResponse {
        answer,
        suggestions: session.suggestions().to_vec(),
    }))
}

pub async fn select_suggestion(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> ApiResult<QuestionResponse> {
    let session = lookup(&state, id)?;
    let mut session = session.lock().await;

    state.pipeline.select_suggestion(&mut session, index)?;
    Ok(Json(QuestionResponse {
        pending_question: session.pending_question().to_string(),
        suggestion_clicked: session.suggestion_clicked(),
    }))
}

pub async fn reset_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    let session = lookup(&state, id)?;
    let mut session = session.lock().await;

    state.pipeline.reset(&mut session);
    tracing::info!(session = %id, "Session reset");
    Ok(Json(SessionView::new(id, &session)))
}
