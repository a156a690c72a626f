//! Incremental corpus processing: extraction, memoized summaries and
//! pairwise comparisons, suggested questions and question answering.
//!
//! Every operation takes the caller's [`Session`] by `&mut`; the pipeline
//! itself holds only the generator and the extractor and is cheap to clone.

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::document::{DocumentKind, TextExtractor};
use crate::llm::{parse_suggestions, prompts, render_history, Generation, Generator};
use crate::session::{pair_key, ChatTurn, Document, Session, Speaker};

pub const SUMMARY_FAILED: &str = "Summary generation failed.";
pub const COMPARISON_FAILED: &str = "Comparison failed.";
pub const ANSWER_FAILED: &str = "Answer generation failed.";

#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("No suggestion #{index} ({available} available)")]
    SuggestionOutOfRange { index: usize, available: usize },
    #[error("Unknown document: {0}")]
    UnknownDocument(String),
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestOutcome {
    Added { kind: DocumentKind, chars: usize },
    /// A document with this name is already in the session.
    Duplicate,
    Rejected { reason: String },
    /// Extraction succeeded but produced no text.
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: IngestOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub new_summaries: usize,
    pub new_comparisons: usize,
    pub suggestions_refreshed: bool,
}

impl BatchReport {
    pub fn added(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, IngestOutcome::Added { .. }))
            .count()
    }
}

#[derive(Clone)]
pub struct CorpusPipeline {
    generator: Generator,
    extractor: Arc<dyn TextExtractor>,
}

impl CorpusPipeline {
    pub fn new(generator: Generator, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            generator,
            extractor,
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Extracts and stores one file, then summarizes it.
    pub async fn ingest(&self, session: &mut Session, file: UploadedFile) -> IngestOutcome {
        let UploadedFile { name, bytes } = file;

        if session.documents.contains_key(&name) {
            debug!("Skipping {}: already ingested", name);
            return IngestOutcome::Duplicate;
        }

        let Some(kind) = DocumentKind::from_name(&name) else {
            warn!("Rejecting {}: unsupported file type", name);
            return IngestOutcome::Rejected {
                reason: format!(
                    "Unsupported file type for '{}'. Accepted: pdf, docx, txt, png, jpg, jpeg",
                    name
                ),
            };
        };

        let extractor = self.extractor.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = extractor.extract(kind, &bytes);
            (bytes, result)
        })
        .await;

        let (bytes, text) = match joined {
            Ok((bytes, Ok(text))) => (bytes, text),
            Ok((_, Err(e))) => {
                warn!("Skipping {}: {}", name, e);
                return IngestOutcome::Failed { reason: e.to_string() };
            }
            Err(e) => {
                warn!("Extraction task for {} aborted: {}", name, e);
                return IngestOutcome::Failed {
                    reason: format!("Extraction task aborted: {}", e),
                };
            }
        };

        if text.trim().is_empty() {
            info!("No text extracted from {}, leaving it out of the corpus", name);
            return IngestOutcome::Empty;
        }

        let chars = text.chars().count();
        session.documents.insert_if_absent(
            name.clone(),
            Document {
                name: name.clone(),
                kind,
                bytes,
                text,
                ingested_at: Utc::now(),
            },
        );
        info!("Ingested {} ({}, {} chars)", name, kind, chars);

        if let Err(e) = self.summarize(session, &name).await {
            warn!("Could not summarize {}: {}", name, e);
        }

        IngestOutcome::Added { kind, chars }
    }

    /// Ingests `files` in order, fills in missing comparisons and seeds
    /// suggestions when none exist yet.
    pub async fn ingest_batch(&self, session: &mut Session, files: Vec<UploadedFile>) -> BatchReport {
        let mut report = BatchReport::default();

        for file in files {
            let name = file.name.clone();
            let outcome = self.ingest(session, file).await;
            if matches!(outcome, IngestOutcome::Added { .. }) {
                report.new_summaries += 1;
            }
            report.files.push(FileReport { name, outcome });
        }

        report.new_comparisons = self.compare_all(session).await;

        if !session.suggestion_clicked && session.suggestions.is_empty() && !session.documents.is_empty() {
            self.refresh_suggestions(session).await;
            report.suggestions_refreshed = true;
        }

        info!(
            "Batch done: {} added, {} new comparisons",
            report.added(),
            report.new_comparisons
        );
        report
    }

    /// Summary for `name`, generated on first request only.
    pub async fn summarize(&self, session: &mut Session, name: &str) -> Result<String, PipelineError> {
        if let Some(summary) = session.summaries.get(name) {
            return Ok(summary.clone());
        }

        let text = session
            .documents
            .get(name)
            .map(|doc| doc.text.clone())
            .ok_or_else(|| PipelineError::UnknownDocument(name.to_string()))?;

        let generator = &self.generator;
        let (summary, _) = session
            .summaries
            .get_or_insert_with(name, move || async move {
                generator
                    .generate(&prompts::summary_prompt(&text))
                    .await
                    .or_placeholder(SUMMARY_FAILED)
            })
            .await;
        Ok(summary.clone())
    }

    /// Generates one comparison block; `name_a` is the earlier document.
    pub async fn compare(&self, name_a: &str, text_a: &str, name_b: &str, text_b: &str) -> String {
        self.generator
            .generate(&prompts::comparison_prompt(name_a, text_a, name_b, text_b))
            .await
            .or_placeholder(COMPARISON_FAILED)
    }

    /// Generates every missing pair in insertion order. Returns how many were new.
    pub async fn compare_all(&self, session: &mut Session) -> usize {
        let docs: Vec<(String, String)> = session
            .documents
            .iter()
            .map(|(name, doc)| (name.to_string(), doc.text.clone()))
            .collect();

        let mut created = 0;
        for (i, (first, first_text)) in docs.iter().enumerate() {
            for (second, second_text) in &docs[i + 1..] {
                let key = pair_key(first, second);
                let (_, computed) = session
                    .comparisons
                    .get_or_insert_with(&key, || self.compare(first, first_text, second, second_text))
                    .await;
                if computed {
                    debug!("Compared {}", key);
                    created += 1;
                }
            }
        }
        created
    }

    /// Suggested follow-up questions; any backend problem yields an empty list.
    pub async fn generate_suggestions(&self, corpus: &str, history: &[ChatTurn]) -> Vec<String> {
        let prompt = prompts::suggestions_prompt(corpus, &render_history(history));
        match self.generator.generate(&prompt).await {
            Generation::Success(raw) => parse_suggestions(&raw),
            Generation::Failure(_) | Generation::Unavailable => Vec::new(),
        }
    }

    /// Replaces the session's suggestion list wholesale.
    pub async fn refresh_suggestions(&self, session: &mut Session) {
        let suggestions = self
            .generate_suggestions(&session.corpus_text(), &session.chat_history)
            .await;
        debug!("Refreshed suggestions: {}", suggestions.len());
        session.suggestions = suggestions;
    }

    /// Answers `question` against the whole corpus and records the exchange.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<String, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let corpus = session.corpus_text();
        let answer = self
            .generator
            .generate(&prompts::answer_prompt(&corpus, question))
            .await
            .or_placeholder(ANSWER_FAILED);

        session.chat_history.push(ChatTurn::new(Speaker::User, question));
        session.chat_history.push(ChatTurn::new(Speaker::Assistant, answer.clone()));
        session.pending_question.clear();
        session.suggestion_clicked = false;

        session.suggestions = self.generate_suggestions(&corpus, &session.chat_history).await;
        Ok(answer)
    }

    /// Copies suggestion `index` into the pending question.
    pub fn select_suggestion(&self, session: &mut Session, index: usize) -> Result<String, PipelineError> {
        let suggestion = session
            .suggestions
            .get(index)
            .cloned()
            .ok_or(PipelineError::SuggestionOutOfRange {
                index,
                available: session.suggestions.len(),
            })?;
        session.pending_question = suggestion.clone();
        session.suggestion_clicked = true;
        Ok(suggestion)
    }

    pub fn set_pending_question(&self, session: &mut Session, text: &str) {
        session.set_pending_question(text);
    }

    pub fn reset(&self, session: &mut Session) {
        info!("Resetting session ({} documents)", session.documents.len());
        session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ExtractionError;
    use crate::llm::prompts::{
        ANSWER_INSTRUCTION, COMPARISON_INSTRUCTION, SUGGESTION_INSTRUCTION, SUMMARY_INSTRUCTION,
    };
    use crate::providers::scripted::ScriptedProvider;
    use std::time::Duration;

    /// Reads every file as UTF-8; "corrupt" content fails extraction.
    struct PlainText;

    impl TextExtractor for PlainText {
        fn extract(&self, _kind: DocumentKind, bytes: &[u8]) -> Result<String, ExtractionError> {
            if bytes == b"corrupt" {
                return Err(ExtractionError::PdfParsing("bad xref".to_string()));
            }
            String::from_utf8(bytes.to_vec()).map_err(|e| ExtractionError::Encoding(e.to_string()))
        }
    }

    fn replying_by_kind() -> ScriptedProvider {
        ScriptedProvider::replying(|prompt| {
            let reply = if prompt.starts_with(SUMMARY_INSTRUCTION) {
                "summary"
            } else if prompt.starts_with(COMPARISON_INSTRUCTION) {
                "comparison"
            } else if prompt.starts_with(SUGGESTION_INSTRUCTION) {
                "- Q1?\n* Q2?\n  Q3?\n\n"
            } else {
                "answer"
            };
            Ok(reply.to_string())
        })
    }

    fn pipeline(provider: &ScriptedProvider) -> CorpusPipeline {
        let generator = Generator::new(Box::new(provider.clone()), Duration::from_secs(5));
        CorpusPipeline::new(generator, Arc::new(PlainText))
    }

    fn file(name: &str, text: &str) -> UploadedFile {
        UploadedFile::new(name, text.as_bytes())
    }

    #[tokio::test]
    async fn test_duplicate_upload_is_a_no_op() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        pipeline.ingest_batch(&mut session, vec![file("a.txt", "first")]).await;
        let calls = provider.calls();
        let report = pipeline
            .ingest_batch(&mut session, vec![file("a.txt", "second")])
            .await;

        assert_eq!(report.files[0].outcome, IngestOutcome::Duplicate);
        assert_eq!(session.documents().get("a.txt").unwrap().text, "first");
        assert_eq!(session.summaries().get("a.txt").unwrap(), "summary");
        assert_eq!(provider.calls(), calls);
    }

    #[tokio::test]
    async fn test_every_pair_is_compared_once() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        let first = pipeline
            .ingest_batch(&mut session, vec![file("c.txt", "gamma"), file("a.txt", "alpha")])
            .await;
        assert_eq!(first.new_comparisons, 1);

        let second = pipeline
            .ingest_batch(&mut session, vec![file("b.txt", "beta"), file("d.txt", "delta")])
            .await;
        assert_eq!(second.new_comparisons, 5);

        let keys: Vec<&str> = session.comparisons().keys().collect();
        assert_eq!(
            keys,
            vec![
                "c.txt vs a.txt",
                "c.txt vs b.txt",
                "c.txt vs d.txt",
                "a.txt vs b.txt",
                "a.txt vs d.txt",
                "b.txt vs d.txt",
            ]
        );
        assert_eq!(provider.calls_starting_with(COMPARISON_INSTRUCTION), 6);

        assert_eq!(pipeline.compare_all(&mut session).await, 0);
        assert_eq!(provider.calls_starting_with(COMPARISON_INSTRUCTION), 6);
    }

    #[tokio::test]
    async fn test_summarize_is_idempotent() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        pipeline.ingest(&mut session, file("a.txt", "alpha")).await;
        let first = pipeline.summarize(&mut session, "a.txt").await.unwrap();
        let second = pipeline.summarize(&mut session, "a.txt").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls_starting_with(SUMMARY_INSTRUCTION), 1);
        assert_eq!(
            pipeline.summarize(&mut session, "missing.txt").await,
            Err(PipelineError::UnknownDocument("missing.txt".to_string()))
        );
    }

    #[tokio::test]
    async fn test_backend_failure_stores_placeholders() {
        let provider = ScriptedProvider::failing("503 Service Unavailable");
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        let report = pipeline
            .ingest_batch(&mut session, vec![file("a.txt", "alpha"), file("b.txt", "beta")])
            .await;

        assert_eq!(report.added(), 2);
        assert_eq!(session.summaries().get("a.txt").unwrap(), SUMMARY_FAILED);
        assert_eq!(session.comparisons().get("a.txt vs b.txt").unwrap(), COMPARISON_FAILED);
        assert!(session.suggestions().is_empty());

        let answer = pipeline.ask(&mut session, "What?").await.unwrap();
        assert_eq!(answer, ANSWER_FAILED);
    }

    #[tokio::test]
    async fn test_unavailable_backend_uses_not_initialized_text() {
        let pipeline = CorpusPipeline::new(Generator::unavailable(), Arc::new(PlainText));
        let mut session = Session::new();

        pipeline.ingest_batch(&mut session, vec![file("a.txt", "alpha")]).await;

        assert_eq!(
            session.summaries().get("a.txt").unwrap(),
            crate::llm::NOT_INITIALIZED
        );
        assert!(session.suggestions().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_empty_and_failed_files_stay_out_of_corpus() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        let report = pipeline
            .ingest_batch(
                &mut session,
                vec![
                    file("sheet.xlsx", "cells"),
                    file("blank.txt", "  \n "),
                    file("scan.pdf", "corrupt"),
                    file("ok.TXT", "fine"),
                ],
            )
            .await;

        assert!(matches!(report.files[0].outcome, IngestOutcome::Rejected { .. }));
        assert_eq!(report.files[1].outcome, IngestOutcome::Empty);
        assert!(matches!(report.files[2].outcome, IngestOutcome::Failed { .. }));
        assert_eq!(
            report.files[3].outcome,
            IngestOutcome::Added { kind: DocumentKind::Text, chars: 4 }
        );
        assert_eq!(session.document_names(), vec!["ok.TXT"]);
        assert_eq!(session.summaries().len(), 1);
        assert!(session.comparisons().is_empty());
    }

    #[tokio::test]
    async fn test_first_batch_seeds_suggestions_once() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        let report = pipeline.ingest_batch(&mut session, vec![file("a.txt", "alpha")]).await;
        assert!(report.suggestions_refreshed);
        assert_eq!(session.suggestions(), ["Q1?", "Q2?", "Q3?"]);

        let report = pipeline.ingest_batch(&mut session, vec![file("b.txt", "beta")]).await;
        assert!(!report.suggestions_refreshed);
        assert_eq!(provider.calls_starting_with(SUGGESTION_INSTRUCTION), 1);
    }

    #[tokio::test]
    async fn test_clicked_suggestion_blocks_batch_regeneration() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        session.suggestion_clicked = true;
        let report = pipeline.ingest_batch(&mut session, vec![file("a.txt", "alpha")]).await;

        assert!(!report.suggestions_refreshed);
        assert_eq!(provider.calls_starting_with(SUGGESTION_INSTRUCTION), 0);
    }

    #[tokio::test]
    async fn test_ask_records_exchange_and_regenerates_suggestions() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        pipeline
            .ingest_batch(&mut session, vec![file("a.txt", "alpha"), file("b.txt", "beta")])
            .await;
        pipeline.select_suggestion(&mut session, 1).unwrap();
        assert_eq!(session.pending_question(), "Q2?");
        assert!(session.suggestion_clicked());

        let answer = pipeline.ask(&mut session, "  Q2? ").await.unwrap();

        assert_eq!(answer, "answer");
        assert_eq!(
            session.chat_history(),
            [
                ChatTurn::new(Speaker::User, "Q2?"),
                ChatTurn::new(Speaker::Assistant, "answer"),
            ]
        );
        assert!(session.pending_question().is_empty());
        assert!(!session.suggestion_clicked());
        assert_eq!(provider.calls_starting_with(SUGGESTION_INSTRUCTION), 2);

        let prompts = provider.prompts();
        let answer_prompt = prompts.iter().find(|p| p.starts_with(ANSWER_INSTRUCTION)).unwrap();
        assert!(answer_prompt.contains("alpha\n\nbeta"));
        let last_suggestion_prompt = prompts.last().unwrap();
        assert!(last_suggestion_prompt.contains("User: Q2?\nAssistant: answer"));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_without_side_effects() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        assert_eq!(pipeline.ask(&mut session, "   ").await, Err(PipelineError::EmptyQuestion));
        assert!(session.chat_history().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_suggestion_is_an_error() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        assert_eq!(
            pipeline.select_suggestion(&mut session, 0),
            Err(PipelineError::SuggestionOutOfRange { index: 0, available: 0 })
        );
        assert!(!session.suggestion_clicked());
    }

    #[tokio::test]
    async fn test_reset_then_reupload_regenerates() {
        let provider = replying_by_kind();
        let pipeline = pipeline(&provider);
        let mut session = Session::new();

        pipeline.ingest_batch(&mut session, vec![file("a.txt", "alpha")]).await;
        pipeline.ask(&mut session, "Why?").await.unwrap();
        let token = session.upload_token();

        pipeline.reset(&mut session);
        assert!(session.documents().is_empty());
        assert!(session.chat_history().is_empty());
        assert!(session.suggestions().is_empty());
        assert_ne!(session.upload_token(), token);

        pipeline.ingest_batch(&mut session, vec![file("a.txt", "alpha v2")]).await;
        assert_eq!(session.documents().get("a.txt").unwrap().text, "alpha v2");
        assert_eq!(provider.calls_starting_with(SUMMARY_INSTRUCTION), 2);
    }
}
