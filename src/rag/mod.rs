//! Retrieval and grounded-answer composition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::clients::{CompletionClient, Embedder};
use crate::error::PipelineError;
use crate::store::{ChunkStore, DocumentStore};
use crate::types::{AppConfig, ChunkMatch};
use crate::{CHAT_MATCH_COUNT, SEARCH_MATCH_COUNT};

/// Context marker used when retrieval comes back empty, so the model
/// can say the documents do not cover the question.
const NO_CONTEXT_MARKER: &str = "No relevant documents were found for this query.";

/// A generated answer plus the chunks it was grounded in.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub message: String,
    /// Every retrieved chunk's document, whether or not the model cited it
    pub sources: Vec<SourceRef>,
}

/// Citation entry for one retrieved chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_name: String,
    pub similarity: f32,
}

/// Composes grounded answers: embeds the query, retrieves matching
/// chunks from the caller's category, and asks the completion service
/// to answer strictly from that context.
///
/// Stateless and safely concurrent; holds only shared read access to
/// the chunk store.
pub struct AnswerComposer {
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionClient>,
    similarity_threshold: f32,
}

impl AnswerComposer {
    /// Create a new composer over the given collaborators.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            documents,
            chunks,
            embedder,
            completion,
            similarity_threshold: config.similarity_threshold,
        }
    }

    /// Answer a user message from the documents of one category.
    ///
    /// Embedding and completion failures are fatal to the request;
    /// empty retrieval is not, the model is asked to say so instead.
    pub async fn answer(
        &self,
        message: &str,
        category_id: Uuid,
    ) -> Result<ChatAnswer, PipelineError> {
        let query = self.embedder.embed(message).await?;
        let matches = self
            .chunks
            .search(&query, category_id, self.similarity_threshold, CHAT_MATCH_COUNT)
            .await?;
        info!(
            category_id = %category_id,
            matches = matches.len(),
            "Retrieved context for chat message"
        );

        let category_name = match self.documents.get_category(category_id).await {
            Ok(category) => category.name,
            Err(_) => "the selected category".to_string(),
        };

        let context = build_context(&matches);
        let system_prompt = build_system_prompt(&category_name, &context);
        let answer = self.completion.complete(&system_prompt, message).await?;

        let sources = matches
            .into_iter()
            .map(|m| SourceRef {
                document_name: m.document_name,
                similarity: m.similarity,
            })
            .collect();

        Ok(ChatAnswer {
            message: answer,
            sources,
        })
    }

    /// Generic similarity search over one category's chunks.
    pub async fn search_chunks(
        &self,
        query: &str,
        category_id: Uuid,
    ) -> Result<Vec<ChunkMatch>, PipelineError> {
        let embedding = self.embedder.embed(query).await?;
        self.chunks
            .search(
                &embedding,
                category_id,
                self.similarity_threshold,
                SEARCH_MATCH_COUNT,
            )
            .await
    }
}

/// Concatenate retrieved chunks into a context block labeled per
/// source document.
fn build_context(matches: &[ChunkMatch]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT_MARKER.to_string();
    }
    matches
        .iter()
        .map(|m| format!("Document: {}\nContent: {}", m.document_name, m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System instruction that restricts the model to the supplied context.
fn build_system_prompt(category_name: &str, context: &str) -> String {
    format!(
        "You are an assistant that answers questions from the documents in the \"{category_name}\" category.\n\n\
         INSTRUCTIONS:\n\
         - Answer using only the information in the document context below\n\
         - If the answer is not in the context, state clearly that the available documents do not contain that information\n\
         - Cite the relevant documents where appropriate\n\
         - Keep a professional, helpful tone\n\n\
         DOCUMENT CONTEXT:\n{context}"
    )
}
