use crate::client::RagClient;
use crate::types::*;

use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::prompt::PromptRouter, tool::ToolRouter, wrapper::Parameters},
    model::*,
    prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct RagMcpServer {
    client: Arc<RagClient>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl RagMcpServer {
    /// Create a new RAG MCP server with default configuration
    pub async fn new() -> Result<Self> {
        let client = RagClient::new().await?;
        Self::with_client(Arc::new(client))
    }

    /// Create a new RAG MCP server with an existing client
    pub fn with_client(client: Arc<RagClient>) -> Result<Self> {
        Ok(Self {
            client,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &RagClient {
        &self.client
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Serialization failed: {}", e))
}

#[tool_router(router = tool_router)]
impl RagMcpServer {
    #[tool(
        description = "Ingest a document: normalize, split into chunks, embed and store them for retrieval. Unchanged content is skipped unless force is set."
    )]
    async fn index_document(
        &self,
        Parameters(req): Parameters<IndexDocumentRequest>,
    ) -> Result<String, String> {
        // Validate request inputs
        req.validate()?;

        let response = self
            .client
            .index_document(req)
            .await
            .map_err(|e| format!("{:#}", e))?; // Use alternate display to show full error chain

        to_json(&response)
    }

    #[tool(
        description = "Rebuild a document's chunks from scratch, optionally with replacement content"
    )]
    async fn reindex_document(
        &self,
        Parameters(req): Parameters<ReindexDocumentRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .reindex_document(req)
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }

    #[tool(description = "Delete a document and all of its chunks")]
    async fn delete_document(
        &self,
        Parameters(req): Parameters<DocumentRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .delete_document(req)
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }

    #[tool(description = "Get a document's status, chunk count and content")]
    async fn get_document(
        &self,
        Parameters(req): Parameters<DocumentRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let document = self
            .client
            .get_document(&req.document_id)
            .await
            .map_err(|e| format!("{:#}", e))?
            .ok_or_else(|| format!("Document '{}' not found", req.document_id))?;

        to_json(&document)
    }

    #[tool(description = "Find the document chunks most similar to a question")]
    async fn search(&self, Parameters(req): Parameters<SearchRequest>) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .search(req)
            .await
            .map_err(|e| format!("Search unavailable: {:#}", e))?;

        to_json(&response)
    }

    #[tool(description = "Get statistics about the indexed documents")]
    async fn get_statistics(
        &self,
        Parameters(_req): Parameters<StatisticsRequest>,
    ) -> Result<String, String> {
        let response = self
            .client
            .get_statistics()
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }

    #[tool(description = "Clear all indexed documents and chunks")]
    async fn clear_index(
        &self,
        Parameters(_req): Parameters<ClearRequest>,
    ) -> Result<String, String> {
        let response = self
            .client
            .clear_index()
            .await
            .map_err(|e| format!("{:#}", e))?;

        to_json(&response)
    }
}

// Prompts for slash commands
#[prompt_router]
impl RagMcpServer {
    #[prompt(
        name = "ask",
        description = "Answer a question from the indexed FAQ documents"
    )]
    async fn ask_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        let question = args.get("question").and_then(|v| v.as_str()).unwrap_or("");

        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Use the search tool to find FAQ passages relevant to this question, then answer it from those passages only: {}",
                question
            ),
        )])
    }

    #[prompt(
        name = "stats",
        description = "Get statistics about the indexed documents"
    )]
    async fn stats_prompt(&self) -> Vec<PromptMessage> {
        vec![PromptMessage::new_text(
            PromptMessageRole::User,
            "Please get statistics about the indexed documents.",
        )]
    }

    #[prompt(
        name = "clear",
        description = "Clear all indexed documents and chunks"
    )]
    async fn clear_prompt(&self) -> Vec<PromptMessage> {
        vec![PromptMessage::new_text(
            PromptMessageRole::User,
            "Please clear all indexed documents and chunks.",
        )]
    }
}

#[tool_handler(router = self.tool_router)]
#[prompt_handler]
impl ServerHandler for RagMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "faq-rag".into(),
                title: Some("FAQ RAG - Document Chunking and Similarity Retrieval".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Retrieval over FAQ and help-center documents. \
                Use index_document to ingest content, search to retrieve the most similar chunks, \
                and get_document or get_statistics to inspect indexing status."
                    .into(),
            ),
        }
    }
}

impl RagMcpServer {
    /// Serve with the default configuration over stdio
    pub async fn serve_stdio() -> Result<()> {
        let server = Self::new().await.context("Failed to create MCP server")?;
        server.run_stdio().await
    }

    /// Serve this server over stdio until the client disconnects
    pub async fn run_stdio(self) -> Result<()> {
        tracing::info!("Starting RAG MCP server");

        let transport = rmcp::transport::io::stdio();

        self.serve(transport).await?.waiting().await?;

        Ok(())
    }
}
