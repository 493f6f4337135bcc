

use chrono::{DateTime, Utc};
use rmcp::{
    handler::server::{
        router::tool::ToolRouter,
        router::prompt::PromptRouter,
        wrapper::Parameters,
    },
    model::*,
    tool, tool_handler, tool_router,
    prompt, prompt_handler, prompt_router,
    transport::stdio,
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::QueryMindConfig;
use crate::core::error::QueryMindError;
use crate::core::intent::IntentLabel;
use crate::core::models::{ClassifyIntentRequest, RecordClicksRequest, UpsertQueryConceptRequest};
use crate::core::querymind_client::QueryMindClient;
use crate::safe_truncate;


#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct ClassifyIntentParams {
    #[schemars(description = "Search query to classify")]
    pub query: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct UpsertQueryConceptParams {
    #[schemars(description = "Search query to file under a concept")]
    pub query: String,
    #[schemars(
        description = "Intent label: 'Research', 'Answer', 'Transactional', 'News', 'Navigational'"
    )]
    pub intent: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct RecordClicksParams {
    #[schemars(description = "Query the links were clicked from")]
    pub query: String,
    #[schemars(description = "Clicked link URLs (absolute, with host)")]
    pub links: Vec<String>,
    #[schemars(description = "Optional intent label for the query node")]
    pub intent: Option<String>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct LinksForConceptParams {
    #[schemars(description = "Exact concept name")]
    pub concept: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct LinksForTopicParams {
    #[schemars(description = "Free text; resolved to its nearest concept first")]
    pub text: String,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct SubmitQueryParams {
    #[schemars(description = "Search query to classify and store")]
    pub query: String,
}


#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConceptReviewArgs {
    #[schemars(description = "Optional concept to focus on")]
    pub concept: Option<String>,
}


#[derive(Clone)]
pub struct QueryMindMcpServer {
    client: Arc<QueryMindClient>,
    started_at: DateTime<Utc>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl QueryMindMcpServer {

    pub fn new(client: QueryMindClient) -> Self {
        Self {
            client: Arc::new(client),
            started_at: Utc::now(),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }


    fn convert_error(err: QueryMindError) -> McpError {
        match err {
            QueryMindError::Validation(msg) => McpError::invalid_params(msg, None),
            QueryMindError::Config(msg) => McpError::invalid_params(msg, None),
            QueryMindError::MalformedEvidence(msg) => {
                McpError::internal_error(format!("Malformed evidence: {}", msg), None)
            }
            other => McpError::internal_error(other.to_string(), None),
        }
    }


    fn parse_intent(raw: &str) -> Result<IntentLabel, McpError> {
        raw.trim().parse::<IntentLabel>().map_err(|_| {
            McpError::invalid_params(
                format!("Unknown intent label: {}", raw),
                Some(json!({ "allowed": IntentLabel::all() })),
            )
        })
    }


    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_router]
impl QueryMindMcpServer {

    #[tool(description = "Classify a search query into one of Research, Answer, Transactional, News, Navigational. Uses concept memory first, zero-shot ensemble when memory is not decisive. Returns: {label, confidence, source}")]
    async fn classify_intent(
        &self,
        Parameters(params): Parameters<ClassifyIntentParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("🎯 Classifying: '{}'", safe_truncate(&params.query, 50));

        let result = self
            .client
            .classify_intent(ClassifyIntentRequest { query: params.query })
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "File a query under its concept: connect to similar concepts, or extract and create a new one. Returns: {query, outcome}")]
    async fn upsert_query_concept(
        &self,
        Parameters(params): Parameters<UpsertQueryConceptParams>,
    ) -> Result<CallToolResult, McpError> {
        let intent = Self::parse_intent(&params.intent)?;
        info!(
            "🧩 Upserting concept for '{}' [{}]",
            safe_truncate(&params.query, 50),
            intent
        );

        let result = self
            .client
            .upsert_query_concept(UpsertQueryConceptRequest {
                query: params.query,
                intent,
            })
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Record links clicked for a query. Idempotent per (query, link). Returns: {query, recorded}")]
    async fn record_clicks(
        &self,
        Parameters(params): Parameters<RecordClicksParams>,
    ) -> Result<CallToolResult, McpError> {
        let intent = params
            .intent
            .as_deref()
            .map(Self::parse_intent)
            .transpose()?;
        info!(
            "🔗 Recording {} click(s) for '{}'",
            params.links.len(),
            safe_truncate(&params.query, 50)
        );

        let result = self
            .client
            .record_clicks(RecordClicksRequest {
                query: params.query,
                intent,
                links: params.links,
            })
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Links clicked from queries filed under a concept. Returns: {concept, links}")]
    async fn links_for_concept(
        &self,
        Parameters(params): Parameters<LinksForConceptParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .client
            .links_for_concept(&params.concept)
            .await
            .map_err(Self::convert_error)?;

        if result.links.is_empty() {
            warn!("⚠️ No links for concept '{}'", params.concept);
        }

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Resolve free text to its nearest concept and return that concept's links. Returns: {concept, links}")]
    async fn links_for_topic(
        &self,
        Parameters(params): Parameters<LinksForTopicParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .client
            .links_for_topic(&params.text)
            .await
            .map_err(Self::convert_error)?;

        info!("✅ '{}' -> {} ({} links)", safe_truncate(&params.text, 30), result.concept, result.links.len());

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Classify a query and file it under a concept in one step. Returns: {query, decision, outcome}")]
    async fn submit_query(
        &self,
        Parameters(params): Parameters<SubmitQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .client
            .submit_query(&params.query)
            .await
            .map_err(Self::convert_error)?;

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Export the whole concept graph. Returns: {nodes: [...], edges: [...]}")]
    async fn export_graph(&self) -> Result<CallToolResult, McpError> {
        let result = self
            .client
            .export_graph()
            .await
            .map_err(Self::convert_error)?;

        info!("📊 Exported {} nodes, {} edges", result.nodes.len(), result.edges.len());

        let json = Self::result_to_json(&result)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}


#[prompt_router]
impl QueryMindMcpServer {

    #[prompt(
        name = "concept_review",
        description = "Generate prompt to review the concept graph and its clicked links"
    )]
    async fn concept_review(
        &self,
        Parameters(args): Parameters<ConceptReviewArgs>,
    ) -> Result<GetPromptResult, McpError> {
        let focus = args
            .concept
            .as_ref()
            .map(|c| format!(
                "Start with links_for_concept for \"{}\", then widen to its neighbours.",
                c
            ))
            .unwrap_or_else(|| "Start with export_graph.".to_string());

        let messages = vec![
            PromptMessage::new_text(
                PromptMessageRole::User,
                format!(
                    "Review the QueryMind concept graph. {}

Report:
1. Concepts that look like duplicates of each other
2. Queries whose intent disagrees with their concept's intent
3. Concepts with no clicked links",
                    focus
                ),
            ),
        ];

        Ok(GetPromptResult {
            description: Some("Concept graph review".to_string()),
            messages,
        })
    }


    #[prompt(
        name = "tool_selection_guide",
        description = "Guide for AI to select the right QueryMind tool"
    )]
    async fn tool_selection_guide(&self) -> Result<GetPromptResult, McpError> {
        let guide = r#"# QueryMind Tools

## submit_query
The usual entry point. Classifies the query and files it under a concept.

## classify_intent
Only the intent label, nothing is stored.

## upsert_query_concept
You already know the intent and only want the query filed.

## record_clicks
After the user opened results. Repeating the same click is harmless.

## links_for_concept / links_for_topic
Retrieve links. Use links_for_topic when you only have free text.

## export_graph
Full dump for inspection. Large graphs are slow."#;

        Ok(GetPromptResult {
            description: Some("QueryMind tool selection guide".to_string()),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, guide)],
        })
    }
}


#[tool_handler]
#[prompt_handler]
impl ServerHandler for QueryMindMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "querymind".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "QueryMind classifies search query intent and keeps a concept graph of queries \
                 and clicked links. Use submit_query to classify and store, record_clicks after \
                 results are opened, and links_for_topic to retrieve links."
                    .to_string(),
            ),
        }
    }


    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("config://querymind", "querymind-config".to_string())
                    .no_annotation(),
                RawResource::new("status://store", "store-status".to_string())
                    .no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            "config://querymind" => {
                let config = self.client.config();

                let content = serde_json::to_string_pretty(&json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "store": {
                        "backend": config.store_backend,
                        "host": config.helix_host,
                        "port": config.helix_port,
                    },
                    "llm": {
                        "provider": config.llm_provider,
                        "model": config.llm_model,
                    },
                    "embedding": {
                        "provider": config.embedding_provider,
                        "model": config.embedding_model,
                    },
                    "zero_shot": {
                        "model": config.zero_shot_model,
                    },
                    "thresholds": {
                        "create": config.create_threshold,
                        "connect": config.connect_threshold,
                        "early_exit": config.early_exit_threshold,
                        "top_k": config.similarity_top_k,
                    },
                    "tools": [
                        "classify_intent",
                        "upsert_query_concept",
                        "record_clicks",
                        "links_for_concept",
                        "links_for_topic",
                        "submit_query",
                        "export_graph",
                    ],
                })).map_err(|e| McpError::internal_error(e.to_string(), None))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            "status://store" => {
                let status = match self.client.initialize().await {
                    Ok(()) => "connected".to_string(),
                    Err(e) => format!("unreachable: {}", e),
                };

                let content = serde_json::to_string_pretty(&json!({
                    "status": status,
                    "backend": self.client.store_backend(),
                    "ensemble_ready": self.client.ensemble_ready().await,
                    "started_at": self.started_at.to_rfc3339(),
                })).map_err(|e| McpError::internal_error(e.to_string(), None))?;

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            _ => Err(McpError::resource_not_found(
                format!("Unknown resource: {}", uri),
                Some(json!({ "uri": uri })),
            )),
        }
    }
}


pub async fn run_server() -> anyhow::Result<()> {
    info!("🚀 Initializing QueryMind MCP Server...");

    let config = QueryMindConfig::load()?;
    let client = QueryMindClient::new(config)?;
    client.initialize().await?;

    info!("✅ QueryMind MCP Server ready");
    info!("   📍 Store: {}", client.store_backend());
    info!(
        "   🤖 LLM: {}/{}",
        client.config().llm_provider,
        client.config().llm_model
    );
    info!("   🎯 Zero-shot: {}", client.config().zero_shot_model);

    let server = QueryMindMcpServer::new(client);
    let client = server.client.clone();
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    client.shutdown().await;
    Ok(())
}
