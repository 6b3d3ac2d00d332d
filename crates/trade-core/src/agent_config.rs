// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent Factory (C6): produces the three agent configurations by binding
//! instructions (via the prompt registry) and tools (via the tool layer).
//! Stateless per call — there is no global "current agent".

use std::collections::HashMap;
use std::sync::Arc;

use trade_prompts::PromptError;
use trade_tools::{SearchTradeDocumentsTool, SearchUserDocumentTool, SearchWebTool, ToolRegistry, VectorSearch};

/// A bound agent configuration, ready to be handed to the runner.
pub struct AgentConfig {
    pub name: String,
    pub model_id: String,
    pub instructions: String,
    pub tools: Arc<ToolRegistry>,
}

pub struct AgentFactory {
    pub prompts: Arc<trade_prompts::PromptRegistry>,
    pub knowledge_search: Arc<dyn VectorSearch>,
    pub user_doc_search: Arc<dyn VectorSearch>,
    pub knowledge_collection: String,
    pub user_documents_collection: String,
    pub web_search_api_key: Option<String>,
    pub model_id: String,
}

impl AgentFactory {
    fn knowledge_and_web_tools(&self) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(SearchTradeDocumentsTool { store: self.knowledge_search.clone(), collection: self.knowledge_collection.clone() });
        tools.register(SearchWebTool { api_key: self.web_search_api_key.clone() });
        tools
    }

    pub async fn trade_assistant(&self) -> Result<AgentConfig, PromptError> {
        let template = self.prompts.get_template("trade_assistant_v1", None, "latest").await?;
        let instructions = self.prompts.compile(&template, &HashMap::new())?;
        Ok(AgentConfig { name: "trade_assistant".into(), model_id: self.model_id.clone(), instructions, tools: Arc::new(self.knowledge_and_web_tools()) })
    }

    pub async fn document_writing_assistant(&self, document_content: &str) -> Result<AgentConfig, PromptError> {
        let template = self.prompts.get_template("writing_assistant_v1", None, "latest").await?;
        let mut vars = HashMap::new();
        vars.insert("document_content".to_string(), document_content.to_string());
        let instructions = self.prompts.compile(&template, &vars)?;
        Ok(AgentConfig { name: "document_writing_assistant".into(), model_id: self.model_id.clone(), instructions, tools: Arc::new(self.knowledge_and_web_tools()) })
    }

    pub async fn document_reading_assistant(&self, document_id: &str, document_name: &str, document_type: &str) -> Result<AgentConfig, PromptError> {
        let template = self.prompts.get_template("document_assistant_v1", None, "latest").await?;
        let mut vars = HashMap::new();
        vars.insert("document_id".to_string(), document_id.to_string());
        vars.insert("document_name".to_string(), document_name.to_string());
        vars.insert("document_type".to_string(), document_type.to_string());
        let instructions = self.prompts.compile(&template, &vars)?;

        let mut tools = self.knowledge_and_web_tools();
        tools.register(SearchUserDocumentTool { store: self.user_doc_search.clone(), collection: self.user_documents_collection.clone(), doc_id: document_id.to_string() });
        Ok(AgentConfig { name: "document_reading_assistant".into(), model_id: self.model_id.clone(), instructions, tools: Arc::new(tools) })
    }
}
