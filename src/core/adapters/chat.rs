use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use super::{LOG_CATEGORY_AI, LOG_TYPE_KEEPALIVE, PlatformAdapter, PlatformProfile, mask_credential};
use crate::core::config::{ConfigProvider, parse_string_list, prompt_pool_key};
use crate::core::store::types::{ExecutionLog, ExecutionStatus, LogContent};

const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageOwned>,
}

#[derive(Deserialize)]
struct ChatMessageOwned {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

struct ChatReply {
    content: String,
    usage: ChatUsage,
}

/// Keepalive adapter for any OpenAI-compatible chat completions endpoint.
pub struct ChatKeepaliveAdapter {
    profile: PlatformProfile,
    client: Client,
    config: Option<Arc<dyn ConfigProvider>>,
}

impl ChatKeepaliveAdapter {
    pub fn new(profile: PlatformProfile, config: Option<Arc<dyn ConfigProvider>>) -> Result<Self> {
        let client = Client::builder().timeout(profile.timeout).build()?;
        Ok(Self {
            profile,
            client,
            config,
        })
    }

    #[cfg(test)]
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Picks a random prompt, preferring a non-empty pool from `ai.<platform>.prompts`.
    async fn pick_prompt(&self) -> String {
        let mut pool = Vec::new();
        if let Some(config) = &self.config {
            let raw = config.get_string(&prompt_pool_key(&self.profile.code), "").await;
            if !raw.trim().is_empty() {
                pool = parse_string_list(&raw).unwrap_or_default();
            }
        }
        if pool.is_empty() {
            pool = self.profile.default_prompts.clone();
        }
        pool.choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "Hello".to_string())
    }

    async fn send(&self, credential: &str, prompt: &str) -> Result<ChatReply> {
        let req = ChatRequest {
            model: &self.profile.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.profile.max_tokens,
            temperature: self.profile.temperature,
        };

        let res = self
            .client
            .post(&self.profile.endpoint)
            .bearer_auth(credential)
            .json(&req)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body: String = res
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(anyhow!(
                "{} API error ({}): {}",
                self.profile.name,
                status,
                body
            ));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| anyhow!("malformed response: {}", e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| anyhow!("malformed response: missing choices[0].message.content"))?;

        Ok(ChatReply {
            content,
            usage: parsed.usage.unwrap_or_default(),
        })
    }

    fn base_log(&self, status: ExecutionStatus, title: String, content: LogContent) -> ExecutionLog {
        ExecutionLog {
            id: None,
            log_type: LOG_TYPE_KEEPALIVE.to_string(),
            log_category: LOG_CATEGORY_AI.to_string(),
            platform_code: self.profile.code.clone(),
            task_code: self.task_code(),
            title,
            model: Some(self.profile.model.clone()),
            status,
            error_message: None,
            content,
            duration_ms: 0,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PlatformAdapter for ChatKeepaliveAdapter {
    fn platform_code(&self) -> &str {
        &self.profile.code
    }

    fn platform_name(&self) -> &str {
        &self.profile.name
    }

    fn model(&self) -> &str {
        &self.profile.model
    }

    fn mask_prefix(&self) -> &str {
        &self.profile.mask_prefix
    }

    async fn call_keepalive(&self, credential: &str, prompt: Option<&str>) -> ExecutionLog {
        let started = Instant::now();
        let prompt = match prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => self.pick_prompt().await,
        };
        let masked = mask_credential(self.mask_prefix(), credential);

        let result = if credential.trim().is_empty() {
            Err(anyhow!("credential is empty"))
        } else {
            self.send(credential, &prompt).await
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut log = match result {
            Ok(reply) => {
                let title = format!(
                    "{}保活成功 - Token消耗: {}",
                    self.profile.name, reply.usage.total_tokens
                );
                let content = LogContent {
                    api_key_masked: masked,
                    prompt,
                    response: Some(reply.content),
                    prompt_tokens: Some(reply.usage.prompt_tokens),
                    completion_tokens: Some(reply.usage.completion_tokens),
                    total_tokens: Some(reply.usage.total_tokens),
                    model: Some(self.profile.model.clone()),
                    ..Default::default()
                };
                self.base_log(ExecutionStatus::Success, title, content)
            }
            Err(e) => {
                let mut message = format!("{:#}", e);
                if !credential.is_empty() {
                    message = message.replace(credential, &masked);
                }
                let content = LogContent {
                    api_key_masked: masked,
                    prompt,
                    error: Some(message.clone()),
                    ..Default::default()
                };
                let title = format!("{}保活失败", self.profile.name);
                let mut log = self.base_log(ExecutionStatus::Failed, title, content);
                log.error_message = Some(message);
                log
            }
        };
        log.duration_ms = duration_ms;
        log
    }
}
