pub mod chat;
mod doubao;
pub mod registry;
mod zhipu;

use async_trait::async_trait;
use std::time::Duration;

use crate::core::config::PlatformOverrides;
use crate::core::store::types::ExecutionLog;

pub use chat::ChatKeepaliveAdapter;
pub use registry::AdapterRegistry;

pub const LOG_TYPE_KEEPALIVE: &str = "keepalive";
pub const LOG_CATEGORY_AI: &str = "ai";

/// One external AI platform that can be pinged to keep its credentials alive.
///
/// `call_keepalive` never fails: transport, HTTP and parsing errors are folded
/// into a failed [`ExecutionLog`] with the elapsed time still recorded.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform_code(&self) -> &str;

    fn platform_name(&self) -> &str;

    fn model(&self) -> &str;

    /// Marker placed before the masked tail of every credential logged for this platform.
    fn mask_prefix(&self) -> &str;

    fn task_code(&self) -> String {
        format!("{}_keepalive", self.platform_code())
    }

    async fn call_keepalive(&self, credential: &str, prompt: Option<&str>) -> ExecutionLog;
}

/// Static description of an OpenAI-compatible chat endpoint used for probes.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub code: String,
    pub name: String,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// `None` leaves the field out of the request entirely.
    pub temperature: Option<f32>,
    pub mask_prefix: String,
    pub default_prompts: Vec<String>,
    pub timeout: Duration,
}

impl PlatformProfile {
    pub fn with_overrides(mut self, overrides: &PlatformOverrides) -> Self {
        if let Some(endpoint) = &overrides.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(model) = &overrides.model {
            self.model = model.clone();
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout = Duration::from_secs(secs.max(1));
        }
        self
    }
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn builtin_profiles() -> Vec<PlatformProfile> {
    vec![zhipu::profile(), doubao::profile()]
}

/// Keeps only the last four characters behind `prefix`; short keys collapse to a placeholder.
pub fn mask_credential(prefix: &str, credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() < 8 {
        return format!("{}****", prefix);
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", prefix, tail)
}
