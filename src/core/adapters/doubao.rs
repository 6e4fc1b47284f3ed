use super::{DEFAULT_TIMEOUT, PlatformProfile};

/// Volcengine Ark (Doubao). The model id is an inference endpoint id; temperature
/// is left to the endpoint default.
pub fn profile() -> PlatformProfile {
    PlatformProfile {
        code: "doubao".to_string(),
        name: "豆包AI".to_string(),
        endpoint: "https://ark.cn-beijing.volces.com/api/v3/chat/completions".to_string(),
        model: "ep-20241210145508-wx2gk".to_string(),
        max_tokens: 10,
        temperature: None,
        mask_prefix: "ak-".to_string(),
        default_prompts: ["1+1=?", "你好", "今天天气怎么样？", "什么是AI？", "Hi"]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        timeout: DEFAULT_TIMEOUT,
    }
}
