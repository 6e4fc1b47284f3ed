use super::{DEFAULT_TIMEOUT, PlatformProfile};

/// Zhipu (BigModel) GLM chat completions.
pub fn profile() -> PlatformProfile {
    PlatformProfile {
        code: "zhipu".to_string(),
        name: "智谱AI".to_string(),
        endpoint: "https://open.bigmodel.cn/api/paas/v4/chat/completions".to_string(),
        model: "glm-4-flash".to_string(),
        max_tokens: 10,
        temperature: Some(0.1),
        mask_prefix: "sk-".to_string(),
        default_prompts: [
            "1+1=?",
            "北京是中国的首都吗？",
            "今天的日期是？",
            "Python是什么编程语言？",
            "Hello",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect(),
        timeout: DEFAULT_TIMEOUT,
    }
}
