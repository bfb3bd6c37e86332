//! 模型提供商预设（均为 OpenAI 兼容格式）
//!
//! - dashscope: 阿里云百炼，Base URL https://dashscope.aliyuncs.com/compatible-mode/v1，默认 qwen-plus
//! - zhipuai: 智谱开放平台，Base URL https://open.bigmodel.cn/api/paas/v4，默认 glm-4-flash
//! - openai: 官方端点，默认 gpt-4o-mini

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

pub const PROVIDER_DASHSCOPE: &str = "dashscope";
pub const PROVIDER_ZHIPUAI: &str = "zhipuai";
pub const PROVIDER_OPENAI: &str = "openai";
pub const PROVIDER_MOCK: &str = "mock";

/// 单个提供商的端点、默认模型与 API Key 环境变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    pub name: &'static str,
    pub base_url: Option<&'static str>,
    pub default_model: &'static str,
    pub api_key_env: &'static str,
}

pub const DASHSCOPE: ProviderPreset = ProviderPreset {
    name: PROVIDER_DASHSCOPE,
    base_url: Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
    default_model: "qwen-plus",
    api_key_env: "DASHSCOPE_API_KEY",
};

pub const ZHIPUAI: ProviderPreset = ProviderPreset {
    name: PROVIDER_ZHIPUAI,
    base_url: Some("https://open.bigmodel.cn/api/paas/v4"),
    default_model: "glm-4-flash",
    api_key_env: "ZHIPUAI_API_KEY",
};

pub const OPENAI: ProviderPreset = ProviderPreset {
    name: PROVIDER_OPENAI,
    base_url: None,
    default_model: "gpt-4o-mini",
    api_key_env: "OPENAI_API_KEY",
};

pub fn preset(provider: &str) -> Option<ProviderPreset> {
    match provider.trim().to_lowercase().as_str() {
        PROVIDER_DASHSCOPE | "bailian" => Some(DASHSCOPE),
        PROVIDER_ZHIPUAI => Some(ZHIPUAI),
        PROVIDER_OPENAI => Some(OPENAI),
        _ => None,
    }
}

/// 根据配置与环境变量选择 LLM 后端；无 API Key 或 provider=mock 时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let Some(p) = preset(&provider) else {
        if provider != PROVIDER_MOCK {
            tracing::warn!("Unknown LLM provider '{}', using Mock LLM", provider);
        }
        return Arc::new(MockLlmClient::default());
    };

    let Ok(api_key) = std::env::var(p.api_key_env) else {
        tracing::warn!("{} not set, using Mock LLM", p.api_key_env);
        return Arc::new(MockLlmClient::default());
    };

    let model = cfg
        .llm
        .model
        .clone()
        .unwrap_or_else(|| p.default_model.to_string());
    let base_url = cfg.llm.base_url.as_deref().or(p.base_url);
    tracing::info!("Using {} LLM ({})", p.name, model);
    Arc::new(OpenAiClient::new(
        base_url,
        &model,
        &api_key,
        Duration::from_secs(cfg.llm.timeouts.request),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset("DashScope"), Some(DASHSCOPE));
        assert_eq!(preset("bailian"), Some(DASHSCOPE));
        assert_eq!(preset("zhipuai").map(|p| p.default_model), Some("glm-4-flash"));
        assert_eq!(preset("openai").and_then(|p| p.base_url), None);
        assert!(preset("mock").is_none());
    }
}
