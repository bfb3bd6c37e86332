//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SKY__*` 覆盖（双下划线表示嵌套，如 `SKY__AGENT__MAX_STEPS=5`）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::constants::{
    DEFAULT_AGENT_NAME, DEFAULT_MAX_STEPS, DEFAULT_STREAM_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub classifier: ClassifierSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [agent] 段：步数与超时预算
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// 整次 run 的墙钟预算（毫秒），在每步开始前检查
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 流式通道等待最终结果的上限（毫秒）
    #[serde(default = "default_stream_timeout_ms")]
    pub stream_timeout_ms: u64,
    /// 为 true 时单步也受剩余预算约束（tokio timeout），否则仅在步间检查
    #[serde(default)]
    pub preempt_on_timeout: bool,
    /// 覆盖默认的客服 system prompt
    pub system_prompt: Option<String>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_steps: default_max_steps(),
            timeout_ms: default_timeout_ms(),
            stream_timeout_ms: default_stream_timeout_ms(),
            preempt_on_timeout: false,
            system_prompt: None,
        }
    }
}

impl AgentSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms)
    }
}

fn default_agent_name() -> String {
    DEFAULT_AGENT_NAME.to_string()
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_stream_timeout_ms() -> u64 {
    DEFAULT_STREAM_TIMEOUT_MS
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// dashscope / zhipuai / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 未设置时使用提供商默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "dashscope".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [classifier] 段：思考结果关键词表；未设置时使用内置列表
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClassifierSection {
    pub action_keywords: Option<Vec<String>>,
    pub direct_keywords: Option<Vec<String>>,
}

/// 默认配置文件的候选位置（不含扩展名），取第一个存在的
const DEFAULT_CONFIG_CANDIDATES: [&str; 3] = ["config/default", "../config/default", "default"];

/// 加载配置：默认文件 → `config_path`（存在时，可覆盖前者）→ 环境变量 SKY__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let default_file = DEFAULT_CONFIG_CANDIDATES
        .into_iter()
        .find(|stem| Path::new(&format!("{stem}.toml")).exists());

    let mut builder = config::Config::builder();
    if let Some(stem) = default_file {
        builder = builder.add_source(config::File::with_name(stem).required(false));
    }
    if let Some(path) = config_path.filter(|p| p.exists()) {
        tracing::debug!(path = %path.display(), "Loading extra config file");
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder
        .add_source(
            config::Environment::with_prefix("SKY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_steps, 10);
        assert_eq!(cfg.agent.timeout(), Duration::from_secs(300));
        assert_eq!(cfg.llm.provider, "dashscope");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert!(!cfg.agent.preempt_on_timeout);
        assert!(cfg.classifier.action_keywords.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nmax_steps = 4\ntimeout_ms = 1500\n\n[llm]\nprovider = \"mock\"\n\n[classifier]\naction_keywords = [\"查\"]"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.max_steps, 4);
        assert_eq!(cfg.agent.timeout(), Duration::from_millis(1500));
        assert_eq!(cfg.agent.stream_timeout_ms, DEFAULT_STREAM_TIMEOUT_MS);
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.classifier.action_keywords, Some(vec!["查".to_string()]));
    }
}
