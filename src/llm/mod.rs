//! LLM 层：客户端抽象与实现（OpenAI 兼容端点 / Mock）

pub mod mock;
pub mod openai;
pub mod providers;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use providers::{create_llm_from_config, preset, ProviderPreset};
pub use traits::{LlmClient, LlmError, TextStream};
