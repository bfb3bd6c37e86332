//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容端点 / Mock）实现 LlmClient：complete（非流式）、complete_stream（流式片段）。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use thiserror::Error;

use crate::memory::Message;

/// 模型调用失败（传输层）；核心在每个调用点把它降级为兜底回复
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("empty response")]
    EmptyResponse,
}

/// 流式片段：有限、惰性的文本序列
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// LLM 客户端 trait：非流式完成与流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成：按序的消息列表 → 生成文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 流式完成，返回文本片段流
    async fn complete_stream(&self, messages: &[Message]) -> Result<TextStream, LlmError>;
}
