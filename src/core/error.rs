//! Agent 错误类型
//!
//! 工具层错误（Validation / ToolNotFound / ToolExecution）在注册表内就地转成失败的 ToolResult；
//! 模型调用错误在各调用点降级；Step / Timeout / MaxStepsExceeded / Busy 终止本次 run，
//! 由 `user_message` 映射为固定的用户可见文案，不会跨出 `Agent::run`。

use thiserror::Error;

use crate::core::constants::{
    ERROR_GENERAL, ERROR_MAX_STEPS_EXCEEDED, ERROR_TIMEOUT, ERROR_TOOL_CALL_FAILED,
};
use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Parameter validation failed for tool {0}")]
    Validation(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("LLM error: {0}")]
    ModelCall(#[from] LlmError),

    #[error("Step failed: {0}")]
    Step(String),

    #[error("Run timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("Max steps exceeded: {0}")]
    MaxStepsExceeded(usize),

    /// 同一 Agent 实例已有 run 在执行（single-flight）
    #[error("Agent {0} is already running")]
    Busy(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    /// 终止路径上返回给用户的固定文案
    pub fn user_message(&self) -> &'static str {
        match self {
            AgentError::Timeout { .. } => ERROR_TIMEOUT,
            AgentError::MaxStepsExceeded(_) => ERROR_MAX_STEPS_EXCEEDED,
            AgentError::ToolNotFound(_)
            | AgentError::ToolExecution(_)
            | AgentError::Validation(_) => ERROR_TOOL_CALL_FAILED,
            _ => ERROR_GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_mapping() {
        let timeout = AgentError::Timeout {
            elapsed_ms: 120,
            budget_ms: 100,
        };
        assert_eq!(timeout.user_message(), ERROR_TIMEOUT);
        assert_eq!(
            AgentError::MaxStepsExceeded(3).user_message(),
            ERROR_MAX_STEPS_EXCEEDED
        );
        assert_eq!(AgentError::Step("boom".into()).user_message(), ERROR_GENERAL);
        assert_eq!(AgentError::Busy("小苍".into()).user_message(), ERROR_GENERAL);
        assert_eq!(
            AgentError::ModelCall(LlmError::EmptyResponse).user_message(),
            ERROR_GENERAL
        );
    }

    #[test]
    fn test_display() {
        let err = AgentError::ToolNotFound("faq".into());
        assert_eq!(err.to_string(), "Tool not found: faq");
    }
}
