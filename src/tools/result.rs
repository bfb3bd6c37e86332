//! 工具执行结果
//!
//! 成功时携带 data，失败时携带 error，二者互斥由 `ToolOutcome` 保证；
//! 构造后仅允许在分发边界通过 `with_execution_time` 盖上耗时。

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    tool_name: String,
    outcome: ToolOutcome,
    execution_time_ms: u64,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success(data.into()),
            execution_time_ms: 0,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Failure(error.into()),
            execution_time_ms: 0,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn outcome(&self) -> &ToolOutcome {
        &self.outcome
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    pub fn data(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Success(d) => Some(d),
            ToolOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure(e) => Some(e),
        }
    }

    pub fn has_data(&self) -> bool {
        self.data().is_some_and(|d| !d.trim().is_empty())
    }

    pub fn has_error(&self) -> bool {
        self.error().is_some_and(|e| !e.trim().is_empty())
    }

    /// 由注册表在分发结束时调用
    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time_ms = millis;
        self
    }

    /// 写入对话历史的文本形式
    pub fn formatted(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success(d) => format!("[{}] 执行成功: {}", self.tool_name, d),
            ToolOutcome::Failure(e) => format!("[{}] 执行失败: {}", self.tool_name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_failure_are_exclusive() {
        let ok = ToolResult::success("storeStatus", "营业中");
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some("营业中"));
        assert!(ok.error().is_none());
        assert!(ok.has_data());

        let bad = ToolResult::failure("orderQuery", "订单不存在");
        assert!(!bad.is_success());
        assert!(bad.data().is_none());
        assert!(bad.has_error());
    }

    #[test]
    fn test_formatted() {
        assert_eq!(
            ToolResult::success("faq", "答案").formatted(),
            "[faq] 执行成功: 答案"
        );
        assert_eq!(
            ToolResult::failure("faq", "无结果").formatted(),
            "[faq] 执行失败: 无结果"
        );
    }

    #[test]
    fn test_execution_time_stamp() {
        let r = ToolResult::success("t", " ").with_execution_time(42);
        assert_eq!(r.execution_time_ms(), 42);
        assert_eq!(r.tool_name(), "t");
        assert_eq!(r.outcome(), &ToolOutcome::Success(" ".to_string()));
        assert!(!r.has_data());
    }
}
