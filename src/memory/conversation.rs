//! 对话历史：单次 run 内只追加的消息列表
//!
//! 每次 `Agent::run` 新建一份，step 之间共享，run 结束时随运行上下文一起清空。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 拼接思考上下文时使用的中文称呼
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "用户",
            Role::Assistant => "助手",
            Role::System => "系统",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 只追加的对话历史（user / assistant）
#[derive(Clone, Debug, Default)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        let content = content.into();
        tracing::debug!(content = %content, "append user message");
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        let content = content.into();
        tracing::debug!(content = %content, "append assistant message");
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 历史副本，调用方可在其后追加临时 prompt 而不污染历史
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 格式化为「对话历史：\n用户: ...\n助手: ...」；为空时返回「暂无对话历史」
    pub fn format_context(&self) -> String {
        if self.messages.is_empty() {
            return "暂无对话历史".to_string();
        }
        let mut out = String::from("对话历史：\n");
        for m in &self.messages {
            let label = match m.role {
                Role::User => Role::User.label(),
                _ => Role::Assistant.label(),
            };
            out.push_str(&format!("{}: {}\n", label, m.content));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_context() {
        let history = MessageHistory::new();
        assert_eq!(history.format_context(), "暂无对话历史");
    }

    #[test]
    fn test_format_context_roles() {
        let mut history = MessageHistory::new();
        history.push_user("几点开门");
        history.push_assistant("10:00");
        let ctx = history.format_context();
        assert!(ctx.starts_with("对话历史：\n"));
        assert!(ctx.contains("用户: 几点开门\n"));
        assert!(ctx.contains("助手: 10:00\n"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut history = MessageHistory::new();
        history.push_user("hi");
        let mut copy = history.snapshot();
        copy.push(Message::user("extra"));
        assert_eq!(history.len(), 1);
        assert_eq!(copy.len(), 2);
    }
}
