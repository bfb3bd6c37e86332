//! 单次 run 的运行上下文
//!
//! 每次 `Agent::run` 新建一份，持有对话历史、步数、上次工具结果；run 结束即丢弃，不跨 run 复用。
//! 状态变更通过共享的 `AgentStatus` 句柄写回 Agent，供 single-flight 判定与状态查询使用。

use std::sync::Arc;

use parking_lot::Mutex;

use crate::agent::AgentStatus;
use crate::core::AgentState;
use crate::memory::{Message, MessageHistory};
use crate::tools::ToolResult;

/// Agent 的静态身份与提示词
#[derive(Clone, Debug)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub next_step_prompt: String,
}

pub struct RunContext {
    pub profile: Arc<AgentProfile>,
    pub history: MessageHistory,
    pub current_step: usize,
    pub max_steps: usize,
    pub conversation_id: Option<String>,
    pub last_tool_result: Option<ToolResult>,
    /// 本次 run 内的工具调用次数
    pub tool_call_count: usize,
    status: Arc<Mutex<AgentStatus>>,
}

impl RunContext {
    pub fn new(
        profile: Arc<AgentProfile>,
        max_steps: usize,
        conversation_id: Option<String>,
        status: Arc<Mutex<AgentStatus>>,
    ) -> Self {
        Self {
            profile,
            history: MessageHistory::new(),
            current_step: 0,
            max_steps,
            conversation_id,
            last_tool_result: None,
            tool_call_count: 0,
            status,
        }
    }

    /// 不挂在任何 Agent 上的上下文（单独驱动 cycle 时使用）
    pub fn detached(profile: Arc<AgentProfile>, max_steps: usize) -> Self {
        Self::new(
            profile,
            max_steps,
            None,
            Arc::new(Mutex::new(AgentStatus::default())),
        )
    }

    pub fn set_state(&self, state: AgentState) {
        self.status.lock().state = state;
    }

    pub fn state(&self) -> AgentState {
        self.status.lock().state
    }

    pub(crate) fn sync_step(&self) {
        self.status.lock().current_step = self.current_step;
    }

    /// 步数预算只剩当前这一步
    pub fn is_last_step(&self) -> bool {
        self.current_step >= self.max_steps.saturating_sub(1)
    }

    /// system + 对话历史
    pub fn conversation(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.profile.system_prompt.clone()));
        messages.extend(self.history.snapshot());
        messages
    }

    /// system + 对话历史 + 一条临时 user 提示（不写入历史）
    pub fn prompt_with(&self, user_prompt: impl Into<String>) -> Vec<Message> {
        let mut messages = self.conversation();
        messages.push(Message::user(user_prompt));
        messages
    }
}
