//! Agent 生命周期状态
//!
//! IDLE → RUNNING → (THINKING ⇄ ACTING)* → COMPLETED / ERROR / TIMEOUT / STOPPED，run 结束后回到 IDLE。

use std::fmt;

use serde::Serialize;

use crate::core::AgentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Running,
    Thinking,
    Acting,
    Waiting,
    Completed,
    Error,
    Timeout,
    Stopped,
}

impl AgentState {
    pub const ALL: [AgentState; 9] = [
        AgentState::Idle,
        AgentState::Running,
        AgentState::Thinking,
        AgentState::Acting,
        AgentState::Waiting,
        AgentState::Completed,
        AgentState::Error,
        AgentState::Timeout,
        AgentState::Stopped,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Running => "running",
            AgentState::Thinking => "thinking",
            AgentState::Acting => "acting",
            AgentState::Waiting => "waiting",
            AgentState::Completed => "completed",
            AgentState::Error => "error",
            AgentState::Timeout => "timeout",
            AgentState::Stopped => "stopped",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentState::Idle => "空闲状态",
            AgentState::Running => "运行状态",
            AgentState::Thinking => "思考状态",
            AgentState::Acting => "执行状态",
            AgentState::Waiting => "等待状态",
            AgentState::Completed => "完成状态",
            AgentState::Error => "错误状态",
            AgentState::Timeout => "超时状态",
            AgentState::Stopped => "停止状态",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, AgentError> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| AgentError::Config(format!("未知的智能体状态码: {code}")))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentState::Completed | AgentState::Error | AgentState::Timeout | AgentState::Stopped
        )
    }

    /// 有 run 正在执行（single-flight 判定依据）
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AgentState::Running | AgentState::Thinking | AgentState::Acting | AgentState::Waiting
        )
    }
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState::Idle
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = AgentState::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![
                AgentState::Completed,
                AgentState::Error,
                AgentState::Timeout,
                AgentState::Stopped
            ]
        );
    }

    #[test]
    fn test_active_and_terminal_disjoint() {
        for s in AgentState::ALL {
            assert!(!(s.is_active() && s.is_terminal()), "{s} is both");
        }
        assert!(!AgentState::Idle.is_active());
        assert!(AgentState::Thinking.is_active());
    }

    #[test]
    fn test_from_code_roundtrip() {
        for s in AgentState::ALL {
            assert_eq!(AgentState::from_code(s.code()).unwrap(), s);
        }
        assert!(AgentState::from_code("sleeping").is_err());
    }

    #[test]
    fn test_serialize_lowercase() {
        let json = serde_json::to_string(&AgentState::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
