//! 核心层：错误类型、生命周期状态、常量与 Agent 组装

pub mod builder;
pub mod constants;
pub mod error;
pub mod state;

pub use builder::{build_tool_registry, AgentBuilder};
pub use error::AgentError;
pub use state::AgentState;
