//! Sky Agent - 苍穹外卖 AI 客服智能体引擎
//!
//! 模块划分：
//! - **agent**: Agent 运行时（步数 / 超时预算、状态机、single-flight、流式变体）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、生命周期状态、常量、Agent 构建器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 单次 run 的对话历史与中文分词
//! - **react**: 思考分类器、工具调用解析、推理-行动单步
//! - **service**: 客服前台（快速回复、输入预处理、状态报告）
//! - **tools**: 工具注册表与客服工具（订单、菜品、店铺、常见问题）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod service;
pub mod tools;

pub use agent::{Agent, AgentStatus, RunReport};
pub use core::{AgentError, AgentState};
