//! 推理-行动层：思考分类器、工具调用解析、运行上下文与单步循环

pub mod classifier;
pub mod context;
pub mod cycle;
pub mod parser;

pub use classifier::{ActionClassifier, KeywordClassifier};
pub use context::{AgentProfile, RunContext};
pub use cycle::{ReasonActCycle, ToolCallCycle};
pub use parser::{ParsedCall, ToolCallParser, TwoStageParser};
