//! 工具调用解析
//!
//! 两阶段、先匹配者胜：
//! 1. `标识符(参数)` 形式，取文本中第一处；参数为第一个 `(` 与其后第一个 `)` 之间的内容，不支持嵌套
//! 2. 逐行小写后按注册顺序检查是否包含某个工具名，命中则以空参数调用
//!
//! 都不命中时视为直接回复。

use std::sync::OnceLock;

use regex::Regex;

use crate::tools::ToolRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCall {
    /// 小写工具名
    pub tool: String,
    pub params: String,
}

pub trait ToolCallParser: Send + Sync {
    fn parse(&self, text: &str, registry: &ToolRegistry) -> Option<ParsedCall>;
}

fn call_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([A-Za-z0-9_]+)\s*\(([^)]*)\)").ok())
        .as_ref()
}

#[derive(Default)]
pub struct TwoStageParser;

impl TwoStageParser {
    fn structured(text: &str) -> Option<ParsedCall> {
        let caps = call_pattern()?.captures(text)?;
        Some(ParsedCall {
            tool: caps.get(1)?.as_str().trim().to_lowercase(),
            params: caps.get(2)?.as_str().trim().to_string(),
        })
    }

    fn by_name(text: &str, registry: &ToolRegistry) -> Option<ParsedCall> {
        let names = registry.list_names();
        text.lines().find_map(|line| {
            let line = line.trim().to_lowercase();
            names
                .iter()
                .find(|name| line.contains(name.as_str()))
                .map(|name| ParsedCall {
                    tool: name.clone(),
                    params: String::new(),
                })
        })
    }
}

impl ToolCallParser for TwoStageParser {
    fn parse(&self, text: &str, registry: &ToolRegistry) -> Option<ParsedCall> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(call) = Self::structured(text) {
            tracing::info!(tool = %call.tool, params = %call.params, "Parsed structured tool call");
            return Some(call);
        }
        let call = Self::by_name(text, registry)?;
        tracing::info!(tool = %call.tool, "Matched tool name in decision text");
        Some(call)
    }
}
