//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / validate / execute），由 ToolRegistry 按小写名注册与分发。
//! 注册表在进程启动时构造一次，以 `Arc<ToolRegistry>` 注入所有 Agent；内部使用 DashMap 分片锁，
//! 注册、注销、分发与统计查询可并发调用。每次分发输出一条结构化审计日志（JSON）。

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::core::AgentError;
use crate::tools::ToolResult;

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

/// 工具 trait：名称、描述（供 LLM 理解）、参数说明、校验与同步执行（参数为原始文本）
pub trait Tool: Send + Sync {
    /// 工具名称（注册键，大小写不敏感）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数格式说明
    fn parameter_help(&self) -> &str;

    fn tool_type(&self) -> &str {
        "general"
    }

    /// 默认要求参数非空
    fn validate(&self, params: &str) -> bool {
        !params.trim().is_empty()
    }

    /// 执行工具；返回 Err 或 panic 都会被注册表转为失败结果
    fn execute(&self, params: &str) -> Result<ToolResult, AgentError>;

    fn full_description(&self) -> String {
        format!(
            "工具名称: {}\n功能描述: {}\n参数说明: {}\n工具类型: {}",
            self.name(),
            self.description(),
            self.parameter_help(),
            self.tool_type()
        )
    }
}

/// 工具与其调用计数同处一个条目，注册、注销时整体替换或移除
struct Entry {
    tool: Arc<dyn Tool>,
    seq: u64,
    calls: AtomicU64,
}

/// 工具注册表：小写名 → 工具条目（含调用次数）
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；名称为空返回 false。同名覆盖（后写者胜）并把调用计数清零
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let key = normalize(tool.name());
        if key.is_empty() {
            tracing::warn!("Refusing to register tool with blank name");
            return false;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            tool,
            seq,
            calls: AtomicU64::new(0),
        };
        let replaced = self.tools.insert(key.clone(), entry).is_some();
        if replaced {
            tracing::info!(tool = %key, "Tool re-registered, call counter reset");
        } else {
            tracing::info!(tool = %key, "Tool registered");
        }
        true
    }

    /// 批量注册，返回成功数；无效项跳过
    pub fn register_batch<I>(&self, tools: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        tools.into_iter().filter(|t| self.register(t.clone())).count()
    }

    pub fn unregister(&self, name: &str) -> bool {
        let key = normalize(name);
        let removed = self.tools.remove(&key).is_some();
        if removed {
            tracing::info!(tool = %key, "Tool unregistered");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(&normalize(name)).map(|e| e.tool.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(&normalize(name))
    }

    fn ordered(&self) -> Vec<(String, Arc<dyn Tool>)> {
        let mut entries: Vec<(u64, String, Arc<dyn Tool>)> = self
            .tools
            .iter()
            .map(|e| (e.seq, e.key().clone(), e.tool.clone()))
            .collect();
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries.into_iter().map(|(_, k, t)| (k, t)).collect()
    }

    /// 按注册顺序返回工具
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.ordered().into_iter().map(|(_, t)| t).collect()
    }

    /// 按注册顺序返回小写名称
    pub fn list_names(&self) -> Vec<String> {
        self.ordered().into_iter().map(|(k, _)| k).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn tools_by_type(&self, tool_type: &str) -> Vec<Arc<dyn Tool>> {
        self.list_tools()
            .into_iter()
            .filter(|t| t.tool_type().eq_ignore_ascii_case(tool_type))
            .collect()
    }

    /// 调用次数快照（拷贝，不是实时视图）
    pub fn call_stats(&self) -> HashMap<String, u64> {
        self.tools
            .iter()
            .map(|e| (e.key().clone(), e.calls.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn reset_call_stats(&self) {
        for e in self.tools.iter() {
            e.calls.store(0, Ordering::Relaxed);
        }
        tracing::info!("Tool call stats reset");
    }

    pub fn clear(&self) {
        self.tools.clear();
        tracing::info!("Tool registry cleared");
    }

    /// 供提示词使用的工具清单
    pub fn tools_description(&self) -> String {
        let tools = self.list_tools();
        if tools.is_empty() {
            return "暂无可用工具".to_string();
        }
        let mut out = String::from("可用工具列表：\n");
        for t in tools {
            out.push_str(&format!("- {}: {}\n", t.name(), t.description()));
        }
        out
    }

    /// 按名称分发：查找 → 计数 → 校验 → 执行；所有失败都以失败 ToolResult 返回
    pub fn dispatch(&self, name: &str, params: &str) -> ToolResult {
        let start = Instant::now();
        let key = normalize(name);

        // 持有条目引用期间计数并取出工具，计数只落在本次查到的条目上
        let found = self.tools.get(&key).map(|entry| {
            entry.calls.fetch_add(1, Ordering::Relaxed);
            entry.tool.clone()
        });
        let (result, outcome) = match found {
            None => (
                ToolResult::failure(name, format!("工具不存在: {name}")),
                "not_found",
            ),
            Some(tool) => self.invoke(tool.as_ref(), params),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": key,
            "ok": result.is_success(),
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview(params),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result.with_execution_time(duration_ms)
    }

    fn invoke(&self, tool: &dyn Tool, params: &str) -> (ToolResult, &'static str) {
        if !tool.validate(params) {
            return (
                ToolResult::failure(tool.name(), format!("参数验证失败: {}", tool.parameter_help())),
                "invalid_params",
            );
        }
        match catch_unwind(AssertUnwindSafe(|| tool.execute(params))) {
            Ok(Ok(result)) => {
                let outcome = if result.is_success() { "ok" } else { "failed" };
                (result, outcome)
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %tool.name(), error = %e, "Tool returned error");
                (
                    ToolResult::failure(tool.name(), format!("工具执行异常: {e}")),
                    "error",
                )
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool = %tool.name(), panic = %msg, "Tool panicked");
                (
                    ToolResult::failure(tool.name(), format!("工具执行异常: {msg}")),
                    "panic",
                )
            }
        }
    }
}

fn args_preview(params: &str) -> String {
    if params.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", params.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        params.to_string()
    }
}
