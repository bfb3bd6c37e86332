//! 客服前台
//!
//! 常见问题先走固定话术（不调用模型），其余输入经预处理后交给 Agent。

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::sync::mpsc;

use crate::agent::Agent;
use crate::core::constants::ERROR_SERVICE_UNAVAILABLE;
use crate::core::AgentError;
use crate::tools::ToolRegistry;

const GREETING_REPLY: &str = "您好！欢迎来到苍穹外卖，我是您的专属AI客服小苍。请问有什么可以帮助您的吗？";
const HOURS_REPLY: &str = "我们的营业时间是每天上午10:00至晚上22:00。如需查询具体门店信息，我可以帮您查询。";
const CONTACT_REPLY: &str = "我们的客服热线是：400-8888-888，服务时间：9:00-21:00。我是AI客服小苍，也可以为您提供帮助哦！";
const DELIVERY_RANGE_REPLY: &str = "我们的配送覆盖市区大部分地区，具体可配送范围请提供您的详细地址，我来帮您核实。";
const DELIVERY_FEE_REPLY: &str = "配送费根据距离计算，一般在2-8元之间。满39元免配送费哦！";

const POLITE_WORDS: [&str; 6] = ["请", "您好", "谢谢", "麻烦", "请问", "劳烦"];

fn greeting_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[你您]好|\bhi\b|\bhello\b").ok())
        .as_ref()
}

/// 固定话术；不是常见问题时返回 None
pub fn quick_reply(input: &str) -> Option<&'static str> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }
    let has = |w: &str| input.contains(w);

    if greeting_pattern().is_some_and(|re| re.is_match(&input)) {
        Some(GREETING_REPLY)
    } else if has("营业时间") || (has("几点") && has("营业")) {
        Some(HOURS_REPLY)
    } else if has("电话") || has("联系") || has("客服") {
        Some(CONTACT_REPLY)
    } else if has("配送") && (has("范围") || has("地区")) {
        Some(DELIVERY_RANGE_REPLY)
    } else if has("配送费") || (has("配送") && has("费")) {
        Some(DELIVERY_FEE_REPLY)
    } else {
        None
    }
}

/// 空输入给出占位文本；短且不含礼貌用语的输入加“请问”前缀
pub fn preprocess_input(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "用户发送了空消息".to_string();
    }
    let lower = trimmed.to_lowercase();
    if trimmed.chars().count() < 10 && !POLITE_WORDS.iter().any(|w| lower.contains(w)) {
        return format!("请问{trimmed}");
    }
    trimmed.to_string()
}

pub struct CustomerService {
    agent: Arc<Agent>,
    registry: Arc<ToolRegistry>,
}

impl CustomerService {
    pub fn new(agent: Arc<Agent>, registry: Arc<ToolRegistry>) -> Self {
        Self { agent, registry }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    pub async fn handle_message(&self, message: &str, user_id: &str) -> String {
        tracing::info!(user = %user_id, message = %message, "Customer message received");
        if let Some(reply) = quick_reply(message) {
            tracing::info!(user = %user_id, "Answered with quick reply");
            return reply.to_string();
        }
        let input = preprocess_input(message);
        let report = self.agent.execute(&input, Some(user_id)).await;
        if let Some(AgentError::Busy(_)) = report.error {
            tracing::warn!(user = %user_id, "Agent busy, answering with service fallback");
            return ERROR_SERVICE_UNAVAILABLE.to_string();
        }
        tracing::info!(user = %user_id, reply = %report.reply, "Agent replied");
        report.reply
    }

    /// 快速回复也通过通道返回，保持调用方一致
    pub fn handle_message_stream(&self, message: &str, user_id: &str) -> mpsc::Receiver<String> {
        if let Some(reply) = quick_reply(message) {
            let (tx, rx) = mpsc::channel(1);
            // 容量为 1 的新通道，首次发送不会失败
            let _ = tx.try_send(reply.to_string());
            return rx;
        }
        let input = preprocess_input(message);
        self.agent
            .clone()
            .run_stream(input, Some(user_id.to_string()))
    }

    /// 有进行中的 run 时不重置，返回 false
    pub fn reset_agent(&self, user_id: &str) -> bool {
        match self.agent.reset() {
            Ok(()) => {
                tracing::info!(user = %user_id, "Agent state reset");
                true
            }
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "Agent reset skipped");
                false
            }
        }
    }

    pub fn agent_status(&self) -> String {
        let stats = self
            .agent
            .cycle()
            .stats_summary()
            .unwrap_or_else(|| "暂无统计".to_string());
        format!(
            "=== 苍穹外卖AI客服智能体状态报告 ===\n\
             智能体名称：{}\n\
             当前状态：{}\n\
             可用工具数量：{}\n\
             工具调用统计：{}\n\n\
             我是小苍，随时为您提供优质的外卖服务！",
            self.agent.name(),
            self.agent.state().description(),
            self.registry.tool_count(),
            stats
        )
    }

    pub fn tool_stats(&self) -> String {
        let mut stats: Vec<(String, u64)> = self.registry.call_stats().into_iter().collect();
        stats.sort();
        let detail = stats
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "工具统计：共{}个工具，调用统计：{{{}}}",
            self.registry.tool_count(),
            detail
        )
    }

    /// 当前没有进行中的 run
    pub fn is_available(&self) -> bool {
        !self.agent.is_running()
    }
}
