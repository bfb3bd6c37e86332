//! 单步推理-行动
//!
//! THINKING → 是否需要行动？否：直接回复；是：ACTING → 让模型给出决策 → 解析工具调用 → 经注册表分发 →
//! 结果写回历史。最后一步或工具失败时立即生成最终回复，否则返回 None 进入下一步。
//! 模型调用失败在各调用点降级，不会让本步出错。

use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::constants::{
    ACTION_PREFIX, ERROR_GENERAL, ERROR_NOT_UNDERSTOOD, THINKING_PREFIX, TOOL_RESULT_PREFIX,
};
use crate::core::{AgentError, AgentState};
use crate::llm::LlmClient;
use crate::react::{ActionClassifier, KeywordClassifier, RunContext, ToolCallParser, TwoStageParser};
use crate::tools::{ToolRegistry, ToolResult};

/// 一步推理-行动；返回 Some(回复) 表示本次 run 完成，None 表示继续下一步
#[async_trait]
pub trait ReasonActCycle: Send + Sync {
    async fn step(&self, ctx: &mut RunContext) -> Result<Option<String>, AgentError>;

    /// run 开始时调用（输入已写入历史之前）
    async fn initialize(&self, _ctx: &mut RunContext) {}

    /// run 结束时调用，任何退出路径都会执行
    fn cleanup(&self, _ctx: &mut RunContext) {}

    /// 调用统计文本，不统计的实现返回 None
    fn stats_summary(&self) -> Option<String> {
        None
    }
}

pub struct ToolCallCycle {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    classifier: Arc<dyn ActionClassifier>,
    parser: Arc<dyn ToolCallParser>,
    /// 跨 run 累计的工具调用次数
    total_tool_calls: AtomicUsize,
}

impl ToolCallCycle {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            registry,
            classifier: Arc::new(KeywordClassifier::default()),
            parser: Arc::new(TwoStageParser),
            total_tool_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ActionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ToolCallParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn total_tool_calls(&self) -> usize {
        self.total_tool_calls.load(Ordering::Relaxed)
    }

    pub fn tool_call_stats(&self) -> String {
        let mut stats: Vec<(String, u64)> = self.registry.call_stats().into_iter().collect();
        stats.sort();
        let detail = stats
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "总工具调用次数：{}，工具详细统计：{{{}}}",
            self.total_tool_calls(),
            detail
        )
    }

    fn thinking_context(&self, ctx: &RunContext) -> String {
        let mut out = ctx.history.format_context();
        out.push('\n');
        out.push_str(&self.registry.tools_description());
        if let Some(last) = &ctx.last_tool_result {
            let _ = writeln!(out, "\n上次工具调用结果：{}", last.formatted());
        }
        out
    }

    /// 模型失败或空回复都视为不需要行动
    async fn think(&self, ctx: &RunContext) -> bool {
        let prompt = format!(
            "{}\n\n当前上下文：{}\n\n请分析用户的需求并思考：\n\
             1. 用户想要什么？\n\
             2. 我是否需要调用工具来获取信息？\n\
             3. 如果需要调用工具，应该调用哪个工具？\n\
             4. 如果不需要调用工具，我可以直接回答吗？\n\n\
             请给出你的思考过程和决策。",
            ctx.profile.next_step_prompt,
            self.thinking_context(ctx)
        );

        let thinking = match self.llm.complete(&ctx.prompt_with(prompt)).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(agent = %ctx.profile.name, error = %e, "Thinking call failed, replying directly");
                return false;
            }
        };
        tracing::info!("{}[{}] {}", THINKING_PREFIX, ctx.profile.name, thinking);
        let needs_action = self.classifier.needs_action(&thinking);
        tracing::debug!(step = ctx.current_step, needs_action, "Thinking classified");
        needs_action
    }

    /// 决策阶段需要参数说明，逐个列出完整工具描述
    fn tool_details(&self) -> String {
        let details: Vec<String> = self
            .registry
            .list_tools()
            .iter()
            .map(|t| t.full_description())
            .collect();
        if details.is_empty() {
            return "暂无可用工具".to_string();
        }
        details.join("\n\n")
    }

    fn decision_prompt(&self) -> String {
        format!(
            "基于前面的思考，请决定下一步行动：\n\
             1. 如果上一步是工具调用并且成功获取到信息，**必须**直接回复用户，**禁止**再次调用任何工具。\n\
             2. 只有在确实需要新信息时，才调用工具。\n\n\
             如果需要调用工具，请使用以下格式：\n\
             工具名称(参数)\n\n\
             例如：\n\
             - orderQuery(202501140001)\n\
             - dishRecommend(川菜)\n\
             - storeStatus()\n\n\
             如果不需要调用工具，请直接用自然语言回复用户。\n\n\
             当前可用工具：\n{}\n\n\
             请给出你的行动决策：",
            self.tool_details()
        )
    }

    async fn act(&self, ctx: &mut RunContext) -> Option<String> {
        let decision = match self.llm.complete(&ctx.prompt_with(self.decision_prompt())).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(agent = %ctx.profile.name, error = %e, "Decision call failed");
                String::new()
            }
        };
        tracing::info!("{}[{}] {}", ACTION_PREFIX, ctx.profile.name, decision);

        let Some(call) = self.parser.parse(&decision, &self.registry) else {
            return Some(self.direct_response(ctx).await);
        };

        let result = self.registry.dispatch(&call.tool, &call.params);
        ctx.history
            .push_assistant(format!("{}{}", TOOL_RESULT_PREFIX, result.formatted()));
        ctx.tool_call_count += 1;
        self.total_tool_calls.fetch_add(1, Ordering::Relaxed);
        ctx.last_tool_result = Some(result.clone());

        if ctx.is_last_step() || !result.is_success() {
            return Some(self.final_response(ctx, &result).await);
        }
        None
    }

    /// 基于工具结果生成面向用户的回复；模型失败时使用模板
    async fn final_response(&self, ctx: &mut RunContext, result: &ToolResult) -> String {
        let prompt = format!(
            "基于工具调用结果，请生成一个友好、专业的回复给用户：\n\n\
             工具调用结果：{}\n\n\
             请注意：\n\
             1. 回复要简洁明了，用户友好\n\
             2. 如果工具调用成功，整合结果信息给出有用的回复\n\
             3. 如果工具调用失败，向用户道歉并提供替代方案\n\
             4. 保持苍穹外卖客服的专业形象\n\n\
             请生成回复：",
            result.formatted()
        );

        match self.llm.complete(&ctx.prompt_with(prompt)).await {
            Ok(reply) if !reply.trim().is_empty() => {
                ctx.history.push_assistant(reply.clone());
                reply
            }
            outcome => {
                if let Err(e) = outcome {
                    tracing::warn!(agent = %ctx.profile.name, error = %e, "Final response call failed, using template");
                }
                fallback_reply(result)
            }
        }
    }

    async fn direct_response(&self, ctx: &mut RunContext) -> String {
        match self.llm.complete(&ctx.conversation()).await {
            Ok(reply) if !reply.trim().is_empty() => {
                ctx.history.push_assistant(reply.clone());
                reply
            }
            Ok(_) => {
                tracing::warn!(agent = %ctx.profile.name, "Model returned empty reply");
                ERROR_NOT_UNDERSTOOD.to_string()
            }
            Err(e) => {
                tracing::warn!(agent = %ctx.profile.name, error = %e, "Direct response call failed");
                ERROR_GENERAL.to_string()
            }
        }
    }
}

fn fallback_reply(result: &ToolResult) -> String {
    match (result.data(), result.error()) {
        (Some(data), _) => format!("根据查询结果：{data}"),
        (_, Some(err)) => format!("抱歉，{err}。请稍后再试或联系人工客服。"),
        _ => ERROR_GENERAL.to_string(),
    }
}

#[async_trait]
impl ReasonActCycle for ToolCallCycle {
    async fn step(&self, ctx: &mut RunContext) -> Result<Option<String>, AgentError> {
        tracing::debug!(agent = %ctx.profile.name, step = ctx.current_step, "Step started");

        ctx.set_state(AgentState::Thinking);
        if !self.think(ctx).await {
            return Ok(Some(self.direct_response(ctx).await));
        }

        ctx.set_state(AgentState::Acting);
        let reply = self.act(ctx).await;
        if reply.is_none() {
            tracing::debug!(step = ctx.current_step, "Tool executed without final reply, continuing");
        }
        Ok(reply)
    }

    fn cleanup(&self, ctx: &mut RunContext) {
        tracing::debug!(
            agent = %ctx.profile.name,
            tool_calls = ctx.tool_call_count,
            "Tool-call cycle cleaned up"
        );
        ctx.last_tool_result = None;
        ctx.tool_call_count = 0;
    }

    fn stats_summary(&self) -> Option<String> {
        Some(self.tool_call_stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::react::AgentProfile;
    use crate::tools::Tool;

    struct Store;

    impl Tool for Store {
        fn name(&self) -> &str {
            "storeStatus"
        }
        fn description(&self) -> &str {
            "查询店铺营业状态"
        }
        fn parameter_help(&self) -> &str {
            ""
        }
        fn validate(&self, _params: &str) -> bool {
            true
        }
        fn execute(&self, _params: &str) -> Result<ToolResult, AgentError> {
            Ok(ToolResult::success("storeStatus", "营业中"))
        }
    }

    fn setup(replies: Vec<&str>) -> (ToolCallCycle, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::new().with_replies(replies).with_fallback(""));
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Arc::new(Store));
        (ToolCallCycle::new(llm.clone(), registry), llm)
    }

    fn ctx(max_steps: usize) -> RunContext {
        let profile = Arc::new(AgentProfile {
            id: "t".to_string(),
            name: "测试客服".to_string(),
            system_prompt: "SYS".to_string(),
            next_step_prompt: "NEXT".to_string(),
        });
        let mut ctx = RunContext::detached(profile, max_steps);
        ctx.history.push_user("你们几点开门");
        ctx.current_step = 1;
        ctx
    }

    #[tokio::test]
    async fn test_direct_reply_when_no_action() {
        let (cycle, llm) = setup(vec!["可以直接回答", "我们10点开门"]);
        let mut c = ctx(5);
        let reply = cycle.step(&mut c).await.unwrap();
        assert_eq!(reply.as_deref(), Some("我们10点开门"));
        assert_eq!(llm.calls(), 2);
        assert_eq!(c.history.len(), 2);
        assert_eq!(c.state(), AgentState::Thinking);
    }

    #[tokio::test]
    async fn test_tool_call_continues_when_budget_left() {
        let (cycle, _llm) = setup(vec!["需要调用工具", "storeStatus()"]);
        let mut c = ctx(5);
        let reply = cycle.step(&mut c).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(c.tool_call_count, 1);
        assert_eq!(c.state(), AgentState::Acting);
        let last = c.history.last().unwrap();
        assert_eq!(last.content, "工具结果: [storeStatus] 执行成功: 营业中");
        assert_eq!(cycle.registry().call_stats().get("storestatus"), Some(&1));
    }

    #[tokio::test]
    async fn test_last_step_forces_final_response_with_template() {
        let (cycle, _llm) = setup(vec!["需要调用工具", "storeStatus()"]);
        let mut c = ctx(2);
        let reply = cycle.step(&mut c).await.unwrap().unwrap();
        assert_eq!(reply, "根据查询结果：营业中");
    }

    #[tokio::test]
    async fn test_failed_tool_forces_final_response() {
        let (cycle, _llm) = setup(vec!["需要查询订单", "orderQuery(12345678)", "非常抱歉"]);
        let mut c = ctx(5);
        let reply = cycle.step(&mut c).await.unwrap().unwrap();
        assert_eq!(reply, "非常抱歉");
        assert!(c.last_tool_result.as_ref().is_some_and(|r| !r.is_success()));
    }

    #[tokio::test]
    async fn test_model_failure_degrades() {
        let llm = Arc::new(MockLlmClient::new().failing());
        let cycle = ToolCallCycle::new(llm, Arc::new(ToolRegistry::new()));
        let mut c = ctx(3);
        let reply = cycle.step(&mut c).await.unwrap();
        assert_eq!(reply.as_deref(), Some(ERROR_GENERAL));
    }

    #[tokio::test]
    async fn test_unparsable_decision_falls_back_to_direct() {
        let (cycle, _llm) = setup(vec!["需要调用工具", "让我想想", "营业时间为10:00-22:00"]);
        let mut c = ctx(5);
        let reply = cycle.step(&mut c).await.unwrap();
        assert_eq!(reply.as_deref(), Some("营业时间为10:00-22:00"));
        assert_eq!(c.tool_call_count, 0);
    }

    #[tokio::test]
    async fn test_system_prompt_leads_every_call() {
        let (cycle, llm) = setup(vec!["直接回复", "好的"]);
        let mut c = ctx(5);
        cycle.step(&mut c).await.unwrap();
        let sent = llm.last_messages();
        assert_eq!(sent[0].content, "SYS");
    }

    #[test]
    fn test_decision_prompt_lists_full_tool_descriptions() {
        let (cycle, _llm) = setup(vec![]);
        let prompt = cycle.decision_prompt();
        assert!(prompt.contains("工具名称: storeStatus\n功能描述: 查询店铺营业状态\n参数说明: \n工具类型: general"));
        assert!(prompt.ends_with("请给出你的行动决策："));

        let empty = ToolCallCycle::new(Arc::new(MockLlmClient::new()), Arc::new(ToolRegistry::new()));
        assert!(empty.decision_prompt().contains("当前可用工具：\n暂无可用工具"));
    }

    #[tokio::test]
    async fn test_stats_summary() {
        let (cycle, _llm) = setup(vec!["需要调用工具", "storeStatus()"]);
        let mut c = ctx(5);
        cycle.step(&mut c).await.unwrap();
        assert_eq!(
            cycle.stats_summary().unwrap(),
            "总工具调用次数：1，工具详细统计：{storestatus=1}"
        );
    }
}
