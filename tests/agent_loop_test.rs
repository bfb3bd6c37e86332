//! Agent 循环集成测试：步数上限、超时、single-flight、解析优先级与端到端工具调用

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sky_agent::core::constants::{ERROR_MAX_STEPS_EXCEEDED, ERROR_TIMEOUT};
use sky_agent::llm::{LlmClient, LlmError, MockLlmClient, TextStream};
use sky_agent::memory::Message;
use sky_agent::react::{ReasonActCycle, RunContext, ToolCallCycle, ToolCallParser, TwoStageParser};
use sky_agent::tools::{Tool, ToolRegistry, ToolResult};
use sky_agent::{Agent, AgentError, AgentState};

/// 按提示内容应答：思考阶段要求调用工具，决策阶段给出固定调用，其余返回空串（触发模板回复）
struct ScriptedLlm {
    decision: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(decision: &str) -> Self {
        Self {
            decision: decision.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if last.contains("请给出你的思考过程和决策") {
            Ok("需要调用工具查询营业状态".to_string())
        } else if last.contains("请给出你的行动决策") {
            Ok(self.decision.clone())
        } else {
            Ok(String::new())
        }
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<TextStream, LlmError> {
        let text = self.complete(messages).await?;
        Ok(Box::pin(futures_util::stream::iter(vec![Ok(text)])))
    }
}

struct StoreStatus;

impl Tool for StoreStatus {
    fn name(&self) -> &str {
        "storeStatus"
    }
    fn description(&self) -> &str {
        "查询店铺营业状态"
    }
    fn parameter_help(&self) -> &str {
        "无"
    }
    fn validate(&self, _params: &str) -> bool {
        true
    }
    fn execute(&self, _params: &str) -> Result<ToolResult, AgentError> {
        Ok(ToolResult::success("storeStatus", "营业中"))
    }
}

fn registry() -> Arc<ToolRegistry> {
    let reg = Arc::new(ToolRegistry::new());
    reg.register(Arc::new(StoreStatus));
    reg
}

/// 始终返回 None 的 cycle，记录调用次数
struct NeverDone {
    steps: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl ReasonActCycle for NeverDone {
    async fn step(&self, _ctx: &mut RunContext) -> Result<Option<String>, AgentError> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }
}

#[tokio::test]
async fn test_max_steps_stops_at_exactly_three() {
    let cycle = Arc::new(NeverDone {
        steps: AtomicUsize::new(0),
        delay: Duration::ZERO,
    });
    let agent = Agent::with_cycle(cycle.clone()).with_max_steps(3);

    let report = agent.execute("你好", Some("u1")).await;
    assert_eq!(report.reply, ERROR_MAX_STEPS_EXCEEDED);
    assert_eq!(report.final_state, AgentState::Error);
    assert_eq!(report.steps, 3);
    assert_eq!(cycle.steps.load(Ordering::SeqCst), 3);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_slow_model_hits_timeout() {
    let llm = Arc::new(ScriptedLlm::new("storeStatus()").with_delay(Duration::from_millis(200)));
    let cycle = Arc::new(ToolCallCycle::new(llm, registry()));
    let agent = Agent::with_cycle(cycle)
        .with_max_steps(5)
        .with_timeout(Duration::from_millis(100));

    let report = agent.execute("你们几点开门", Some("u1")).await;
    assert_eq!(report.reply, ERROR_TIMEOUT);
    assert_eq!(report.final_state, AgentState::Timeout);
    assert!(matches!(report.error, Some(AgentError::Timeout { .. })));
    // 超时在第二轮开始前被发现
    assert_eq!(report.steps, 1);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_preempt_cancels_blocked_step() {
    let cycle = Arc::new(NeverDone {
        steps: AtomicUsize::new(0),
        delay: Duration::from_secs(30),
    });
    let agent = Agent::with_cycle(cycle)
        .with_timeout(Duration::from_millis(50))
        .with_preempt_on_timeout(true);

    let report = tokio::time::timeout(Duration::from_secs(5), agent.execute("hi", None))
        .await
        .expect("preempted run should finish quickly");
    assert_eq!(report.final_state, AgentState::Timeout);
}

#[tokio::test]
async fn test_second_run_rejected_while_first_in_flight() {
    let cycle = Arc::new(NeverDone {
        steps: AtomicUsize::new(0),
        delay: Duration::from_millis(100),
    });
    let agent = Arc::new(Agent::with_cycle(cycle).with_max_steps(2));

    let first = {
        let agent = agent.clone();
        tokio::spawn(async move { agent.execute("第一个问题", Some("u1")).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(agent.is_running());

    let second = agent.execute("第二个问题", Some("u2")).await;
    assert!(matches!(second.error, Some(AgentError::Busy(_))));
    assert_eq!(second.steps, 0);

    let first = first.await.unwrap();
    assert_eq!(first.final_state, AgentState::Error);
    assert_eq!(first.steps, 2);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_dropped_run_releases_agent() {
    let cycle = Arc::new(NeverDone {
        steps: AtomicUsize::new(0),
        delay: Duration::from_secs(30),
    });
    let agent = Agent::with_cycle(cycle);

    let result = tokio::time::timeout(Duration::from_millis(50), agent.execute("hi", None)).await;
    assert!(result.is_err());
    assert_eq!(agent.state(), AgentState::Idle);
    assert!(!agent.is_running());
}

#[test]
fn test_parsing_precedence() {
    let reg = ToolRegistry::new();
    reg.register(Arc::new(StoreStatus));
    let parser = TwoStageParser;

    let call = parser.parse("orderQuery(12345678)", &reg).unwrap();
    assert_eq!(call.tool, "orderquery");
    assert_eq!(call.params, "12345678");

    let call = parser.parse("我来看看\n调用 storeStatus 获取信息", &reg).unwrap();
    assert_eq!(call.tool, "storestatus");
    assert_eq!(call.params, "");

    assert!(parser.parse("我们的营业时间是早十点到晚十点", &reg).is_none());
}

#[tokio::test]
async fn test_end_to_end_store_status() {
    let reg = registry();
    let llm = Arc::new(ScriptedLlm::new("storeStatus()"));
    let cycle = Arc::new(ToolCallCycle::new(llm.clone(), reg.clone()));
    let agent = Agent::with_cycle(cycle.clone()).with_max_steps(3);

    let report = agent.execute("你们几点开门", Some("u1")).await;
    assert_eq!(report.final_state, AgentState::Completed);
    assert!(report.reply.contains("营业中"), "reply: {}", report.reply);
    // 第 2 步是最后可用步，工具调用后直接生成最终回复
    assert_eq!(report.steps, 2);
    assert_eq!(reg.call_stats().get("storestatus"), Some(&2));
    assert_eq!(cycle.total_tool_calls(), 2);
    // 思考 + 决策，思考 + 决策 + 最终回复
    assert_eq!(llm.calls.load(Ordering::SeqCst), 5);
    assert_eq!(agent.state(), AgentState::Idle);
}

#[tokio::test]
async fn test_failed_tool_ends_run_with_apology() {
    let llm = Arc::new(ScriptedLlm::new("orderQuery(1)"));
    let cycle = Arc::new(ToolCallCycle::new(llm, registry()));
    let agent = Agent::with_cycle(cycle).with_max_steps(5);

    let report = agent.execute("查下订单", None).await;
    assert_eq!(report.final_state, AgentState::Completed);
    assert_eq!(report.steps, 1);
    assert!(report.reply.starts_with("抱歉，"));
    assert!(report.reply.ends_with("请稍后再试或联系人工客服。"));
}

#[tokio::test]
async fn test_run_stream_yields_single_final_message() {
    let llm = Arc::new(MockLlmClient::new().with_replies(["这个可以直接回答", "每天10:00-22:00营业"]));
    let cycle = Arc::new(ToolCallCycle::new(llm, registry()));
    let agent = Arc::new(Agent::with_cycle(cycle));

    let mut rx = agent.clone().run_stream("营业到几点".to_string(), Some("u1".to_string()));
    assert_eq!(rx.recv().await.as_deref(), Some("每天10:00-22:00营业"));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_run_stream_timeout_sends_timeout_message() {
    let cycle = Arc::new(NeverDone {
        steps: AtomicUsize::new(0),
        delay: Duration::from_secs(30),
    });
    let agent = Arc::new(Agent::with_cycle(cycle).with_stream_timeout(Duration::from_millis(50)));

    let mut rx = agent.clone().run_stream("hi".to_string(), None);
    assert_eq!(rx.recv().await.as_deref(), Some(ERROR_TIMEOUT));
    assert!(rx.recv().await.is_none());

    // 被中止的后台 run 会释放 single-flight 槽位
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(agent.state(), AgentState::Idle);
}
