//! Agent 运行时
//!
//! 持有状态机、步数与超时预算，反复调用 `ReasonActCycle::step` 直到得到回复或触发终止条件：
//! - 每轮开始前检查墙钟超时（协作式），超时即 TIMEOUT
//! - 步骤返回 Some(回复) 即 COMPLETED；步骤出错即 ERROR，不重试
//! - 步数用尽仍无回复即 ERROR（步数过多）
//!
//! 同一实例同时只允许一个 run（single-flight）。每次 run 新建 `RunContext`，
//! 由 `RunGuard` 在任何退出路径（包括 future 被丢弃）上执行清理并回到 IDLE。
//! 错误不会越过 `run`，一律转为固定的用户可见文案；需要类型化结果时使用 `execute`。

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::core::constants::{
    CUSTOMER_SERVICE_SYSTEM_PROMPT, DEFAULT_AGENT_NAME, DEFAULT_MAX_STEPS,
    DEFAULT_STREAM_TIMEOUT_MS, DEFAULT_TIMEOUT_MS, ERROR_GENERAL, ERROR_TIMEOUT,
    REACT_NEXT_STEP_PROMPT, SUCCESS_TASK_COMPLETED,
};
use crate::core::{AgentError, AgentState};
use crate::react::{AgentProfile, ReasonActCycle, RunContext};

/// Agent 的可观察运行状态
#[derive(Clone, Debug, Default)]
pub struct AgentStatus {
    pub state: AgentState,
    pub current_step: usize,
    pub started_at: Option<Instant>,
    pub conversation_id: Option<String>,
}

/// 一次 run 的类型化结果；run 结束后状态会回到 IDLE，终态保存在 final_state
#[derive(Debug)]
pub struct RunReport {
    pub reply: String,
    pub final_state: AgentState,
    pub steps: usize,
    pub error: Option<AgentError>,
}

pub struct Agent {
    profile: Arc<AgentProfile>,
    max_steps: usize,
    timeout: Duration,
    stream_timeout: Duration,
    preempt_on_timeout: bool,
    cycle: Arc<dyn ReasonActCycle>,
    status: Arc<Mutex<AgentStatus>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        cycle: Arc<dyn ReasonActCycle>,
    ) -> Self {
        let profile = AgentProfile {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            next_step_prompt: REACT_NEXT_STEP_PROMPT.to_string(),
        };
        tracing::info!(agent = %profile.name, id = %profile.id, "Agent created");
        Self {
            profile: Arc::new(profile),
            max_steps: DEFAULT_MAX_STEPS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            stream_timeout: Duration::from_millis(DEFAULT_STREAM_TIMEOUT_MS),
            preempt_on_timeout: false,
            cycle,
            status: Arc::new(Mutex::new(AgentStatus::default())),
        }
    }

    /// 默认名称与客服提示词，搭配任意 cycle
    pub fn with_cycle(cycle: Arc<dyn ReasonActCycle>) -> Self {
        Self::new(DEFAULT_AGENT_NAME, CUSTOMER_SERVICE_SYSTEM_PROMPT, cycle)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// 开启后单步也受剩余预算约束，阻塞在模型调用里的步骤会被取消
    pub fn with_preempt_on_timeout(mut self, enable: bool) -> Self {
        self.preempt_on_timeout = enable;
        self
    }

    pub fn with_next_step_prompt(mut self, prompt: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.profile).next_step_prompt = prompt.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> AgentState {
        self.status.lock().state
    }

    pub fn current_step(&self) -> usize {
        self.status.lock().current_step
    }

    pub fn status(&self) -> AgentStatus {
        self.status.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    pub fn cycle(&self) -> &Arc<dyn ReasonActCycle> {
        &self.cycle
    }

    /// 执行一次对话，总是返回非空文本
    pub async fn run(&self, input: &str, conversation_id: Option<&str>) -> String {
        self.execute(input, conversation_id).await.reply
    }

    pub async fn execute(&self, input: &str, conversation_id: Option<&str>) -> RunReport {
        if let Err(e) = self.begin(conversation_id) {
            tracing::warn!(agent = %self.profile.name, "Run rejected: agent is busy");
            return RunReport {
                reply: e.user_message().to_string(),
                final_state: AgentState::Error,
                steps: 0,
                error: Some(e),
            };
        }

        let started = Instant::now();
        let ctx = RunContext::new(
            self.profile.clone(),
            self.max_steps,
            conversation_id.map(str::to_string),
            self.status.clone(),
        );
        let mut guard = RunGuard {
            cycle: self.cycle.clone(),
            status: self.status.clone(),
            ctx,
        };
        tracing::info!(
            agent = %self.profile.name,
            conversation = ?conversation_id,
            max_steps = self.max_steps,
            "Agent run started"
        );

        self.cycle.initialize(&mut guard.ctx).await;
        guard.ctx.history.push_user(input);

        let outcome = self.drive(&mut guard.ctx, started).await;
        let steps = guard.ctx.current_step;
        let (reply, final_state, error) = match outcome {
            Ok((reply, state)) => (reply, state, None),
            Err(e) => {
                let state = match e {
                    AgentError::Timeout { .. } => AgentState::Timeout,
                    _ => AgentState::Error,
                };
                (e.user_message().to_string(), state, Some(e))
            }
        };
        guard.ctx.set_state(final_state);

        tracing::info!(
            agent = %self.profile.name,
            state = final_state.code(),
            steps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Agent run finished"
        );
        drop(guard);

        RunReport {
            reply,
            final_state,
            steps,
            error,
        }
    }

    /// 原子地检查并占用 single-flight 槽位
    fn begin(&self, conversation_id: Option<&str>) -> Result<(), AgentError> {
        let mut status = self.status.lock();
        if status.state.is_active() {
            return Err(AgentError::Busy(self.profile.name.clone()));
        }
        *status = AgentStatus {
            state: AgentState::Running,
            current_step: 0,
            started_at: Some(Instant::now()),
            conversation_id: conversation_id.map(str::to_string),
        };
        Ok(())
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        started: Instant,
    ) -> Result<(String, AgentState), AgentError> {
        let budget_ms = self.timeout.as_millis() as u64;

        while ctx.current_step < ctx.max_steps {
            let elapsed = started.elapsed();
            if elapsed > self.timeout {
                tracing::warn!(agent = %self.profile.name, step = ctx.current_step, "Run timed out");
                return Err(AgentError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    budget_ms,
                });
            }

            ctx.current_step += 1;
            ctx.sync_step();
            tracing::debug!(agent = %self.profile.name, step = ctx.current_step, max = ctx.max_steps, "Executing step");

            let outcome = if self.preempt_on_timeout {
                let remaining = self.timeout.saturating_sub(elapsed);
                match tokio::time::timeout(remaining, self.cycle.step(ctx)).await {
                    Ok(r) => r,
                    Err(_) => {
                        tracing::warn!(agent = %self.profile.name, step = ctx.current_step, "Step preempted by deadline");
                        return Err(AgentError::Timeout {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                            budget_ms,
                        });
                    }
                }
            } else {
                self.cycle.step(ctx).await
            };

            match outcome {
                Ok(Some(reply)) => return Ok((reply, AgentState::Completed)),
                Ok(None) => {
                    let state = ctx.state();
                    if state.is_terminal() {
                        let reply = if state == AgentState::Completed {
                            SUCCESS_TASK_COMPLETED
                        } else {
                            ERROR_GENERAL
                        };
                        return Ok((reply.to_string(), state));
                    }
                }
                Err(e) => {
                    tracing::error!(agent = %self.profile.name, step = ctx.current_step, error = %e, "Step failed");
                    return Err(AgentError::Step(e.to_string()));
                }
            }
        }

        tracing::warn!(agent = %self.profile.name, max_steps = ctx.max_steps, "Max steps exceeded");
        Err(AgentError::MaxStepsExceeded(ctx.max_steps))
    }

    /// 在后台任务中执行 run，把唯一的最终文本推入通道后关闭
    pub fn run_stream(
        self: Arc<Self>,
        input: String,
        conversation_id: Option<String>,
    ) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(1);
        let stream_timeout = self.stream_timeout;

        tokio::spawn(async move {
            let agent = self.clone();
            let handle = tokio::spawn(async move {
                agent.run(&input, conversation_id.as_deref()).await
            });
            let abort = handle.abort_handle();

            let reply = match tokio::time::timeout(stream_timeout, handle).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    tracing::error!(agent = %self.profile.name, error = %e, "Streaming run task failed");
                    ERROR_GENERAL.to_string()
                }
                Err(_) => {
                    tracing::warn!(agent = %self.profile.name, "Streaming run timed out");
                    abort.abort();
                    ERROR_TIMEOUT.to_string()
                }
            };
            let _ = tx.send(reply).await;
        });

        rx
    }

    /// 回到 IDLE；有 run 在执行时拒绝（该 run 结束时会由自身的 guard 复位）
    pub fn reset(&self) -> Result<(), AgentError> {
        let mut status = self.status.lock();
        if status.state.is_active() {
            tracing::warn!(agent = %self.profile.name, state = status.state.code(), "Reset refused: run in flight");
            return Err(AgentError::Busy(self.profile.name.clone()));
        }
        *status = AgentStatus::default();
        tracing::info!(agent = %self.profile.name, "Agent reset");
        Ok(())
    }

    pub fn status_summary(&self) -> String {
        let status = self.status.lock();
        format!(
            "智能体[{}] - 状态: {}, 步骤: {}/{}, ID: {}",
            self.profile.name,
            status.state.description(),
            status.current_step,
            self.max_steps,
            self.profile.id
        )
    }
}

/// 持有本次 run 的上下文；析构时执行 cycle 清理、清空历史并回到 IDLE
struct RunGuard {
    cycle: Arc<dyn ReasonActCycle>,
    status: Arc<Mutex<AgentStatus>>,
    ctx: RunContext,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.cycle.cleanup(&mut self.ctx);
        self.ctx.history.clear();
        self.ctx.current_step = 0;
        *self.status.lock() = AgentStatus::default();
        tracing::debug!(agent = %self.ctx.profile.name, "Run context released");
    }
}
