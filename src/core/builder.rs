//! Agent 构建器：统一的 Agent 初始化逻辑
//!
//! 注册表在进程启动时构造一次，由所有 Agent 共享；LLM、分类器与解析器均可替换。

use std::sync::Arc;

use crate::agent::Agent;
use crate::config::AppConfig;
use crate::core::constants::CUSTOMER_SERVICE_SYSTEM_PROMPT;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::react::{ActionClassifier, KeywordClassifier, ToolCallCycle, ToolCallParser, TwoStageParser};
use crate::tools::{
    DemoDishService, DemoFaqService, DemoOrderService, DemoStoreService, DishRecommendTool,
    FaqTool, OrderQueryTool, StoreStatusTool, Tool, ToolRegistry,
};

/// 注册四个客服工具（内存演示数据）
pub fn build_tool_registry() -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new());
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(OrderQueryTool::new(Arc::new(DemoOrderService::default()))),
        Arc::new(DishRecommendTool::new(Arc::new(DemoDishService::default()))),
        Arc::new(StoreStatusTool::new(Arc::new(DemoStoreService::default()))),
        Arc::new(FaqTool::new(Arc::new(DemoFaqService::default()))),
    ];
    let count = registry.register_batch(tools);
    tracing::info!(count, "Customer service tools registered");
    registry
}

pub struct AgentBuilder {
    config: AppConfig,
    registry: Arc<ToolRegistry>,
    llm: Option<Arc<dyn LlmClient>>,
    classifier: Option<Arc<dyn ActionClassifier>>,
    parser: Option<Arc<dyn ToolCallParser>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig, registry: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            registry,
            llm: None,
            classifier: None,
            parser: None,
        }
    }

    /// 未设置时按配置选择提供商
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ActionClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ToolCallParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn build_cycle(&self) -> ToolCallCycle {
        let llm = self
            .llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&self.config));
        let classifier = self
            .classifier
            .clone()
            .unwrap_or_else(|| Arc::new(KeywordClassifier::from_config(&self.config.classifier)));
        let parser = self.parser.clone().unwrap_or_else(|| Arc::new(TwoStageParser));

        ToolCallCycle::new(llm, self.registry.clone())
            .with_classifier(classifier)
            .with_parser(parser)
    }

    pub fn build(self) -> Agent {
        let cycle = Arc::new(self.build_cycle());
        let agent_cfg = &self.config.agent;
        let system_prompt = agent_cfg
            .system_prompt
            .clone()
            .unwrap_or_else(|| CUSTOMER_SERVICE_SYSTEM_PROMPT.to_string());

        Agent::new(agent_cfg.name.clone(), system_prompt, cycle)
            .with_max_steps(agent_cfg.max_steps)
            .with_timeout(agent_cfg.timeout())
            .with_stream_timeout(agent_cfg.stream_timeout())
            .with_preempt_on_timeout(agent_cfg.preempt_on_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use std::time::Duration;

    #[test]
    fn test_registry_has_four_tools() {
        let reg = build_tool_registry();
        assert_eq!(
            reg.list_names(),
            vec!["orderquery", "dishrecommend", "storestatus", "faq"]
        );
        assert_eq!(reg.tools_by_type("store").len(), 1);
    }

    #[test]
    fn test_build_applies_agent_config() {
        let mut cfg = AppConfig::default();
        cfg.agent.max_steps = 4;
        cfg.agent.timeout_ms = 2_000;
        cfg.agent.system_prompt = Some("你是测试助手".to_string());

        let agent = AgentBuilder::new(cfg, build_tool_registry())
            .with_llm(Arc::new(MockLlmClient::new()))
            .build();
        assert_eq!(agent.max_steps(), 4);
        assert_eq!(agent.timeout(), Duration::from_secs(2));
        assert_eq!(agent.profile().system_prompt, "你是测试助手");
        assert!(agent.cycle().stats_summary().is_some());
    }
}
