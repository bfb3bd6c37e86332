//! 常见问题工具：精确检索 → 分词模糊检索 → 无结果时给出分类浏览建议

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;

use crate::core::AgentError;
use crate::memory::tokenizer;
use crate::tools::{Tool, ToolResult};

pub const FAQ_TOOL: &str = "faq";

/// 单次回复最多展示的问答条数
const MAX_RESULTS: usize = 5;
const MAX_RELATED: usize = 3;

const DEFAULT_CATEGORIES: [&str; 5] = ["订单问题", "支付问题", "配送问题", "退款问题", "账户问题"];

#[derive(Clone, Debug)]
pub struct FaqItem {
    pub id: u64,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub actions: Vec<String>,
}

pub trait FaqService: Send + Sync {
    fn search(&self, keyword: &str) -> Result<Vec<FaqItem>, AgentError>;
    fn fuzzy_search(&self, keyword: &str) -> Result<Vec<FaqItem>, AgentError>;
    fn related(&self, keyword: &str, hits: &[FaqItem]) -> Vec<FaqItem>;
    fn categories(&self) -> Vec<String>;
}

pub struct FaqTool {
    service: Arc<dyn FaqService>,
    /// 问题 id → 命中次数
    question_stats: DashMap<u64, u64>,
}

impl FaqTool {
    pub fn new(service: Arc<dyn FaqService>) -> Self {
        Self {
            service,
            question_stats: DashMap::new(),
        }
    }

    pub fn question_stats(&self) -> HashMap<u64, u64> {
        self.question_stats
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect()
    }

    fn lookup(&self, keyword: &str) -> Result<Vec<FaqItem>, AgentError> {
        let exact = self.service.search(keyword)?;
        if !exact.is_empty() {
            return Ok(exact);
        }
        tracing::debug!(keyword = %keyword, "No exact FAQ hit, trying fuzzy search");
        self.service.fuzzy_search(keyword)
    }

    fn format_hits(&self, items: &[FaqItem], keyword: &str) -> String {
        let mut out = format!("🔍 关于\"{keyword}\"的常见问题解答：\n\n");
        for (i, item) in items.iter().take(MAX_RESULTS).enumerate() {
            let _ = writeln!(out, "**Q{}: {}**", i + 1, item.question);
            let _ = writeln!(out, "A{}: {}", i + 1, item.answer);
            if !item.actions.is_empty() {
                let _ = writeln!(out, "🔧 相关操作：{}", item.actions.join(" "));
            }
            out.push('\n');
        }
        if items.len() > MAX_RESULTS {
            let _ = write!(
                out,
                "📝 还有 {} 条相关问题，请尝试更具体的关键词搜索。\n\n",
                items.len() - MAX_RESULTS
            );
        }

        let related = self.service.related(keyword, items);
        if !related.is_empty() {
            out.push_str("💡 您可能还想了解：\n");
            for r in related.iter().take(MAX_RELATED) {
                let _ = writeln!(out, "- {}", r.question);
            }
            out.push('\n');
        }

        out.push_str("❓ 如果以上回答没有解决您的问题，您可以：\n");
        out.push_str("- 尝试使用其他关键词重新搜索\n");
        out.push_str("- 联系人工客服：400-8888-888");
        out
    }

    fn format_no_result(&self, keyword: &str) -> String {
        let mut out = format!("❌ 很抱歉，没有找到关于\"{keyword}\"的相关问题。\n\n");
        out.push_str("📚 您可以浏览以下常见问题分类：\n");
        let mut categories = self.service.categories();
        if categories.is_empty() {
            categories = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        }
        for c in categories {
            let _ = writeln!(out, "- {c}");
        }
        out.push_str("\n🤝 需要人工帮助？\n");
        out.push_str("- 客服热线：400-8888-888\n");
        out.push_str("- 服务时间：9:00-21:00");
        out
    }
}

impl Tool for FaqTool {
    fn name(&self) -> &str {
        FAQ_TOOL
    }

    fn description(&self) -> &str {
        "查询和解答常见问题"
    }

    fn parameter_help(&self) -> &str {
        "问题关键词或问题内容（必须）- 可以是具体问题、关键词或问题分类，如：'退款'、'配送时间'、'支付问题'"
    }

    fn tool_type(&self) -> &str {
        "faq"
    }

    fn execute(&self, params: &str) -> Result<ToolResult, AgentError> {
        let keyword = params.trim();
        let items = match self.lookup(keyword) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(keyword = %keyword, error = %e, "FAQ search failed");
                return Ok(ToolResult::failure(self.name(), "查询常见问题时发生错误，请稍后再试"));
            }
        };
        tracing::info!(keyword = %keyword, hits = items.len(), "FAQ search done");

        if items.is_empty() {
            return Ok(ToolResult::success(self.name(), self.format_no_result(keyword)));
        }
        for item in &items {
            *self.question_stats.entry(item.id).or_insert(0) += 1;
        }
        Ok(ToolResult::success(self.name(), self.format_hits(&items, keyword)))
    }
}

/// 内存问答库：精确检索按关键词包含，模糊检索按 jieba 分词重叠
pub struct DemoFaqService {
    items: Vec<FaqItem>,
}

impl DemoFaqService {
    pub fn new(items: Vec<FaqItem>) -> Self {
        Self { items }
    }
}

impl Default for DemoFaqService {
    fn default() -> Self {
        let item = |id, q: &str, a: &str, cat: &str, kws: &[&str], actions: &[&str]| FaqItem {
            id,
            question: q.to_string(),
            answer: a.to_string(),
            category: cat.to_string(),
            keywords: kws.iter().map(|s| s.to_string()).collect(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
        };
        Self::new(vec![
            item(
                1,
                "配送需要多长时间？",
                "正常情况下配送时间为30-45分钟，具体时间会根据距离、天气和订单量有所调整。",
                "配送问题",
                &["配送", "送餐"],
                &[],
            ),
            item(
                2,
                "如何申请退款？",
                "您可以在订单详情页面点击'申请退款'，或联系客服400-8888-888处理。退款一般1-3个工作日内到账。",
                "退款问题",
                &["退款"],
                &["联系客服", "查看订单"],
            ),
            item(
                3,
                "如何联系配送员？",
                "订单派送后，您可以在订单详情页面查看配送员电话。",
                "配送问题",
                &["配送员", "骑手"],
                &[],
            ),
            item(
                4,
                "支持哪些支付方式？",
                "目前支持微信支付，下单后15分钟内未支付订单将自动取消。",
                "支付问题",
                &["支付", "付款"],
                &[],
            ),
        ])
    }
}

impl FaqService for DemoFaqService {
    fn search(&self, keyword: &str) -> Result<Vec<FaqItem>, AgentError> {
        Ok(self
            .items
            .iter()
            .filter(|i| {
                i.category == keyword || i.keywords.iter().any(|k| keyword.contains(k.as_str()))
            })
            .cloned()
            .collect())
    }

    fn fuzzy_search(&self, keyword: &str) -> Result<Vec<FaqItem>, AgentError> {
        let query = tokenizer::tokenize_to_set(keyword);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(usize, &FaqItem)> = self
            .items
            .iter()
            .map(|i| (tokenizer::overlap(&query, &format!("{} {}", i.question, i.answer)), i))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        Ok(scored.into_iter().map(|(_, i)| i.clone()).collect())
    }

    /// 与命中条目同分类、但未命中的问题
    fn related(&self, _keyword: &str, hits: &[FaqItem]) -> Vec<FaqItem> {
        self.items
            .iter()
            .filter(|i| hits.iter().any(|h| h.category == i.category))
            .filter(|i| hits.iter().all(|h| h.id != i.id))
            .cloned()
            .collect()
    }

    fn categories(&self) -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> FaqTool {
        FaqTool::new(Arc::new(DemoFaqService::default()))
    }

    #[test]
    fn test_exact_hit_with_related() {
        let t = tool();
        let r = t.execute("退款").unwrap();
        let data = r.data().unwrap();
        assert!(data.contains("**Q1: 如何申请退款？**"));
        assert!(data.contains("🔧 相关操作：联系客服 查看订单"));

        // 命中“配送”时，同分类未命中的“如何联系配送员？”作为相关问题出现
        let r = t.execute("配送").unwrap();
        let data = r.data().unwrap();
        assert!(data.contains("您可能还想了解"));
    }

    #[test]
    fn test_fuzzy_fallback() {
        let r = tool().execute("微信怎么付").unwrap();
        assert!(r.data().unwrap().contains("支持哪些支付方式"));
    }

    #[test]
    fn test_no_result_lists_categories() {
        let r = tool().execute("xyz").unwrap();
        assert!(r.is_success());
        let data = r.data().unwrap();
        assert!(data.starts_with("❌ 很抱歉"));
        assert!(data.contains("- 账户问题"));
    }

    #[test]
    fn test_question_stats() {
        let t = tool();
        t.execute("退款").unwrap();
        t.execute("退款").unwrap();
        assert_eq!(t.question_stats().get(&2), Some(&2));
    }

    #[test]
    fn test_blank_keyword_rejected() {
        assert!(!tool().validate("  "));
    }
}
