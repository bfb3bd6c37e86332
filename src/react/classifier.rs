//! 思考结果分类：判断模型的思考文本是否意味着需要调用工具
//!
//! 关键词启发式只是近似判断，可能多调或漏调工具；通过 `ActionClassifier` 可整体替换。

use crate::config::ClassifierSection;

pub trait ActionClassifier: Send + Sync {
    fn needs_action(&self, thinking: &str) -> bool;
}

pub const DEFAULT_ACTION_KEYWORDS: &[&str] = &[
    "调用工具",
    "查询",
    "搜索",
    "获取",
    "工具",
    "订单",
    "菜品",
    "营业",
    "状态",
    "信息",
    "call tool",
    "query",
    "search",
    "order",
    "dish",
    "hours",
    "status",
];

pub const DEFAULT_DIRECT_KEYWORDS: &[&str] = &[
    "直接回答",
    "不需要",
    "可以回答",
    "已知",
    "直接回复",
    "answer directly",
    "no tool",
];

/// 先扫描行动关键词，命中即需要行动；再扫描直接回复关键词；都未命中时默认不行动
pub struct KeywordClassifier {
    action_keywords: Vec<String>,
    direct_keywords: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACTION_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_DIRECT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl KeywordClassifier {
    pub fn new(action_keywords: Vec<String>, direct_keywords: Vec<String>) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|k| k.to_lowercase()).collect();
        Self {
            action_keywords: lower(action_keywords),
            direct_keywords: lower(direct_keywords),
        }
    }

    /// 配置中未给出的列表使用内置默认值
    pub fn from_config(section: &ClassifierSection) -> Self {
        let defaults = Self::default();
        Self::new(
            section
                .action_keywords
                .clone()
                .unwrap_or(defaults.action_keywords),
            section
                .direct_keywords
                .clone()
                .unwrap_or(defaults.direct_keywords),
        )
    }
}

impl ActionClassifier for KeywordClassifier {
    fn needs_action(&self, thinking: &str) -> bool {
        if thinking.trim().is_empty() {
            return false;
        }
        let lower = thinking.to_lowercase();

        if let Some(k) = self.action_keywords.iter().find(|k| lower.contains(k.as_str())) {
            tracing::debug!(keyword = %k, "Thinking matched action keyword");
            return true;
        }
        if let Some(k) = self.direct_keywords.iter().find(|k| lower.contains(k.as_str())) {
            tracing::debug!(keyword = %k, "Thinking matched direct-reply keyword");
            return false;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_keywords() {
        let c = KeywordClassifier::default();
        assert!(c.needs_action("需要调用工具 storeStatus 查看营业时间"));
        assert!(c.needs_action("I should QUERY the order"));
    }

    #[test]
    fn test_direct_and_default() {
        let c = KeywordClassifier::default();
        assert!(!c.needs_action("这个问题可以直接回答"));
        assert!(!c.needs_action("你好呀"));
        assert!(!c.needs_action("   "));
    }

    #[test]
    fn test_action_wins_when_both_match() {
        let c = KeywordClassifier::default();
        assert!(c.needs_action("不需要再查询了"));
    }

    #[test]
    fn test_from_config_override() {
        let section = ClassifierSection {
            action_keywords: Some(vec!["LOOKUP".to_string()]),
            direct_keywords: None,
        };
        let c = KeywordClassifier::from_config(&section);
        assert!(c.needs_action("please lookup"));
        assert!(!c.needs_action("查询订单"));
        assert!(!c.needs_action("直接回答"));
    }
}
