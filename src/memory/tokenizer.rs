//! 分词：FAQ 模糊检索用的中英文混合切词
//!
//! 含 CJK 字符时使用 jieba 搜索引擎模式，纯英文按空白切分；结果统一小写。

use std::collections::HashSet;
use std::sync::OnceLock;

use jieba_rs::Jieba;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}'
    )
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// 切词；单字英文与标点被丢弃，单个汉字保留
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if contains_cjk(text) {
        jieba()
            .cut_for_search(text, true)
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| s.chars().count() > 1 || s.chars().next().is_some_and(is_cjk))
            .collect()
    } else {
        text.split_whitespace()
            .map(|s| s.to_lowercase())
            .filter(|s| s.len() > 1)
            .collect()
    }
}

pub fn tokenize_to_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// 查询词集合与文本切词后的交集大小
pub fn overlap(query: &HashSet<String>, text: &str) -> usize {
    if query.is_empty() {
        return 0;
    }
    tokenize_to_set(text).intersection(query).count()
}
