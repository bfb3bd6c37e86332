//! 菜品推荐工具：按价格区间 / 餐食类型 / 菜系 / 关键词推荐，空参数返回热门

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::core::AgentError;
use crate::tools::{Tool, ToolResult};

pub const DISH_RECOMMEND_TOOL: &str = "dishRecommend";

const MEAL_TYPES: [&str; 5] = ["早餐", "午餐", "晚餐", "夜宵", "下午茶"];
const CUISINE_MARKERS: [&str; 3] = ["菜", "料理", "风味"];

/// 推荐条件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecommendRequest {
    Popular,
    Price(String),
    Meal(String),
    Cuisine(String),
    Keyword(String),
}

impl RecommendRequest {
    pub fn parse(params: &str) -> Self {
        static PRICE: OnceLock<Option<Regex>> = OnceLock::new();
        let price = PRICE.get_or_init(|| Regex::new(r"^(\d+-\d+|\d+以下|\d+以上)$").ok());

        let p = params.trim();
        if p.is_empty() {
            RecommendRequest::Popular
        } else if price.as_ref().is_some_and(|re| re.is_match(p)) {
            RecommendRequest::Price(p.to_string())
        } else if MEAL_TYPES.iter().any(|m| p.contains(m)) {
            RecommendRequest::Meal(p.to_string())
        } else if CUISINE_MARKERS.iter().any(|m| p.contains(m)) {
            RecommendRequest::Cuisine(p.to_string())
        } else {
            RecommendRequest::Keyword(p.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecommendRequest::Popular => "popular",
            RecommendRequest::Price(_) => "price",
            RecommendRequest::Meal(_) => "meal",
            RecommendRequest::Cuisine(_) => "cuisine",
            RecommendRequest::Keyword(_) => "keyword",
        }
    }

    fn title(&self) -> String {
        match self {
            RecommendRequest::Popular => "🔥 热门推荐".to_string(),
            RecommendRequest::Price(r) => format!("💰 价格区间推荐：{r}"),
            RecommendRequest::Meal(m) => format!("🍽️ {m}推荐"),
            RecommendRequest::Cuisine(c) => format!("🥘 {c}推荐"),
            RecommendRequest::Keyword(k) => format!("🔍 \"{k}\" 相关推荐"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Dish {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub rating: f64,
    pub sales_count: u32,
    pub category: String,
    pub tags: Vec<String>,
}

pub trait DishRecommendService: Send + Sync {
    fn recommend(&self, request: &RecommendRequest) -> Result<Vec<Dish>, AgentError>;
}

pub struct DishRecommendTool {
    service: Arc<dyn DishRecommendService>,
}

impl DishRecommendTool {
    pub fn new(service: Arc<dyn DishRecommendService>) -> Self {
        Self { service }
    }
}

impl Tool for DishRecommendTool {
    fn name(&self) -> &str {
        DISH_RECOMMEND_TOOL
    }

    fn description(&self) -> &str {
        "根据用户喜好推荐菜品"
    }

    fn parameter_help(&self) -> &str {
        "推荐条件（可选）- 可以是菜系（如：川菜、粤菜）、价格区间（如：20-50）、餐食类型（如：早餐、午餐、晚餐）或者空参数获取热门推荐"
    }

    fn tool_type(&self) -> &str {
        "dish"
    }

    /// 空参数返回热门推荐
    fn validate(&self, _params: &str) -> bool {
        true
    }

    fn execute(&self, params: &str) -> Result<ToolResult, AgentError> {
        let request = RecommendRequest::parse(params);
        tracing::info!(kind = request.kind(), "Recommending dishes");

        let dishes = match self.service.recommend(&request) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "Dish recommendation failed");
                return Ok(ToolResult::failure(self.name(), "推荐菜品时发生错误，请稍后再试"));
            }
        };
        if dishes.is_empty() {
            return Ok(ToolResult::failure(
                self.name(),
                "暂时没有符合条件的菜品推荐，请稍后再试",
            ));
        }
        Ok(ToolResult::success(self.name(), format_dishes(&dishes, &request)))
    }
}

fn format_dishes(dishes: &[Dish], request: &RecommendRequest) -> String {
    let mut out = request.title();
    out.push_str("\n\n");

    for (i, dish) in dishes.iter().enumerate() {
        let _ = writeln!(out, "{}. 🍽️ **{}**", i + 1, dish.name);
        let _ = writeln!(out, "   💰 价格：¥{:.2}", dish.price);
        if !dish.description.is_empty() {
            let _ = writeln!(out, "   📝 简介：{}", dish.description);
        }
        if dish.rating > 0.0 {
            let _ = writeln!(out, "   ⭐ 评分：{:.1}分", dish.rating);
        }
        if dish.sales_count > 0 {
            let _ = writeln!(out, "   🔥 月销量：{}份", dish.sales_count);
        }
        if !dish.tags.is_empty() {
            let _ = writeln!(out, "   🏷️ 标签：{}", dish.tags.join(" "));
        }
        out.push('\n');
    }

    out.push_str("💡 贴心提示：\n");
    out.push_str("- 部分菜品可能有时令限制\n");
    out.push_str("- 如需修改菜品配置，请在备注中说明");
    out
}

/// 内存菜单；价格区间按价格过滤，菜系与关键词按分类、名称、标签匹配，匹配不到时退回热门
pub struct DemoDishService {
    menu: Vec<Dish>,
}

impl DemoDishService {
    pub fn new(menu: Vec<Dish>) -> Self {
        Self { menu }
    }

    fn popular(&self) -> Vec<Dish> {
        let mut all = self.menu.clone();
        all.sort_by(|a, b| b.sales_count.cmp(&a.sales_count));
        all
    }

    fn in_price_range(range: &str, price: f64) -> bool {
        if let Some(max) = range.strip_suffix("以下") {
            return max.parse::<f64>().is_ok_and(|m| price <= m);
        }
        if let Some(min) = range.strip_suffix("以上") {
            return min.parse::<f64>().is_ok_and(|m| price >= m);
        }
        match range.split_once('-') {
            Some((lo, hi)) => match (lo.parse::<f64>(), hi.parse::<f64>()) {
                (Ok(lo), Ok(hi)) => price >= lo && price <= hi,
                _ => false,
            },
            None => false,
        }
    }

    fn matches_text(dish: &Dish, text: &str) -> bool {
        text.contains(&dish.category)
            || dish.name.contains(text)
            || dish.tags.iter().any(|t| text.contains(t.as_str()))
    }
}

impl Default for DemoDishService {
    fn default() -> Self {
        let dish = |id, name: &str, price, desc: &str, rating, sales, cat: &str, tags: [&str; 2]| Dish {
            id,
            name: name.to_string(),
            price,
            description: desc.to_string(),
            rating,
            sales_count: sales,
            category: cat.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        Self::new(vec![
            dish(1, "麻婆豆腐", 22.0, "经典川菜，麻辣鲜香，豆腐嫩滑", 4.8, 1520, "川菜", ["招牌菜", "下饭神器"]),
            dish(2, "回锅肉", 32.0, "四川传统菜肴，肥而不腻，香气扑鼻", 4.7, 980, "川菜", ["经典菜", "家常菜"]),
            dish(3, "蒸蛋羹", 8.0, "嫩滑如丝，营养丰富，老少皆宜", 4.9, 2100, "家常菜", ["养生", "清淡"]),
        ])
    }
}

impl DishRecommendService for DemoDishService {
    fn recommend(&self, request: &RecommendRequest) -> Result<Vec<Dish>, AgentError> {
        let picked: Vec<Dish> = match request {
            RecommendRequest::Popular | RecommendRequest::Meal(_) => self.popular(),
            RecommendRequest::Price(range) => self
                .popular()
                .into_iter()
                .filter(|d| Self::in_price_range(range, d.price))
                .collect(),
            RecommendRequest::Cuisine(text) | RecommendRequest::Keyword(text) => {
                let hits: Vec<Dish> = self
                    .popular()
                    .into_iter()
                    .filter(|d| Self::matches_text(d, text))
                    .collect();
                if hits.is_empty() {
                    self.popular()
                } else {
                    hits
                }
            }
        };
        Ok(picked)
    }
}
