//! 店铺状态工具：营业状态、营业时间、配送、公告与联系方式

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Local;

use crate::core::AgentError;
use crate::tools::{Tool, ToolResult};

pub const STORE_STATUS_TOOL: &str = "storeStatus";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreQuery {
    Status,
    Hours,
    Delivery,
    Announcement,
    Contact,
}

impl StoreQuery {
    /// 按关键词归类，匹配不到时查询当前状态
    pub fn parse(params: &str) -> Self {
        let p = params.trim();
        let has = |words: &[&str]| words.iter().any(|w| p.contains(w));
        if p.is_empty() {
            StoreQuery::Status
        } else if has(&["营业时间", "时间"]) {
            StoreQuery::Hours
        } else if has(&["配送范围", "配送", "范围"]) {
            StoreQuery::Delivery
        } else if has(&["公告", "通知", "活动"]) {
            StoreQuery::Announcement
        } else if has(&["联系", "电话", "地址"]) {
            StoreQuery::Contact
        } else {
            StoreQuery::Status
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StoreInfo {
    pub store_name: String,
    pub is_open: bool,
    pub business_hours: String,
    pub next_open_time: Option<String>,
    pub close_time: Option<String>,
    pub delivery_available: bool,
    pub delivery_range: String,
    pub delivery_fee: String,
    pub delivery_time: String,
    pub min_order_amount: f64,
    pub free_delivery_amount: Option<f64>,
    pub address: String,
    pub phone: String,
    pub customer_service_phone: String,
    pub email: Option<String>,
    pub announcements: Vec<String>,
    pub promotions: Vec<String>,
    pub special_hours: Vec<String>,
}

pub trait StoreStatusService: Send + Sync {
    fn store_info(&self) -> Result<Option<StoreInfo>, AgentError>;
}

pub struct StoreStatusTool {
    service: Arc<dyn StoreStatusService>,
}

impl StoreStatusTool {
    pub fn new(service: Arc<dyn StoreStatusService>) -> Self {
        Self { service }
    }
}

impl Tool for StoreStatusTool {
    fn name(&self) -> &str {
        STORE_STATUS_TOOL
    }

    fn description(&self) -> &str {
        "查询店铺营业状态和基本信息"
    }

    fn parameter_help(&self) -> &str {
        "查询类型（可选）- 可以是'营业时间'、'配送范围'、'店铺公告'或空参数查询当前状态"
    }

    fn tool_type(&self) -> &str {
        "store"
    }

    fn validate(&self, _params: &str) -> bool {
        true
    }

    fn execute(&self, params: &str) -> Result<ToolResult, AgentError> {
        let query = StoreQuery::parse(params);
        tracing::info!(query = ?query, "Querying store status");

        let info = match self.service.store_info() {
            Ok(Some(info)) => info,
            Ok(None) => {
                return Ok(ToolResult::failure(self.name(), "无法获取店铺信息，请稍后再试"));
            }
            Err(e) => {
                tracing::error!(error = %e, "Store status query failed");
                return Ok(ToolResult::failure(self.name(), "查询店铺状态时发生错误，请稍后再试"));
            }
        };

        let text = match query {
            StoreQuery::Status => format_status(&info),
            StoreQuery::Hours => format_hours(&info),
            StoreQuery::Delivery => format_delivery(&info),
            StoreQuery::Announcement => format_announcements(&info),
            StoreQuery::Contact => format_contact(&info),
        };
        Ok(ToolResult::success(self.name(), text))
    }
}

fn format_status(info: &StoreInfo) -> String {
    let mut out = String::from("🏪 **苍穹外卖店铺状态**\n\n");
    if info.is_open {
        out.push_str("🟢 **当前状态：营业中**\n");
    } else {
        out.push_str("🔴 **当前状态：暂停营业**\n");
    }
    let _ = writeln!(out, "🕐 当前时间：{}", Local::now().format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "⏰ 营业时间：{}", info.business_hours);

    if info.is_open {
        out.push_str("\n✅ 当前可正常下单配送。\n");
        if let Some(close) = &info.close_time {
            let _ = writeln!(out, "⏰ 今日营业至：{close}");
        }
    } else {
        out.push_str("\n⚠️ 当前非营业时间，无法下单。\n");
        if let Some(next) = &info.next_open_time {
            let _ = writeln!(out, "📅 下次营业时间：{next}");
        }
    }
    let delivery = if info.delivery_available { "可配送" } else { "暂停配送" };
    let _ = writeln!(out, "🚚 配送状态：{delivery}");
    out
}

fn format_hours(info: &StoreInfo) -> String {
    let mut out = String::from("⏰ **营业时间信息**\n\n");
    let _ = writeln!(out, "🗓️ 正常营业时间：{}", info.business_hours);
    if !info.special_hours.is_empty() {
        out.push_str("\n📅 特殊营业安排：\n");
        for h in &info.special_hours {
            let _ = writeln!(out, "- {h}");
        }
    }
    out.push_str("\n💡 温馨提示：\n- 最后下单时间为营业结束前30分钟\n- 节假日营业时间可能有调整");
    out
}

fn format_delivery(info: &StoreInfo) -> String {
    let mut out = String::from("🚚 **配送服务信息**\n\n");
    let _ = writeln!(out, "📍 配送范围：{}", info.delivery_range);
    let _ = writeln!(out, "💰 配送费用：{}", info.delivery_fee);
    let _ = writeln!(out, "⏱️ 配送时间：{}", info.delivery_time);
    let _ = writeln!(out, "📦 起送金额：¥{:.2}", info.min_order_amount);
    if let Some(free) = info.free_delivery_amount.filter(|a| *a > 0.0) {
        let _ = writeln!(out, "🎁 免配送费：满¥{free:.2}免配送费");
    }
    out.push_str("\n💡 配送说明：\n- 恶劣天气可能影响配送时间\n- 如需紧急配送请联系客服");
    out
}

fn format_announcements(info: &StoreInfo) -> String {
    let mut out = String::from("📢 **店铺公告**\n\n");
    if info.announcements.is_empty() {
        out.push_str("暂无最新公告\n");
    }
    for (i, a) in info.announcements.iter().enumerate() {
        let _ = writeln!(out, "{}. {a}", i + 1);
    }
    out.push_str("\n🎉 优惠活动：\n");
    if info.promotions.is_empty() {
        out.push_str("暂无优惠活动\n");
    }
    for p in &info.promotions {
        let _ = writeln!(out, "- {p}");
    }
    out
}

fn format_contact(info: &StoreInfo) -> String {
    let mut out = String::from("📞 **联系方式**\n\n");
    let _ = writeln!(out, "🏪 店铺名称：{}", info.store_name);
    let _ = writeln!(out, "📍 店铺地址：{}", info.address);
    let _ = writeln!(out, "☎️ 联系电话：{}", info.phone);
    let _ = writeln!(out, "🤖 客服热线：{}", info.customer_service_phone);
    if let Some(email) = info.email.as_deref().filter(|e| !e.is_empty()) {
        let _ = writeln!(out, "📧 邮箱：{email}");
    }
    out.push_str("\n🕐 客服服务时间：9:00-21:00");
    out
}

/// 固定店铺信息（演示与测试用）
pub struct DemoStoreService {
    info: StoreInfo,
}

impl DemoStoreService {
    pub fn new(info: StoreInfo) -> Self {
        Self { info }
    }
}

impl Default for DemoStoreService {
    fn default() -> Self {
        Self::new(StoreInfo {
            store_name: "苍穹外卖（中关村店）".to_string(),
            is_open: true,
            business_hours: "10:00-22:00".to_string(),
            close_time: Some("22:00".to_string()),
            delivery_available: true,
            delivery_range: "店铺周边5公里".to_string(),
            delivery_fee: "2-8元根据距离计算".to_string(),
            delivery_time: "30-45分钟".to_string(),
            min_order_amount: 20.0,
            free_delivery_amount: Some(39.0),
            address: "北京市海淀区中关村软件园".to_string(),
            phone: "010-12345678".to_string(),
            customer_service_phone: "400-8888-888".to_string(),
            email: Some("service@skydelivery.com".to_string()),
            announcements: vec![
                "新用户首单立减10元！".to_string(),
                "周末全场满减活动进行中".to_string(),
            ],
            promotions: vec!["满39元免配送费".to_string(), "每周三会员日8.8折".to_string()],
            ..StoreInfo::default()
        })
    }
}

impl StoreStatusService for DemoStoreService {
    fn store_info(&self) -> Result<Option<StoreInfo>, AgentError> {
        Ok(Some(self.info.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> StoreStatusTool {
        StoreStatusTool::new(Arc::new(DemoStoreService::default()))
    }

    #[test]
    fn test_query_classification() {
        assert_eq!(StoreQuery::parse(""), StoreQuery::Status);
        assert_eq!(StoreQuery::parse("营业时间"), StoreQuery::Hours);
        assert_eq!(StoreQuery::parse("配送范围"), StoreQuery::Delivery);
        assert_eq!(StoreQuery::parse("最新活动"), StoreQuery::Announcement);
        assert_eq!(StoreQuery::parse("电话多少"), StoreQuery::Contact);
        assert_eq!(StoreQuery::parse("开了吗"), StoreQuery::Status);
    }

    #[test]
    fn test_default_status_view() {
        let r = tool().execute("").unwrap();
        let data = r.data().unwrap();
        assert!(data.contains("营业中"));
        assert!(data.contains("今日营业至：22:00"));
        assert!(data.contains("配送状态：可配送"));
    }

    #[test]
    fn test_closed_store() {
        let closed = DemoStoreService::new(StoreInfo {
            is_open: false,
            next_open_time: Some("明天 10:00".to_string()),
            ..StoreInfo::default()
        });
        let r = StoreStatusTool::new(Arc::new(closed)).execute("").unwrap();
        let data = r.data().unwrap();
        assert!(data.contains("暂停营业"));
        assert!(data.contains("下次营业时间：明天 10:00"));
    }

    #[test]
    fn test_delivery_and_contact_views() {
        let t = tool();
        let delivery = t.execute("配送").unwrap();
        assert!(delivery.data().unwrap().contains("满¥39.00免配送费"));
        let contact = t.execute("联系方式").unwrap();
        assert!(contact.data().unwrap().contains("400-8888-888"));
    }
}
