//! 订单查询工具：按订单号查询状态、菜品明细与配送进度

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::core::AgentError;
use crate::tools::{Tool, ToolResult};

pub const ORDER_QUERY_TOOL: &str = "orderQuery";

#[derive(Clone, Debug)]
pub struct OrderDish {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Clone, Debug)]
pub struct DeliveryInfo {
    pub driver_name: String,
    pub driver_phone: String,
    pub estimated_time: String,
}

#[derive(Clone, Debug)]
pub struct OrderInfo {
    pub order_number: String,
    /// 1 待付款 … 7 已退款
    pub status: u8,
    pub order_time: String,
    pub address: String,
    pub phone: String,
    pub amount: f64,
    pub dishes: Vec<OrderDish>,
    pub delivery: Option<DeliveryInfo>,
}

/// 订单数据来源
pub trait OrderQueryService: Send + Sync {
    fn query_order(&self, order_number: &str) -> Result<Option<OrderInfo>, AgentError>;
}

pub struct OrderQueryTool {
    service: Arc<dyn OrderQueryService>,
}

impl OrderQueryTool {
    pub fn new(service: Arc<dyn OrderQueryService>) -> Self {
        Self { service }
    }
}

impl Tool for OrderQueryTool {
    fn name(&self) -> &str {
        ORDER_QUERY_TOOL
    }

    fn description(&self) -> &str {
        "查询订单状态和详细信息"
    }

    fn parameter_help(&self) -> &str {
        "订单号（必须）- 要查询的订单编号，如：202501140001"
    }

    fn tool_type(&self) -> &str {
        "order"
    }

    /// 8-20 位字母或数字
    fn validate(&self, params: &str) -> bool {
        let n = params.trim();
        (8..=20).contains(&n.len()) && n.chars().all(|c| c.is_ascii_alphanumeric())
    }

    fn execute(&self, params: &str) -> Result<ToolResult, AgentError> {
        let order_number = params.trim();
        tracing::info!(order = %order_number, "Querying order");

        match self.service.query_order(order_number) {
            Ok(Some(order)) => Ok(ToolResult::success(self.name(), format_order(&order))),
            Ok(None) => Ok(ToolResult::failure(
                self.name(),
                format!("未找到订单号为 {order_number} 的订单，请检查订单号是否正确"),
            )),
            Err(e) => {
                tracing::error!(order = %order_number, error = %e, "Order query failed");
                Ok(ToolResult::failure(
                    self.name(),
                    "查询订单时发生错误，请稍后再试或联系客服",
                ))
            }
        }
    }
}

fn status_label(status: u8) -> &'static str {
    match status {
        1 => "待付款 💰",
        2 => "待接单 📝",
        3 => "已接单 ✅",
        4 => "派送中 🚚",
        5 => "已完成 ✨",
        6 => "已取消 ❌",
        7 => "已退款 💸",
        _ => "未知状态",
    }
}

fn status_advice(status: u8) -> &'static str {
    match status {
        1 => "💡 建议：请尽快完成支付，避免订单超时取消。",
        2 => "💡 建议：商家正在确认订单，请耐心等待。如超过10分钟未接单，可联系客服。",
        3 => "💡 建议：商家已开始制作，预计20-30分钟完成制作。",
        4 => "💡 建议：配送员正在路上，请保持电话畅通，注意查收。",
        5 => "💡 感谢您的使用，欢迎对订单进行评价！",
        6 => "💡 订单已取消，如有问题请联系客服。",
        7 => "💡 退款已处理，1-3个工作日内到账。",
        _ => "💡 如有疑问，请联系客服：400-8888-888",
    }
}

/// 11 位号码保留前三后四，其他长度只保留前三位；不足 7 位原样返回
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 7 {
        return phone.to_string();
    }
    let head: String = chars[..3].iter().collect();
    if chars.len() == 11 {
        let tail: String = chars[7..].iter().collect();
        format!("{head}****{tail}")
    } else {
        format!("{head}****")
    }
}

fn format_order(order: &OrderInfo) -> String {
    let mut out = String::from("📋 订单信息：\n");
    let _ = writeln!(out, "订单号：{}", order.order_number);
    let _ = writeln!(out, "订单状态：{}", status_label(order.status));
    let _ = writeln!(out, "下单时间：{}", order.order_time);
    let _ = writeln!(out, "配送地址：{}", order.address);
    let _ = writeln!(out, "联系电话：{}", mask_phone(&order.phone));
    let _ = writeln!(out, "订单金额：¥{:.2}", order.amount);

    if !order.dishes.is_empty() {
        out.push_str("\n🍽️ 菜品明细：\n");
        for d in &order.dishes {
            let _ = writeln!(out, "- {} x{}  ¥{:.2}", d.name, d.quantity, d.price);
        }
    }

    if let Some(delivery) = &order.delivery {
        out.push_str("\n🚚 配送信息：\n");
        let _ = writeln!(out, "配送员：{}", delivery.driver_name);
        let _ = writeln!(out, "联系电话：{}", mask_phone(&delivery.driver_phone));
        let _ = writeln!(out, "预计送达：{}", delivery.estimated_time);
    }

    out.push('\n');
    out.push_str(status_advice(order.status));
    out
}

/// 内存订单表（演示与测试用）
pub struct DemoOrderService {
    orders: HashMap<String, OrderInfo>,
}

impl DemoOrderService {
    pub fn new(orders: impl IntoIterator<Item = OrderInfo>) -> Self {
        Self {
            orders: orders
                .into_iter()
                .map(|o| (o.order_number.to_uppercase(), o))
                .collect(),
        }
    }
}

impl Default for DemoOrderService {
    fn default() -> Self {
        let dishes = vec![
            OrderDish {
                name: "宫保鸡丁".to_string(),
                quantity: 1,
                price: 28.0,
            },
            OrderDish {
                name: "蛋炒饭".to_string(),
                quantity: 1,
                price: 18.0,
            },
        ];
        Self::new([
            OrderInfo {
                order_number: "202501140001".to_string(),
                status: 4,
                order_time: "2025-01-14 12:30:15".to_string(),
                address: "北京市海淀区中关村软件园".to_string(),
                phone: "13812345678".to_string(),
                amount: 58.5,
                dishes: dishes.clone(),
                delivery: Some(DeliveryInfo {
                    driver_name: "张师傅".to_string(),
                    driver_phone: "13987651234".to_string(),
                    estimated_time: "13:15".to_string(),
                }),
            },
            OrderInfo {
                order_number: "202501140002".to_string(),
                status: 5,
                order_time: "2025-01-14 11:02:40".to_string(),
                address: "北京市海淀区上地十街".to_string(),
                phone: "13600001111".to_string(),
                amount: 46.0,
                dishes,
                delivery: None,
            },
        ])
    }
}

impl OrderQueryService for DemoOrderService {
    fn query_order(&self, order_number: &str) -> Result<Option<OrderInfo>, AgentError> {
        Ok(self.orders.get(&order_number.to_uppercase()).cloned())
    }
}
