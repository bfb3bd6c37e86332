pub mod dish_recommend;
pub mod faq;
pub mod order_query;
pub mod registry;
pub mod result;
pub mod store_status;

pub use dish_recommend::{DemoDishService, DishRecommendService, DishRecommendTool};
pub use faq::{DemoFaqService, FaqService, FaqTool};
pub use order_query::{DemoOrderService, OrderQueryService, OrderQueryTool};
pub use registry::{Tool, ToolRegistry};
pub use result::{ToolOutcome, ToolResult};
pub use store_status::{DemoStoreService, StoreStatusService, StoreStatusTool};
