//! 默认配置、提示词模板与用户可见文案

/// 默认最大执行步数
pub const DEFAULT_MAX_STEPS: usize = 10;
/// 默认整次 run 超时：5 分钟
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
/// 流式通道默认超时：5 分钟
pub const DEFAULT_STREAM_TIMEOUT_MS: u64 = 300_000;

pub const DEFAULT_AGENT_NAME: &str = "苍穹外卖AI客服小苍";

pub const CUSTOMER_SERVICE_SYSTEM_PROMPT: &str = "\
你是苍穹外卖的专业AI客服助手，名字叫\"小苍\"。你的职责是：

1. 友好、专业地回答用户关于外卖、菜品、订单等相关问题
2. 根据用户需求提供准确的信息和建议
3. 在需要时主动调用工具获取实时数据
4. 保持礼貌、耐心的服务态度
5. 如果遇到无法解决的问题，及时转接人工客服

可用工具包括：
- 订单查询：根据订单号查询订单状态和详情
- 菜品推荐：根据用户喜好推荐合适的菜品
- 营业查询：查询店铺营业时间和状态
- 常见问题：快速解答常见问题

请始终以用户体验为中心，提供高质量的客服服务。";

pub const REACT_NEXT_STEP_PROMPT: &str = "\
基于当前对话历史和用户需求，请按照以下格式进行思考和行动：

思考: [分析用户的需求，判断需要采取什么行动]
行动: [如果需要调用工具，说明调用哪个工具；如果可以直接回复，提供回复内容]

请确保你的思考过程清晰，行动选择合理。";

pub const TOOL_RESULT_PREFIX: &str = "工具结果: ";
pub const THINKING_PREFIX: &str = "思考: ";
pub const ACTION_PREFIX: &str = "行动: ";

pub const ERROR_MAX_STEPS_EXCEEDED: &str = "对不起，当前任务步骤过多，请简化您的需求或稍后再试。";
pub const ERROR_TIMEOUT: &str = "对不起，处理您的请求超时了，请稍后再试。";
pub const ERROR_TOOL_CALL_FAILED: &str = "对不起，获取信息时出现问题，请稍后再试或联系人工客服。";
pub const ERROR_GENERAL: &str = "对不起，处理您的请求时出现了问题，请稍后再试。";
/// 模型返回空内容时的直接回复
pub const ERROR_NOT_UNDERSTOOD: &str = "抱歉，我现在无法理解您的问题，请稍后再试。";
/// 前台服务层兜底文案
pub const ERROR_SERVICE_UNAVAILABLE: &str =
    "抱歉，我现在遇到了一些技术问题，请稍后再试或联系人工客服：400-8888-888";

pub const SUCCESS_TASK_COMPLETED: &str = "任务已完成";
