//! Mock LLM 客户端（离线运行与测试用，无需 API）
//!
//! 依次弹出预置回复，用尽后返回 fallback；可配置每次调用的延迟与强制失败。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use parking_lot::Mutex;

use crate::llm::{LlmClient, LlmError, TextStream};
use crate::memory::Message;

const OFFLINE_REPLY: &str = "您好，我是小苍（离线模式），暂时无法连接大模型，如需帮助请联系人工客服：400-8888-888。";

/// 流式输出时每段字符数
const CHUNK_CHARS: usize = 6;

pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<Message>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: OFFLINE_REPLY.to_string(),
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序返回的回复
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.replies.lock() = replies.into_iter().map(Into::into).collect();
        self
    }

    /// 预置回复用尽后的固定回复
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每次调用都返回传输错误
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 最近一次调用收到的消息
    pub fn last_messages(&self) -> Vec<Message> {
        self.last_messages.lock().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock() = messages.to_vec();
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            return Err(LlmError::Request("mock transport failure".to_string()));
        }
        let next = self.replies.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<TextStream, LlmError> {
        let content = self.complete(messages).await?;
        let chars: Vec<char> = content.chars().collect();
        let chunks: Vec<Result<String, LlmError>> = chars
            .chunks(CHUNK_CHARS)
            .map(|c| Ok(c.iter().collect()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_replies_then_fallback() {
        let llm = MockLlmClient::new()
            .with_replies(["a", "b"])
            .with_fallback("z");
        let msgs = vec![Message::user("hi")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "a");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "b");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "z");
        assert_eq!(llm.calls(), 3);
        assert_eq!(llm.last_messages(), msgs);
    }

    #[tokio::test]
    async fn test_failing() {
        let llm = MockLlmClient::new().failing();
        let err = llm.complete(&[]).await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
    }

    #[tokio::test]
    async fn test_stream_chunks_concatenate() {
        let llm = MockLlmClient::new().with_replies(["营业时间是每天10:00至22:00"]);
        let mut stream = llm.complete_stream(&[Message::user("q")]).await.unwrap();
        let mut parts = Vec::new();
        while let Some(chunk) = stream.next().await {
            parts.push(chunk.unwrap());
        }
        assert!(parts.len() > 1);
        assert_eq!(parts.concat(), "营业时间是每天10:00至22:00");
    }
}
