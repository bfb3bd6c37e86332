//! 记忆层：单次 run 的对话历史与检索用分词

pub mod conversation;
pub mod tokenizer;

pub use conversation::{Message, MessageHistory, Role};
