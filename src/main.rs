//! 苍穹外卖 AI 客服 - 命令行入口
//!
//! 逐行读取标准输入交给客服前台处理；支持 /reset、/status、/stats、/quit。
//! `--config <path>` 指定额外的配置文件。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sky_agent::config::load_config;
use sky_agent::core::{build_tool_registry, AgentBuilder};
use sky_agent::observability;
use sky_agent::service::CustomerService;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const USER_ID: &str = "cli";

fn config_path_from_args() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().context("--config requires a path")?;
            return Ok(Some(PathBuf::from(path)));
        }
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(config_path_from_args()?).context("Failed to load config")?;
    let registry = build_tool_registry();
    let agent = AgentBuilder::new(cfg, registry.clone()).build();
    let service = CustomerService::new(Arc::new(agent), registry);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all("小苍已上线，输入问题开始咨询（/quit 退出）\n> ".as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let reply = match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" if service.reset_agent(USER_ID) => "已重置".to_string(),
            "/reset" => "当前有请求正在处理，暂不能重置".to_string(),
            "/status" => service.agent_status(),
            "/stats" => service.tool_stats(),
            "" => String::new(),
            input => service.handle_message(input, USER_ID).await,
        };
        if !reply.is_empty() {
            stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    tracing::info!("Bye");
    Ok(())
}
