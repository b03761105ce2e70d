//! Jarvis 命令行入口
//!
//! 初始化日志、加载配置、创建助手，然后逐行读取 stdin 作为用户消息。
//! 输入 exit / quit、EOF 或 end_chat 触发时退出。

use std::path::PathBuf;

use anyhow::Context;
use jarvis::config::load_config;
use jarvis::core::create_assistant;
use jarvis::observability::init_tracing;
use jarvis::prompts::GREET;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let session_id = cfg.app.session_id.clone();
    let assistant = create_assistant(&cfg).context("Failed to create assistant")?;

    println!("{}", GREET);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"User: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = assistant.reply_or_apologize(&session_id, input).await;
        println!("{}: {}", cfg.app.name, reply.text);
        if reply.ended {
            break;
        }
    }
    Ok(())
}
