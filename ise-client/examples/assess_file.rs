//! 文件评测示例
//!
//! 读取一段录音（16kHz 单声道 16 位 PCM 或 WAV），提交评测并打印分数
//!
//! 运行:
//!   export ISE_APP_ID=... ISE_API_KEY=... ISE_API_SECRET=...
//!   cargo run --example assess_file -- speech.wav "今天天气怎么样" [read_sentence]

use anyhow::Context;
use ise_client::assessment::IseClient;
use ise_client::config::ConfigManager;
use ise_client::pipeline::FileAudioSource;
use ise_client::utils::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    println!("=== 发音评测 ===\n");

    let mut args = std::env::args().skip(1);
    let usage = "用法: assess_file <音频文件> <参考文本> [题型]";
    let path = args.next().context(usage)?;
    let text = args.next().context(usage)?;
    let category = args.next();

    let config = ConfigManager::load_with_env("config.json")?;
    let mut client = IseClient::from_config(&config)
        .context("请设置 ISE_APP_ID / ISE_API_KEY / ISE_API_SECRET 环境变量")?;

    if let Some(name) = category {
        client.set_category_str(&name)?;
    }

    println!("语种: {}  题型: {}", client.language(), client.category());
    println!("参考文本: {}", text);

    let audio = FileAudioSource::new(&path).read().await?;
    println!("音频: {} 字节\n", audio.len());

    let outcome = client
        .assess(&text, audio, None, config.assessment.timeout())
        .await;

    let history: Vec<&str> = outcome.history.iter().map(|s| s.name()).collect();
    println!("状态: {}", history.join(" -> "));
    println!("收到 {} 个结果帧，发送 {} 帧", outcome.frames.len(), outcome.frames_sent);

    let report = client.extract_scores(outcome.raw());
    println!("\n{}", report);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(err) = outcome.error() {
        println!("\n评测失败: {}", err);
    }

    Ok(())
}
