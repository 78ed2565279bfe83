use anyhow::Result;
use mcq_auto_answer::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    mcq_auto_answer::logger::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
