use anyhow::Result;
use std::{path::Path, sync::Arc};
use tracing::{debug, error, info, trace, warn};

const CONFIG_PATH: &str = "config.toml";
const LOG_PATH: &str = "logs";

mod abi;
mod config;
mod llm;
mod logger;
mod logic;
mod mute;

#[tokio::main]
async fn main() -> Result<()> {
    if !Path::new(LOG_PATH).is_dir() {
        std::fs::create_dir(LOG_PATH)?;
        println!("不存在日志目录，已创建: {LOG_PATH}",);
    }

    let config_exists = Path::new(CONFIG_PATH).is_file();
    let mut config = if config_exists {
        config::load_config(CONFIG_PATH).await?
    } else {
        config::Config::default()
    };

    let _guard = logger::init_logger(LOG_PATH, &config.logging);

    if !config_exists {
        config::save_config(CONFIG_PATH, &config).await?;
        warn!("不存在配置文件，已创建默认配置: {CONFIG_PATH}");
        trace!(?config);
        return Ok(());
    }

    info!("配置文件加载成功: {CONFIG_PATH}");
    config.sanitize();
    debug!(?config);

    let config = Arc::new(config);
    let service = Arc::new(mute::MuteService::new(config.clone())?);

    if let Err(e) = abi::run(config, service).await {
        error!("运行出错: {:?}", e);
        return Err(e);
    }

    Ok(())
}
