use crate::abi::logic_import::*;
use tracing::{debug, info};

#[handler(group_only = true)]
pub async fn smart_mute(ctx: Context) -> Result<()> {
    let service = ctx.service.clone();
    if !service.config.components.enable_smart_mute {
        return Ok(());
    }
    // 命令交给命令 handler，避免关键词 mute 再触发一次
    if ctx.is_command("mute") || ctx.is_command("unmute") || ctx.is_command("help") {
        return Ok(());
    }

    let trigger = ctx.trigger();
    match service.action.handle(&ctx, &trigger).await? {
        Some(Ok(result)) => info!("{}", result),
        Some(Err(e)) => debug!("智能禁言未完成: {}", e),
        None => {}
    }
    Ok(())
}
