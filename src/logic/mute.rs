use crate::abi::logic_import::*;
use std::fmt;
use tracing::{debug, info};

#[handler(command = "mute",
help_msg = r#"用法:/mute <用户> [时长] [理由]
<用户>:QQ号、昵称或@某人
[时长]:秒，默认 10 分钟，0 表示解除禁言
功能:禁言群成员"#)]
pub async fn mute(ctx: Context) -> Result<()> {
    run_command(&ctx).await
}

#[handler(command = "unmute",
help_msg = r#"用法:/unmute <用户>
功能:解除群成员的禁言"#)]
pub async fn unmute(ctx: Context) -> Result<()> {
    run_command(&ctx).await
}

async fn run_command<T>(ctx: &Context<T>) -> Result<()>
where
    T: BotClient + BotHandler + fmt::Debug + 'static,
{
    if !ctx.service.config.components.enable_mute_command {
        debug!("禁言命令未启用");
        return Ok(());
    }

    let trigger = ctx.trigger();
    match ctx.service.command.handle(ctx, &trigger).await {
        Ok(result) => info!("{}", result),
        Err(e) => debug!("禁言命令未完成: {}", e),
    }
    Ok(())
}
