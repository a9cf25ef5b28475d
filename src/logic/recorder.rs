use crate::{abi::logic_import::*, mute::history::ChatLine};
use tracing::trace;

/// 记下发言人和发言内容，供按名字找人和智能禁言参考上下文。
#[handler(group_only = true)]
pub async fn record_member(ctx: Context) -> Result<()> {
    let (Some(group_id), Some(user_id)) = (ctx.get_target().group_id(), ctx.sender.user_id) else {
        return Ok(());
    };
    let service = &ctx.service;

    service.directory.record(
        &service.config.bot.platform,
        user_id,
        ctx.sender.nickname.as_deref(),
        ctx.sender.card.as_deref(),
        Some(group_id),
    );

    let text = ctx.get_message_text().trim();
    if !text.is_empty() {
        service.log.record_line(
            group_id,
            ChatLine {
                user_id,
                name: ctx.sender.display_name(),
                text: text.to_string(),
                time: ctx.message.time(),
            },
        );
    }
    trace!("已记录群 {} 成员 {}", group_id, user_id);
    Ok(())
}
