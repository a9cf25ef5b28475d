/// 注册所有 handler，并根据命令类 handler 的 `HELP_MSG` 生成 `/help`。
#[macro_export]
macro_rules! register_handler_with_help {
    (
        $(command = [ $($cmd_handlers:path),* $(,)? ])?
        $(,)?
        $(other = [ $($other_handlers:path),* $(,)? ])?
    ) => {
        use $crate::abi::{logic_import::*, message::from_str};

        register_handlers!(
            $($($cmd_handlers,)*)?
            $($($other_handlers,)*)?
            HelpHandler
        );

        #[handler(
            command = "help",
            help_msg = "用法:/help\n功能:显示帮助信息"
        )]
        pub async fn help(ctx: Context) -> Result<()> {
            const ALL_HELP: &'static str = const_format::concatcp!(
                HelpHandler::HELP_MSG, "\n",
                $( $( <$cmd_handlers as BuildHelp>::HELP_MSG, "\n", )* )?
            );

            ctx.send_message_async(from_str(ALL_HELP.trim_end()));
            Ok(())
        }
    };
}
