#[macro_use]
mod helper;
mod mute;
mod recorder;
mod smart_mute;

use crate::abi::logic_import::*;

pub trait BuildHelp {
    const HELP_MSG: &'static str;
}

register_handler_with_help!(
    command = [mute::MuteHandler, mute::UnmuteHandler],
    other = [recorder::RecordMemberHandler, smart_mute::SmartMuteHandler]
);
