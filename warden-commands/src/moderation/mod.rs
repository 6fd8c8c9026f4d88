pub mod ban;
pub mod cases;
pub mod context_menu;
pub mod kick;
pub mod mute;
pub mod reason;
pub mod unban;
pub mod unmute;
pub mod warn;

pub mod actions;
pub mod dispatch;
pub(crate) mod embeds;
pub mod gateway;
pub mod guard;
pub mod logging;
pub mod sweep;
