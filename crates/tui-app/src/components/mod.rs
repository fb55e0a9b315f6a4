//! UI 组件模块

pub mod chat_log;
pub mod input;

pub use chat_log::{ChatLine, ChatLogState};
pub use input::InputState;
