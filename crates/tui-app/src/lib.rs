//! 终端用户界面模块
//!
//! 基于 Ratatui 的聊天界面：消息视图、在线节点侧栏和输入行。

pub mod app;
pub mod components;
pub mod event;
pub mod ui;

pub use app::{run_chat, ChatApp};
pub use event::{AppError, AppResult, Event};
