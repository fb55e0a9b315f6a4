//! 事件处理模块
//!
//! 把键盘输入、收件消息和定时刷新聚合到单一事件通道，主循环
//! 只需等待一个通道。

use chatroom::ChatMessage;
use crossterm::event::KeyEventKind;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

/// 应用事件
#[derive(Debug, Clone)]
pub enum Event {
    /// 键盘输入事件
    Input(crossterm::event::KeyEvent),

    /// 收到聊天消息
    Message(ChatMessage),

    /// 定时刷新事件
    Tick,

    /// 消息流已关闭
    Closed,
}

/// 键盘输入监听任务
pub async fn run_keyboard_listener(tx: mpsc::Sender<Event>) {
    let mut reader = crossterm::event::EventStream::new();

    while let Some(event) = reader.next().await {
        match event {
            Ok(crossterm::event::Event::Key(key_event)) => {
                // 只处理按键按下事件，忽略重复和释放事件
                if key_event.kind == KeyEventKind::Press
                    && tx.send(Event::Input(key_event)).await.is_err()
                {
                    break;
                }
            }
            Ok(_) => {
                // 忽略其他事件（如鼠标、调整大小等）
            }
            Err(err) => {
                tracing::error!("键盘事件错误: {:?}", err);
                break;
            }
        }
    }
}

/// 定时器任务
pub async fn run_ticker(tx: mpsc::Sender<Event>, tick_rate: Duration) {
    let mut interval = tokio::time::interval(tick_rate);

    loop {
        interval.tick().await;
        if tx.send(Event::Tick).await.is_err() {
            break;
        }
    }
}

/// 应用错误类型
#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Channel(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "IO 错误: {}", err),
            AppError::Channel(err) => write!(f, "通道错误: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<mpsc::error::SendError<Event>> for AppError {
    fn from(err: mpsc::error::SendError<Event>) -> Self {
        AppError::Channel(err.to_string())
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
