//! 应用主逻辑
//!
//! 管理聊天界面状态和主事件循环。

use crate::components::{ChatLogState, InputState};
use crate::event::{self, AppError, AppResult, Event};
use chatroom::{PeerId, Room};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::time::Duration;
use tokio::sync::mpsc;

/// 事件通道容量
const EVENT_BUFFER_SIZE: usize = 100;

/// 在线节点列表刷新间隔
const PEER_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// 本地退出命令
const QUIT_COMMAND: &str = "/quit";

/// 一行输入的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineAction {
    /// 空行，忽略
    Ignore,

    /// 本地退出命令，不发送任何内容
    Quit,

    /// 作为消息发布
    Publish(String),
}

fn parse_line(line: &str) -> LineAction {
    if line.is_empty() {
        LineAction::Ignore
    } else if line == QUIT_COMMAND {
        LineAction::Quit
    } else {
        LineAction::Publish(line.to_string())
    }
}

/// 聊天应用
pub struct ChatApp {
    room: Room,
    chat_log: ChatLogState,
    input: InputState,
    peers: Vec<PeerId>,
    running: bool,
}

impl ChatApp {
    /// 创建新的聊天应用
    pub fn new(room: Room) -> Self {
        Self {
            room,
            chat_log: ChatLogState::new(),
            input: InputState::new(),
            peers: Vec::new(),
            running: true,
        }
    }

    /// 运行应用
    pub async fn run(&mut self) -> AppResult<()> {
        let mut messages = self
            .room
            .take_messages()
            .ok_or_else(|| AppError::Channel("消息流已被取出".to_string()))?;

        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);

        // 收件消息转发任务；流关闭时通知主循环退出
        let message_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                if message_tx.send(Event::Message(message)).await.is_err() {
                    return;
                }
            }
            let _ = message_tx.send(Event::Closed).await;
        });

        // 键盘监听任务
        tokio::spawn(event::run_keyboard_listener(event_tx.clone()));

        // 在线节点刷新定时器
        tokio::spawn(event::run_ticker(event_tx.clone(), PEER_REFRESH_INTERVAL));

        // 主事件循环：单点等待，事件驱动重绘
        while self.running {
            terminal.draw(|f| crate::ui::draw_ui(f, self))?;

            match event_rx.recv().await {
                Some(Event::Input(key_event)) => self.handle_key_event(key_event).await,
                Some(Event::Message(message)) => {
                    self.chat_log
                        .push_remote(&message.sender_nick, &message.body);
                }
                Some(Event::Tick) => self.refresh_peers().await,
                Some(Event::Closed) => {
                    self.running = false;
                }
                None => break,
            }
        }

        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;

        Ok(())
    }

    /// 处理键盘事件
    async fn handle_key_event(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }
            KeyCode::Enter => self.submit_line().await,
            KeyCode::Backspace => self.input.handle_backspace(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Char(c) => self.input.handle_char(c),
            _ => {}
        }
    }

    /// 提交当前输入行
    async fn submit_line(&mut self) {
        let line = self.input.take();
        match parse_line(&line) {
            LineAction::Ignore => {}
            LineAction::Quit => {
                self.running = false;
            }
            LineAction::Publish(text) => {
                // 发布失败在消息视图内联提示，会话继续
                match self.room.publish(&text).await {
                    Ok(()) => {
                        let nick = self.room.nick().to_string();
                        self.chat_log.push_self(&nick, &text);
                    }
                    Err(e) => self.chat_log.push_system(format!("消息发送失败: {}", e)),
                }
            }
        }
    }

    /// 刷新在线节点列表
    async fn refresh_peers(&mut self) {
        match self.room.list_peers().await {
            Ok(peers) => self.peers = peers,
            Err(e) => tracing::debug!("获取在线节点失败: {}", e),
        }
    }

    /// 房间名
    pub fn room_name(&self) -> &str {
        self.room.room_name()
    }

    /// 本地昵称
    pub fn nick(&self) -> &str {
        self.room.nick()
    }

    /// 消息视图状态
    pub fn chat_log(&self) -> &ChatLogState {
        &self.chat_log
    }

    /// 输入框状态
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// 当前在线节点
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }
}

/// 运行聊天界面的便捷函数
pub async fn run_chat(room: Room) -> AppResult<()> {
    let mut app = ChatApp::new(room);
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_empty_is_ignored() {
        assert_eq!(parse_line(""), LineAction::Ignore);
    }

    #[test]
    fn test_parse_line_quit_command() {
        assert_eq!(parse_line("/quit"), LineAction::Quit);
        // 带空格的不算命令，照常发送
        assert_eq!(
            parse_line(" /quit"),
            LineAction::Publish(" /quit".to_string())
        );
    }

    #[test]
    fn test_parse_line_text_is_published() {
        assert_eq!(
            parse_line("hello world"),
            LineAction::Publish("hello world".to_string())
        );
    }
}
