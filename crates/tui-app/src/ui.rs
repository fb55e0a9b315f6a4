//! UI 渲染模块
//!
//! 负责整个聊天界面的布局和绘制。

use crate::components::ChatLine;
use crate::ChatApp;
use chatroom::PeerId;
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

/// 在线节点侧栏宽度
const PEER_PANEL_WIDTH: u16 = 26;

/// 绘制 UI
pub fn draw_ui(f: &mut Frame, app: &ChatApp) {
    let size = f.area();

    // 主布局：消息区 + 输入行
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(size);

    // 消息区：水平分割为消息视图和在线节点侧栏
    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(PEER_PANEL_WIDTH)])
        .split(main_chunks[0]);

    draw_messages(f, body_chunks[0], app);
    draw_peers(f, body_chunks[1], app);
    draw_input(f, main_chunks[1], app);
}

/// 绘制消息视图
fn draw_messages(f: &mut Frame, area: Rect, app: &ChatApp) {
    let lines: Vec<Line> = app.chat_log().lines().iter().map(render_line).collect();

    // 只保留末尾能显示的行
    let height = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(height);
    let visible = lines[start..].to_vec();

    let messages = Paragraph::new(visible).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("聊天室: {}", app.room_name())),
    );

    f.render_widget(messages, area);
}

fn render_line(line: &ChatLine) -> Line<'static> {
    match line {
        ChatLine::SelfMessage { nick, body } => Line::from(vec![
            Span::styled(
                format!("<{}> ", nick),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(body.clone()),
        ]),
        ChatLine::Remote { nick, body } => Line::from(vec![
            Span::styled(format!("<{}> ", nick), Style::default().fg(Color::Green)),
            Span::raw(body.clone()),
        ]),
        ChatLine::System(text) => Line::from(Span::styled(
            text.clone(),
            Style::default().fg(Color::Red),
        )),
    }
}

/// 绘制在线节点侧栏
fn draw_peers(f: &mut Frame, area: Rect, app: &ChatApp) {
    let items: Vec<ListItem> = app
        .peers()
        .iter()
        .map(|peer_id| ListItem::new(short_peer_id(peer_id)))
        .collect();

    let peers = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("在线节点 ({})", app.peers().len())),
    );

    f.render_widget(peers, area);
}

/// 绘制输入行
fn draw_input(f: &mut Frame, area: Rect, app: &ChatApp) {
    let prompt = format!("<{}> 说: ", app.nick());
    let text = Line::from(vec![
        Span::styled(prompt.clone(), Style::default().fg(Color::Yellow)),
        Span::raw(app.input().buffer().to_string()),
    ]);

    let input = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Enter 发送 · /quit 退出"),
    );
    f.render_widget(input, area);

    // 光标定位到输入位置
    let cursor_x = area.x + 1 + (prompt.chars().count() + app.input().cursor()) as u16;
    let max_x = area.x + area.width.saturating_sub(2);
    f.set_cursor_position(Position::new(cursor_x.min(max_x), area.y + 1));
}

/// 截断显示 Peer ID
fn short_peer_id(peer_id: &PeerId) -> String {
    let s = peer_id.to_string();
    match s.char_indices().nth(12) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_peer_id_truncates() {
        let peer_id = PeerId::random();
        let short = short_peer_id(&peer_id);
        assert!(short.chars().count() <= 13);
        assert!(short.ends_with('…'));
    }
}
