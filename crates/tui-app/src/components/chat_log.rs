//! 消息视图组件
//!
//! 维护消息视图的显示行，区分本地消息、远端消息和系统提示。

/// 最大保留的消息行数
const MAX_LINES: usize = 1000;

/// 一条显示行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    /// 本地发出的消息
    SelfMessage { nick: String, body: String },

    /// 远端节点的消息
    Remote { nick: String, body: String },

    /// 系统提示（如发送失败）
    System(String),
}

/// 消息视图状态
#[derive(Debug, Default)]
pub struct ChatLogState {
    lines: Vec<ChatLine>,
}

impl ChatLogState {
    /// 创建空的消息视图
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条本地消息
    pub fn push_self(&mut self, nick: &str, body: &str) {
        self.push(ChatLine::SelfMessage {
            nick: nick.to_string(),
            body: body.to_string(),
        });
    }

    /// 追加一条远端消息
    pub fn push_remote(&mut self, nick: &str, body: &str) {
        self.push(ChatLine::Remote {
            nick: nick.to_string(),
            body: body.to_string(),
        });
    }

    /// 追加一条系统提示
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(ChatLine::System(text.into()));
    }

    fn push(&mut self, line: ChatLine) {
        self.lines.push(line);

        // 限制历史大小
        while self.lines.len() > MAX_LINES {
            self.lines.remove(0);
        }
    }

    /// 全部显示行
    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    /// 当前行数
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_kinds() {
        let mut log = ChatLogState::new();
        log.push_self("alice", "hi");
        log.push_remote("bob", "hello");
        log.push_system("消息发送失败: 无连接");

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.lines()[0],
            ChatLine::SelfMessage {
                nick: "alice".to_string(),
                body: "hi".to_string()
            }
        );
        assert!(matches!(log.lines()[2], ChatLine::System(_)));
    }

    #[test]
    fn test_history_is_capped() {
        let mut log = ChatLogState::new();
        for i in 0..(MAX_LINES + 100) {
            log.push_remote("bob", &format!("line {}", i));
        }

        assert_eq!(log.len(), MAX_LINES);
        // 最早的行被淘汰
        assert_eq!(
            log.lines()[0],
            ChatLine::Remote {
                nick: "bob".to_string(),
                body: "line 100".to_string()
            }
        );
    }
}
