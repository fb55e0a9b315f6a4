//! 输入框组件
//!
//! 单行输入缓冲区，光标按字符计数，正确处理多字节字符。

/// 输入框状态
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    /// 光标位置（字符计）
    cursor: usize,
}

impl InputState {
    /// 创建空的输入框
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理输入字符
    pub fn handle_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.buffer.insert(idx, c);
        self.cursor += 1;
    }

    /// 处理退格键
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index();
            self.buffer.remove(idx);
        }
    }

    /// 光标左移
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// 光标右移
    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.chars().count() {
            self.cursor += 1;
        }
    }

    /// 光标移到行首
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// 光标移到行尾
    pub fn move_end(&mut self) {
        self.cursor = self.buffer.chars().count();
    }

    /// 取出当前内容并清空输入框
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }

    /// 当前内容
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// 当前光标位置（字符计）
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 光标对应的字节偏移
    fn byte_index(&self) -> usize {
        self.buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len())
    }
}
