//! 聊天消息协议
//!
//! 定义节点间交换的消息类型和序列化格式。

use serde::{Deserialize, Serialize};

/// 聊天消息
///
/// 通过主题广播的唯一线上实体，JSON 编码，恰好三个字段，没有版本号。
/// `sender_id` 由发送方的房间在发布时写入，接收方仅用于展示；自环判断
/// 依据传输层报告的来源，消息体内的字段不可信。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// 消息正文，不限制长度
    pub body: String,

    /// 发送者 Peer ID 的字符串形式
    pub sender_id: String,

    /// 发送者昵称（用户自选，未经验证，允许重复）
    pub sender_nick: String,
}

impl ChatMessage {
    /// 创建新的聊天消息
    pub fn new(
        body: impl Into<String>,
        sender_id: impl Into<String>,
        sender_nick: impl Into<String>,
    ) -> Self {
        Self {
            body: body.into(),
            sender_id: sender_id.into(),
            sender_nick: sender_nick.into(),
        }
    }

    /// 序列化消息为字节数组
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 从字节数组反序列化消息
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let original = ChatMessage::new("hello", "12D3KooWpeer", "alice");

        let encoded = original.encode().unwrap();
        let decoded = ChatMessage::decode(&encoded).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn test_wire_field_names() {
        let msg = ChatMessage::new("hi", "peer", "nick");
        let value: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();

        assert_eq!(value.get("body").and_then(|v| v.as_str()), Some("hi"));
        assert_eq!(value.get("sender_id").and_then(|v| v.as_str()), Some("peer"));
        assert_eq!(value.get("sender_nick").and_then(|v| v.as_str()), Some("nick"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ChatMessage::decode(b"not json at all").is_err());
        assert!(ChatMessage::decode(b"").is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let data = br#"{"body": "hello"}"#;
        assert!(ChatMessage::decode(data).is_err());
    }

    #[test]
    fn test_decode_tolerates_unknown_fields() {
        let data = br#"{"body": "hi", "sender_id": "p", "sender_nick": "n", "extra": 42}"#;
        let msg = ChatMessage::decode(data).unwrap();
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.sender_nick, "n");
    }
}
