//! 局域网聊天室核心模块
//!
//! 基于 libp2p gossipsub 的主题发布/订阅聊天，mDNS 负责局域网内的节点发现。

use thiserror::Error;

pub mod config;
pub mod identity;
pub mod message;
pub mod node;
pub mod room;

pub use config::{NodeConfig, MESSAGE_BUFFER_SIZE, PROTOCOL_VERSION, TOPIC_PREFIX};
pub use identity::IdentityError;
pub use message::ChatMessage;
pub use node::{ChatNode, Delivery, NodeHandle};
pub use room::{topic_name, PublishError, Room};

pub use libp2p::PeerId;

/// 节点服务相关错误
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("Swarm 构建失败: {0}")]
    SwarmBuild(String),

    #[error("主题已加入: {0}")]
    TopicJoined(String),

    #[error("主题未加入: {0}")]
    TopicNotJoined(String),

    #[error("订阅主题失败: {0}")]
    Subscribe(String),

    #[error("发布消息失败: {0}")]
    Publish(String),

    #[error("节点服务已停止")]
    Stopped,
}

/// 节点服务结果类型
pub type Result<T> = std::result::Result<T, NodeError>;
