//! 配置模块
//!
//! 进程级协议常量和节点配置。常量在所有互通实例间必须一致，
//! 由编译期共享保证，不在运行时协商。

use libp2p::Multiaddr;
use std::time::Duration;

/// 聊天主题前缀，房间名拼接在其后构成传输层主题名
pub const TOPIC_PREFIX: &str = "localchat/room/";

/// 服务标识（identify 协议版本），不一致的实例属于不同的发现分组
pub const PROTOCOL_VERSION: &str = "/localchat/1.0.0";

/// 代理版本前缀（昵称会附加在其后）
pub const AGENT_PREFIX: &str = "localchat-rust/";

/// 收件消息缓冲区容量
pub const MESSAGE_BUFFER_SIZE: usize = 100;

/// 节点配置
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// 监听地址列表
    pub listen_addresses: Vec<Multiaddr>,

    /// 服务标识（identify 协议版本）
    pub protocol_version: String,

    /// 本地昵称（会包含在 agent_version 中）
    pub nickname: Option<String>,

    /// 局域网重新通告间隔
    pub announce_interval: Duration,

    /// 空闲连接超时
    pub idle_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addresses: vec!["/ip4/0.0.0.0/tcp/0".parse().unwrap()],
            protocol_version: PROTOCOL_VERSION.to_string(),
            nickname: None,
            announce_interval: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl NodeConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置监听地址
    pub fn with_listen_addresses(mut self, addrs: Vec<Multiaddr>) -> Self {
        self.listen_addresses = addrs;
        self
    }

    /// 设置服务标识
    pub fn with_protocol_version(mut self, version: String) -> Self {
        self.protocol_version = version;
        self
    }

    /// 设置本地昵称
    pub fn with_nickname(mut self, nickname: String) -> Self {
        self.nickname = Some(nickname);
        self
    }

    /// 设置重新通告间隔
    pub fn with_announce_interval(mut self, interval: Duration) -> Self {
        self.announce_interval = interval;
        self
    }

    /// 设置空闲连接超时
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// 构建完整的 agent_version（包含昵称）
    pub fn build_agent_version(&self) -> String {
        match self.nickname {
            Some(ref nick) => format!("{}1.0.0 ({})", AGENT_PREFIX, nick),
            None => format!("{}1.0.0", AGENT_PREFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.protocol_version, PROTOCOL_VERSION);
        assert_eq!(config.announce_interval, Duration::from_secs(3600));
        assert_eq!(config.listen_addresses.len(), 1);
        assert!(config.nickname.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = NodeConfig::new()
            .with_protocol_version("/test/2.0.0".to_string())
            .with_nickname("小明".to_string())
            .with_announce_interval(Duration::from_secs(60))
            .with_idle_timeout(Duration::from_secs(10));

        assert_eq!(config.protocol_version, "/test/2.0.0");
        assert_eq!(config.nickname, Some("小明".to_string()));
        assert_eq!(config.announce_interval, Duration::from_secs(60));
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_build_agent_version_with_nickname() {
        let config = NodeConfig::new().with_nickname("小明".to_string());
        assert_eq!(config.build_agent_version(), "localchat-rust/1.0.0 (小明)");
    }

    #[test]
    fn test_build_agent_version_without_nickname() {
        let config = NodeConfig::new();
        assert_eq!(config.build_agent_version(), "localchat-rust/1.0.0");
    }
}
