//! 节点服务模块
//!
//! 将 gossipsub、mDNS 和 identify 组合为一个 Swarm，由单个后台任务
//! 驱动，外部通过命令通道与之交互。
//!
//! ## 组合 Behaviour 说明
//!
//! 使用 `#[derive(NetworkBehaviour)]` 宏组合多个 behaviour：
//! - `gossipsub`: 主题发布/订阅，消息签名后广播
//! - `mdns`: 局域网内节点发现，发现即拨号
//! - `identify`: 交换服务标识，用于识别不兼容的实例

use crate::config::{NodeConfig, MESSAGE_BUFFER_SIZE};
use crate::{NodeError, Result};
use futures::StreamExt;
use libp2p::{
    gossipsub,
    gossipsub::{IdentTopic, TopicHash},
    identify,
    identity::Keypair,
    mdns,
    swarm::SwarmEvent,
    PeerId, Swarm, SwarmBuilder,
};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot, watch};

/// 命令通道容量
const COMMAND_BUFFER_SIZE: usize = 32;

/// 订阅收到的一次原始投递
///
/// `source` 是传输层报告的消息来源，自环过滤只依据该字段。
#[derive(Debug, Clone)]
pub struct Delivery {
    /// 消息来源节点
    pub source: PeerId,

    /// 原始负载
    pub data: Vec<u8>,
}

/// 组合的 Behaviour，包含 gossipsub、mDNS 和 identify
#[derive(libp2p::swarm::NetworkBehaviour)]
struct NodeBehaviour {
    gossipsub: gossipsub::Behaviour,
    mdns: mdns::tokio::Behaviour,
    identify: identify::Behaviour,
}

/// 节点服务命令
enum Command {
    JoinTopic {
        topic: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Subscribe {
        topic: String,
        reply: oneshot::Sender<Result<mpsc::Receiver<Delivery>>>,
    },
    LeaveTopic {
        topic: String,
    },
    Publish {
        topic: String,
        data: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    ListPeers {
        topic: String,
        reply: oneshot::Sender<Vec<PeerId>>,
    },
}

/// 节点服务句柄
///
/// 可克隆，可在多个房间之间共享（每个房间使用自己的主题）。
/// 服务停止后所有调用返回 [`NodeError::Stopped`]。
#[derive(Clone)]
pub struct NodeHandle {
    cmd_tx: mpsc::Sender<Command>,
    local_peer_id: PeerId,
}

impl NodeHandle {
    /// 获取本地 Peer ID
    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// 加入主题（仅绑定，不建立订阅）
    pub async fn join_topic(&self, topic: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::JoinTopic {
                topic: topic.to_string(),
                reply,
            })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// 订阅已加入的主题，返回投递接收端
    pub async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Delivery>> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe {
                topic: topic.to_string(),
                reply,
            })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// 离开主题，释放绑定和订阅
    pub async fn leave_topic(&self, topic: &str) {
        let _ = self
            .cmd_tx
            .send(Command::LeaveTopic {
                topic: topic.to_string(),
            })
            .await;
    }

    /// 向主题发布一条消息
    pub async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Publish {
                topic: topic.to_string(),
                data,
                reply,
            })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)?
    }

    /// 列出主题当前已知的对等节点
    pub async fn list_peers(&self, topic: &str) -> Result<Vec<PeerId>> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ListPeers {
                topic: topic.to_string(),
                reply,
            })
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)
    }
}

/// 聊天节点服务
///
/// 独占 Swarm，处理节点发现、订阅投递与外部命令。生命周期由
/// 关闭信号支配；退出时丢弃全部订阅发送端，各房间的读循环随之终止。
pub struct ChatNode {
    swarm: Swarm<NodeBehaviour>,
    cmd_rx: mpsc::Receiver<Command>,

    /// 已加入的主题（名称 -> 主题哈希）
    joined: HashMap<String, TopicHash>,

    /// 活跃订阅（主题哈希 -> 投递发送端）
    subscriptions: HashMap<TopicHash, mpsc::Sender<Delivery>>,

    /// 期望的服务标识，用于校验 identify 信息
    protocol_version: String,
}

impl ChatNode {
    /// 创建节点服务，返回服务本体和命令句柄
    pub fn new(keypair: Keypair, config: NodeConfig) -> Result<(Self, NodeHandle)> {
        let protocol_version = config.protocol_version.clone();
        let agent_version = config.build_agent_version();
        let announce_interval = config.announce_interval;

        let mut swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                libp2p::tcp::Config::default(),
                libp2p::noise::Config::new,
                libp2p::yamux::Config::default,
            )
            .map_err(|e| NodeError::SwarmBuild(e.to_string()))?
            .with_behaviour(|key| {
                let gossipsub_config = gossipsub::ConfigBuilder::default()
                    .validation_mode(gossipsub::ValidationMode::Strict)
                    .build()
                    .map_err(std::io::Error::other)?;

                let gossipsub = gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(key.clone()),
                    gossipsub_config,
                )?;

                let mdns_config = mdns::Config {
                    ttl: announce_interval,
                    query_interval: announce_interval,
                    ..mdns::Config::default()
                };
                let mdns = mdns::tokio::Behaviour::new(mdns_config, key.public().to_peer_id())?;

                let identify = identify::Behaviour::new(
                    identify::Config::new(protocol_version.clone(), key.public())
                        .with_agent_version(agent_version.clone())
                        .with_interval(announce_interval),
                );

                Ok(NodeBehaviour {
                    gossipsub,
                    mdns,
                    identify,
                })
            })
            .map_err(|e| NodeError::SwarmBuild(e.to_string()))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(config.idle_timeout))
            .build();

        for addr in config.listen_addresses {
            swarm
                .listen_on(addr)
                .map_err(|e| NodeError::SwarmBuild(e.to_string()))?;
        }

        let local_peer_id = *swarm.local_peer_id();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);

        let node = Self {
            swarm,
            cmd_rx,
            joined: HashMap::new(),
            subscriptions: HashMap::new(),
            protocol_version,
        };

        Ok((
            node,
            NodeHandle {
                cmd_tx,
                local_peer_id,
            },
        ))
    }

    /// 获取本地 Peer ID
    pub fn local_peer_id(&self) -> PeerId {
        *self.swarm.local_peer_id()
    }

    /// 运行节点服务
    ///
    /// 持续处理 Swarm 事件与外部命令，直到关闭信号触发或所有句柄
    /// 被丢弃。
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("收到关闭信号，节点服务退出");
                    break;
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        None => {
                            tracing::info!("所有句柄已释放，节点服务退出");
                            break;
                        }
                    }
                }
                event = self.swarm.select_next_some() => {
                    self.handle_swarm_event(event);
                }
            }
        }
    }

    /// 处理外部命令
    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::JoinTopic { topic, reply } => {
                let result = if self.joined.contains_key(&topic) {
                    Err(NodeError::TopicJoined(topic.clone()))
                } else {
                    let hash = IdentTopic::new(topic.clone()).hash();
                    self.joined.insert(topic.clone(), hash);
                    tracing::debug!("已加入主题: {}", topic);
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::Subscribe { topic, reply } => {
                let _ = reply.send(self.subscribe_topic(&topic));
            }
            Command::LeaveTopic { topic } => {
                if let Some(hash) = self.joined.remove(&topic) {
                    self.subscriptions.remove(&hash);
                    let _ = self
                        .swarm
                        .behaviour_mut()
                        .gossipsub
                        .unsubscribe(&IdentTopic::new(topic.clone()));
                    tracing::debug!("已离开主题: {}", topic);
                }
            }
            Command::Publish { topic, data, reply } => {
                let result = match self.joined.get(&topic) {
                    Some(hash) => self
                        .swarm
                        .behaviour_mut()
                        .gossipsub
                        .publish(hash.clone(), data)
                        .map(|_| ())
                        .map_err(|e| NodeError::Publish(e.to_string())),
                    None => Err(NodeError::TopicNotJoined(topic.clone())),
                };
                let _ = reply.send(result);
            }
            Command::ListPeers { topic, reply } => {
                let peers = match self.joined.get(&topic) {
                    Some(hash) => self
                        .swarm
                        .behaviour()
                        .gossipsub
                        .all_peers()
                        .filter(|(_, topics)| topics.contains(&hash))
                        .map(|(peer_id, _)| *peer_id)
                        .collect(),
                    None => Vec::new(),
                };
                let _ = reply.send(peers);
            }
        }
    }

    /// 订阅主题并建立投递通道
    fn subscribe_topic(&mut self, topic: &str) -> Result<mpsc::Receiver<Delivery>> {
        let hash = match self.joined.get(topic) {
            Some(hash) => hash.clone(),
            None => return Err(NodeError::TopicNotJoined(topic.to_string())),
        };

        if self.subscriptions.contains_key(&hash) {
            return Err(NodeError::Subscribe(format!("主题已有订阅: {}", topic)));
        }

        self.swarm
            .behaviour_mut()
            .gossipsub
            .subscribe(&IdentTopic::new(topic.to_string()))
            .map_err(|e| NodeError::Subscribe(e.to_string()))?;

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER_SIZE);
        self.subscriptions.insert(hash, tx);
        tracing::debug!("已订阅主题: {}", topic);
        Ok(rx)
    }

    /// 处理 Swarm 事件
    fn handle_swarm_event(&mut self, event: SwarmEvent<NodeBehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(NodeBehaviourEvent::Mdns(mdns::Event::Discovered(list))) => {
                for (peer_id, addr) in list {
                    tracing::info!("通过 mDNS 发现节点: {} at {}", peer_id, addr);
                    // 拨号失败只记录，发现流程继续
                    if let Err(e) = self.swarm.dial(addr) {
                        tracing::debug!("连接节点 {} 失败: {}", peer_id, e);
                    }
                }
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Mdns(mdns::Event::Expired(list))) => {
                for (peer_id, _addr) in list {
                    tracing::debug!("节点 mDNS 记录过期: {}", peer_id);
                }
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Identify(identify::Event::Received {
                peer_id,
                info,
                ..
            })) => {
                if info.protocol_version == self.protocol_version {
                    tracing::debug!("节点 {} 服务标识一致: {}", peer_id, info.agent_version);
                } else {
                    tracing::warn!(
                        "节点 {} 服务标识不一致: 期望 {}, 收到 {}",
                        peer_id,
                        self.protocol_version,
                        info.protocol_version
                    );
                }
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Identify(_)) => {}
            SwarmEvent::Behaviour(NodeBehaviourEvent::Gossipsub(gossipsub::Event::Message {
                propagation_source,
                message,
                ..
            })) => {
                self.dispatch_delivery(propagation_source, message);
            }
            SwarmEvent::Behaviour(NodeBehaviourEvent::Gossipsub(_)) => {}
            SwarmEvent::NewListenAddr { address, .. } => {
                tracing::info!("开始监听: {}", address);
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                tracing::debug!("与 {} 建立连接", peer_id);
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                tracing::debug!("与 {} 的连接关闭", peer_id);
            }
            _ => {}
        }
    }

    /// 将一次 gossipsub 投递转发给对应主题的订阅
    fn dispatch_delivery(&mut self, propagation_source: PeerId, message: gossipsub::Message) {
        let tx = match self.subscriptions.get(&message.topic) {
            Some(tx) => tx.clone(),
            None => return,
        };

        // 签名消息带有可信来源；未签名时退回传播来源
        let source = message.source.unwrap_or(propagation_source);
        let delivery = Delivery {
            source,
            data: message.data,
        };

        match tx.try_send(delivery) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("主题 {} 的订阅缓冲区已满，丢弃一条消息", message.topic);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.subscriptions.remove(&message.topic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造一个服务端已经消失的句柄
    fn stopped_handle() -> NodeHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        drop(cmd_rx);
        NodeHandle {
            cmd_tx,
            local_peer_id: PeerId::random(),
        }
    }

    #[tokio::test]
    async fn test_join_topic_after_stop() {
        let handle = stopped_handle();
        assert!(matches!(
            handle.join_topic("localchat/room/lobby").await,
            Err(NodeError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_after_stop() {
        let handle = stopped_handle();
        assert!(matches!(
            handle.subscribe("localchat/room/lobby").await,
            Err(NodeError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_publish_after_stop() {
        let handle = stopped_handle();
        assert!(matches!(
            handle.publish("localchat/room/lobby", b"hi".to_vec()).await,
            Err(NodeError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_list_peers_after_stop() {
        let handle = stopped_handle();
        assert!(matches!(
            handle.list_peers("localchat/room/lobby").await,
            Err(NodeError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_leave_topic_after_stop_is_silent() {
        let handle = stopped_handle();
        // 离开主题是尽力而为的清理，服务消失时不报错
        handle.leave_topic("localchat/room/lobby").await;
    }

    #[test]
    fn test_handle_is_cloneable() {
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        let handle = NodeHandle {
            cmd_tx,
            local_peer_id: PeerId::random(),
        };
        let cloned = handle.clone();
        assert_eq!(handle.local_peer_id(), cloned.local_peer_id());
    }
}
