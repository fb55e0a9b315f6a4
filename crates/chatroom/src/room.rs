//! 聊天房间模块
//!
//! 将逻辑房间名绑定到传输层主题，负责消息编解码、自环过滤和
//! 收件消息流。

use crate::config::{MESSAGE_BUFFER_SIZE, TOPIC_PREFIX};
use crate::message::ChatMessage;
use crate::node::{Delivery, NodeHandle};
use crate::{NodeError, Result};
use libp2p::PeerId;
use tokio::sync::{mpsc, watch};

/// 发布消息错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// 消息序列化失败（实践中不应出现）
    #[error("消息编码失败: {0}")]
    Encode(String),

    /// 传输层拒绝发送（例如当前没有任何已连接节点）
    #[error("消息发送失败: {0}")]
    Send(String),

    /// 节点服务已停止
    #[error("节点服务已停止")]
    NodeStopped,
}

/// 根据房间名推导传输层主题名
///
/// 纯函数；相同房间名在任何进程中得到相同主题，不同房间名
/// 永不冲突。
pub fn topic_name(room_name: &str) -> String {
    format!("{}{}", TOPIC_PREFIX, room_name)
}

/// 聊天房间
///
/// 把本地节点绑定到一个聊天主题。由 [`Room::join`] 创建；生命周期
/// 由创建时传入的关闭信号支配，没有显式的关闭操作。
pub struct Room {
    node: NodeHandle,
    topic: String,
    room_name: String,
    self_id: PeerId,
    nick: String,
    messages: Option<mpsc::Receiver<ChatMessage>>,
}

impl Room {
    /// 加入聊天房间
    ///
    /// 先绑定推导出的主题，再建立订阅，最后启动后台读循环。
    /// 订阅失败时会先释放已绑定的主题再返回错误，不留泄漏。
    pub async fn join(
        shutdown: watch::Receiver<bool>,
        node: NodeHandle,
        room_name: &str,
        self_id: PeerId,
        nick: &str,
    ) -> Result<Self> {
        let topic = topic_name(room_name);

        node.join_topic(&topic).await?;

        let sub = match node.subscribe(&topic).await {
            Ok(sub) => sub,
            Err(e) => {
                node.leave_topic(&topic).await;
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER_SIZE);
        tokio::spawn(read_loop(sub, shutdown, self_id, tx));

        Ok(Self {
            node,
            topic,
            room_name: room_name.to_string(),
            self_id,
            nick: nick.to_string(),
            messages: Some(rx),
        })
    }

    /// 发布一条文本消息
    ///
    /// 成功仅意味着消息已交给传输层广播；没有送达保证、顺序保证
    /// 或同步确认。当前没有已连接节点时返回可展示的错误。
    pub async fn publish(&self, body: &str) -> std::result::Result<(), PublishError> {
        let message = ChatMessage::new(body, self.self_id.to_string(), self.nick.clone());
        let data = message
            .encode()
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        match self.node.publish(&self.topic, data).await {
            Ok(()) => Ok(()),
            Err(NodeError::Stopped) => Err(PublishError::NodeStopped),
            Err(e) => Err(PublishError::Send(e.to_string())),
        }
    }

    /// 列出主题当前已知的对等节点
    ///
    /// 纯查询，反映传输层当下的连接级成员信息，随节点进出变化。
    pub async fn list_peers(&self) -> Result<Vec<PeerId>> {
        self.node.list_peers(&self.topic).await
    }

    /// 取出收件消息流
    ///
    /// 只能取出一次。流中是所有非本节点发出的消息，按本地订阅
    /// 顺序排列；流在读循环终止时关闭，关闭即表示不会再有消息。
    pub fn take_messages(&mut self) -> Option<mpsc::Receiver<ChatMessage>> {
        self.messages.take()
    }

    /// 房间名
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// 本地昵称
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// 本地 Peer ID
    pub fn self_id(&self) -> PeerId {
        self.self_id
    }
}

/// 房间读循环
///
/// 每个房间唯一的后台任务：取出订阅投递、过滤自环、解码并送入
/// 收件通道。关闭信号或订阅通道关闭是唯一的终止路径；任务结束时
/// 丢弃发送端，消息流随之关闭，且只关闭一次。
async fn read_loop(
    mut sub: mpsc::Receiver<Delivery>,
    mut shutdown: watch::Receiver<bool>,
    self_id: PeerId,
    messages: mpsc::Sender<ChatMessage>,
) {
    loop {
        let delivery = tokio::select! {
            _ = shutdown.changed() => break,
            delivery = sub.recv() => match delivery {
                Some(delivery) => delivery,
                None => break,
            },
        };

        // 自环过滤只看传输层报告的来源，消息体内的字段不可信
        if delivery.source == self_id {
            continue;
        }

        let message = match ChatMessage::decode(&delivery.data) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("丢弃无法解码的消息: {}", e);
                continue;
            }
        };

        // 缓冲区满时在此阻塞，等待消费者取走消息
        if messages.send(message).await.is_err() {
            break;
        }
    }
}
