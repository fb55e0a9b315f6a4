use chatroom::{identity, ChatNode, NodeConfig, Room};
use std::env;
use tokio::sync::watch;

mod logging;

/// 默认房间名
const DEFAULT_ROOM: &str = "lobby";

/// 默认昵称
const DEFAULT_NICK: &str = "anon";

/// CLI 参数配置
struct CliArgs {
    room: String,
    nick: String,
}

fn print_usage(program_name: &str) {
    println!("用法: {} [选项]", program_name);
    println!();
    println!("选项:");
    println!("  --room <名称>   要加入的聊天室名称（默认: {}）", DEFAULT_ROOM);
    println!("  --nick <昵称>   在聊天室中使用的昵称（默认: {}）", DEFAULT_NICK);
    println!("  --help, -h      显示帮助信息");
    println!();
    println!("示例:");
    println!("  {} --room 客厅 --nick 小明", program_name);
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&args[0]);
        std::process::exit(0);
    }

    let mut room = DEFAULT_ROOM.to_string();
    let mut nick = DEFAULT_NICK.to_string();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--room" => match iter.next() {
                Some(value) => room = value.clone(),
                None => {
                    eprintln!("--room 需要一个参数");
                    std::process::exit(1);
                }
            },
            "--nick" => match iter.next() {
                Some(value) => nick = value.clone(),
                None => {
                    eprintln!("--nick 需要一个参数");
                    std::process::exit(1);
                }
            },
            other => {
                eprintln!("未知参数: {}", other);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
    }

    CliArgs { room, nick }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    // 界面占用终端，日志只写入文件
    let _guard = logging::init()?;

    let key_path = identity::default_key_path();
    let keypair = identity::load_or_generate(&key_path)?;
    let local_peer_id = keypair.public().to_peer_id();
    tracing::info!("本地 Peer ID: {}", local_peer_id);

    let config = NodeConfig::new().with_nickname(args.nick.clone());
    let (node, handle) = ChatNode::new(keypair, config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let node_task = tokio::spawn(node.run(shutdown_rx.clone()));

    let room = Room::join(shutdown_rx, handle, &args.room, local_peer_id, &args.nick).await?;
    tracing::info!("已加入聊天室: {}", args.room);

    tui_app::run_chat(room).await?;

    // 界面退出后触发关闭信号，等待节点服务收尾
    let _ = shutdown_tx.send(true);
    let _ = node_task.await;

    Ok(())
}
