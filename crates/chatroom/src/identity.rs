//! 节点身份模块
//!
//! 密钥对的持久化保存与加载，保证 Peer ID 在多次运行之间稳定。

use libp2p::identity::Keypair;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 身份相关错误
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("密钥编解码失败: {0}")]
    Codec(String),
}

/// 默认密钥文件路径（遵循 XDG 数据目录规范）
pub fn default_key_path() -> PathBuf {
    if let Ok(data_dir) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_dir).join("localchat").join("identity.key");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("localchat")
            .join("identity.key");
    }

    PathBuf::from(".localchat_identity.key")
}

/// 加载或生成密钥对
///
/// 文件存在则加载，否则生成新的 ed25519 密钥对并保存，
/// 使用 libp2p 的 Protobuf 编码格式。
pub fn load_or_generate(path: &Path) -> Result<Keypair, IdentityError> {
    if path.exists() {
        let bytes = fs::read(path)?;
        let keypair = Keypair::from_protobuf_encoding(&bytes)
            .map_err(|e| IdentityError::Codec(e.to_string()))?;
        tracing::info!("已加载密钥对: {}", path.display());
        return Ok(keypair);
    }

    let keypair = Keypair::generate_ed25519();
    let encoded = keypair
        .to_protobuf_encoding()
        .map_err(|e| IdentityError::Codec(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &encoded)?;

    // 密钥文件只允许所有者读写
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            tracing::warn!("设置密钥文件权限失败: {} - {}", path.display(), e);
        }
    }

    tracing::info!("已生成并保存新密钥对: {}", path.display());
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_generate_creates_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");

        let keypair = load_or_generate(&path).unwrap();
        assert!(path.exists());

        // 再次加载应该得到相同的 Peer ID
        let reloaded = load_or_generate(&path).unwrap();
        assert_eq!(
            keypair.public().to_peer_id(),
            reloaded.public().to_peer_id()
        );
    }

    #[test]
    fn test_load_or_generate_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("identity.key");

        load_or_generate(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_key_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");
        fs::write(&path, b"definitely not a keypair").unwrap();

        let result = load_or_generate(&path);
        assert!(matches!(result, Err(IdentityError::Codec(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.key");

        load_or_generate(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
