use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 部署流程中所有可能的失败
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("缺少必需的配置项 {0}")]
    MissingSetting(&'static str),

    #[error("端口配置无效: {0:?}")]
    InvalidPort(String),

    #[error("读取配置文件失败 {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error("SFTP 连接失败: {0}")]
    Connectivity(String),

    #[error("文件上传失败: {0}")]
    Upload(String),

    #[error("无法启动传输客户端 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Ssh(#[from] ssh2::Error),
}
