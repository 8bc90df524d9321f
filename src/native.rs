//! 不依赖 lftp 的传输方式：用 ssh2 直接解释命令脚本。

use crate::deployer::Transport;
use crate::error::DeployError;
use crate::script::{CommandScript, Directive, SftpTarget};
use crate::sftp_client;
use crate::ssh_client::{self, ConnectPolicy};
use log::{debug, info, warn};
use ssh2::{Session, Sftp};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTransport;

/// 脚本执行所需的远端文件操作，路径均为绝对路径
trait RemoteFs {
    fn is_dir(&self, path: &str) -> Result<bool, DeployError>;
    fn list_dir(&self, path: &str) -> Result<Vec<String>, DeployError>;
    fn mkdir_all(&self, path: &str) -> Result<(), DeployError>;
    fn put(&self, local: &Path, remote: &str) -> Result<u64, DeployError>;
}

/// ssh2 上的实现
struct SshFs {
    sftp: Sftp,
    // 持有会话直到 sftp 通道关闭
    _session: Session,
}

impl RemoteFs for SshFs {
    fn is_dir(&self, path: &str) -> Result<bool, DeployError> {
        Ok(self.sftp.stat(Path::new(path))?.is_dir())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, DeployError> {
        sftp_client::sftp_list_dir(&self.sftp, path)
    }

    fn mkdir_all(&self, path: &str) -> Result<(), DeployError> {
        sftp_client::sftp_mkdir_all(&self.sftp, path)
    }

    fn put(&self, local: &Path, remote: &str) -> Result<u64, DeployError> {
        sftp_client::sftp_upload_file(&self.sftp, local, remote)
    }
}

/// 打开会话并返回初始工作目录
fn open_ssh(target: &SftpTarget, policy: &ConnectPolicy) -> Result<(SshFs, String), DeployError> {
    let session = ssh_client::connect_with_retry(target, policy)?;
    let sftp = session
        .sftp()
        .map_err(|e| DeployError::Connectivity(format!("无法打开 SFTP 通道: {e}")))?;
    let cwd = sftp
        .realpath(Path::new("."))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "/".to_string());
    Ok((
        SshFs {
            sftp,
            _session: session,
        },
        cwd,
    ))
}

struct Connection<F> {
    fs: F,
    cwd: String,
}

/// 逐条执行指令，返回 `pwd` 的输出。`open` 指令交给 `connect`。
fn execute<F, C>(script: &CommandScript, mut connect: C) -> Result<Vec<String>, DeployError>
where
    F: RemoteFs,
    C: FnMut(&SftpTarget, &ConnectPolicy) -> Result<(F, String), DeployError>,
{
    let mut policy = ConnectPolicy::default();
    let mut conn: Option<Connection<F>> = None;
    let mut printed = Vec::new();

    for d in script.directives() {
        match d {
            Directive::Set { key, value } => apply_setting(&mut policy, key, value),
            Directive::Blank => {}
            Directive::Open(target) => {
                let (fs, cwd) = connect(target, &policy)?;
                conn = Some(Connection { fs, cwd });
            }
            Directive::Bye => break,
            other => {
                let c = conn
                    .as_mut()
                    .ok_or_else(|| DeployError::Connectivity("尚未建立连接".into()))?;
                run_remote(c, other, &mut printed)?;
            }
        }
    }
    Ok(printed)
}

fn run_remote<F: RemoteFs>(
    c: &mut Connection<F>,
    d: &Directive,
    printed: &mut Vec<String>,
) -> Result<(), DeployError> {
    match d {
        Directive::Pwd => printed.push(c.cwd.clone()),
        Directive::Cd(dir) => {
            let target = join_remote(&c.cwd, dir);
            if !c.fs.is_dir(&target)? {
                return Err(DeployError::Upload(format!("不是目录: {target}")));
            }
            c.cwd = target;
        }
        Directive::Ls => {
            for name in c.fs.list_dir(&c.cwd)? {
                info!("  {}", name);
            }
        }
        Directive::MkdirAll(dir) => c.fs.mkdir_all(&join_remote(&c.cwd, dir))?,
        Directive::Put { local, remote } => {
            let target = join_remote(&c.cwd, remote);
            let bytes = c.fs.put(local, &target)?;
            info!("已上传 {} ({} 字节)", target, bytes);
        }
        Directive::Set { .. } | Directive::Blank | Directive::Open(_) | Directive::Bye => {}
    }
    Ok(())
}

fn apply_setting(policy: &mut ConnectPolicy, key: &str, value: &str) {
    match key {
        "net:timeout" => {
            if let Ok(secs) = value.parse::<u64>() {
                policy.timeout = Some(Duration::from_secs(secs));
            }
        }
        "net:max-retries" => {
            if let Ok(n) = value.parse::<u32>() {
                policy.max_attempts = n;
            }
        }
        "net:reconnect-interval-base" => {
            if let Ok(secs) = value.parse::<u64>() {
                policy.reconnect_base = Duration::from_secs(secs);
            }
        }
        "net:reconnect-interval-multiplier" => {
            if let Ok(m) = value.parse::<f64>() {
                policy.reconnect_multiplier = m;
            }
        }
        "sftp:auto-confirm" => {
            if value != "yes" {
                warn!("原生传输不校验主机密钥，忽略 sftp:auto-confirm {}", value);
            }
        }
        _ => debug!("原生传输忽略设置 {} {}", key, value),
    }
}

/// 按 lftp 的规则拼接远端路径：绝对路径直接使用，相对路径接在当前目录后
fn join_remote(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        let trimmed = path.trim_end_matches('/');
        return if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() };
    }
    let base = cwd.trim_end_matches('/');
    let rel = path.trim_end_matches('/');
    if rel.is_empty() || rel == "." {
        return cwd.to_string();
    }
    format!("{base}/{rel}")
}

impl Transport for NativeTransport {
    fn probe(&self, script: &CommandScript) -> Result<String, DeployError> {
        let printed = execute(script, open_ssh).map_err(|e| match e {
            DeployError::Connectivity(_) => e,
            other => DeployError::Connectivity(other.to_string()),
        })?;
        Ok(printed.join("\n"))
    }

    fn upload(&self, script: &CommandScript) -> Result<(), DeployError> {
        execute(script, open_ssh).map(|_| ()).map_err(|e| match e {
            DeployError::Upload(_) | DeployError::Connectivity(_) => e,
            other => DeployError::Upload(other.to_string()),
        })
    }
}
