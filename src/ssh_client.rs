use crate::error::DeployError;
use crate::script::SftpTarget;
use log::{debug, info, warn};
use ssh2::Session;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

/// 重连等待上限，同 lftp 的 `net:reconnect-interval-max` 默认值
const MAX_RECONNECT_INTERVAL: Duration = Duration::from_secs(600);

/// 连接参数，对应脚本中的 `set net:*` 指令
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectPolicy {
    pub timeout: Option<Duration>,
    /// 最多尝试次数，0 表示不限（与 lftp 的 `net:max-retries 0` 一致）
    pub max_attempts: u32,
    pub reconnect_base: Duration,
    pub reconnect_multiplier: f64,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
            reconnect_base: Duration::from_secs(5),
            reconnect_multiplier: 1.0,
        }
    }
}

impl ConnectPolicy {
    /// 第 `attempt` 次失败后的等待时间（从 1 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.reconnect_multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let secs = (self.reconnect_base.as_secs_f64() * factor).min(MAX_RECONNECT_INTERVAL.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// 第 `attempt` 次失败后是否还能再试
    pub fn can_retry(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }
}

/// 依次尝试每个解析出的地址，全部失败时返回最后一个错误
fn connect_any<I>(addrs: I, timeout: Option<Duration>) -> io::Result<TcpStream>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("连接 {} 失败: {}", addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "没有可用的地址")))
}

/// 建立 SSH 连接并完成用户名/密码认证。
/// 主机密钥不做校验，等同于 `sftp:auto-confirm yes`。
pub fn connect_ssh(target: &SftpTarget, timeout: Option<Duration>) -> Result<Session, DeployError> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(DeployError::Connectivity(format!("无法解析主机 {}", target.host)));
    }
    let stream = connect_any(addrs, timeout)?;
    if let Some(t) = timeout {
        let _ = stream.set_read_timeout(Some(t));
        let _ = stream.set_write_timeout(Some(t));
    }

    let mut sess = Session::new()?;
    sess.set_tcp_stream(stream);
    if let Some(t) = timeout {
        sess.set_timeout(t.as_millis().min(u32::MAX as u128) as u32);
    }
    sess.handshake()?;
    sess.userauth_password(&target.username, &target.password)?;

    if !sess.authenticated() {
        return Err(DeployError::Connectivity("SSH 未认证".into()));
    }
    Ok(sess)
}

/// 按策略重试连接，所有尝试失败后返回最后一次的错误
pub fn connect_with_retry(target: &SftpTarget, policy: &ConnectPolicy) -> Result<Session, DeployError> {
    let limit = if policy.max_attempts == 0 {
        "∞".to_string()
    } else {
        policy.max_attempts.to_string()
    };
    let mut attempt = 1;
    loop {
        match connect_ssh(target, policy.timeout) {
            Ok(sess) => {
                info!("已连接并认证到 {}:{}", target.host, target.port);
                return Ok(sess);
            }
            Err(e) if policy.can_retry(attempt) => {
                let wait = policy.backoff(attempt);
                warn!("连接失败（第 {attempt}/{limit} 次）: {e}，{}s 后重试", wait.as_secs());
                thread::sleep(wait);
                attempt += 1;
            }
            Err(e) => return Err(DeployError::Connectivity(e.to_string())),
        }
    }
}
