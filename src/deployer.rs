use crate::collector;
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::script::{self, CommandScript};
use log::{debug, info};
use std::path::Path;

const RULE: &str = "----------------------------------------";

/// 执行命令脚本的方式：lftp 子进程或原生 SFTP
pub trait Transport {
    /// 执行连接测试脚本，返回远端当前目录
    fn probe(&self, script: &CommandScript) -> Result<String, DeployError>;

    /// 执行上传脚本
    fn upload(&self, script: &CommandScript) -> Result<(), DeployError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Uploaded(usize),
    NothingToUpload,
}

/// 连接测试：失败时返回 Connectivity 错误
pub fn check_connection(cfg: &DeployConfig, transport: &dyn Transport) -> Result<String, DeployError> {
    info!("{RULE}");
    info!("正在连接 SFTP 服务器...");
    info!("主机: {}:{}", cfg.host, cfg.port);
    info!("用户: {}", cfg.username);
    info!("基础目录: {}", cfg.base_dir);
    info!("皮肤目录: {}", cfg.skin);
    info!("{RULE}");

    let pwd = transport.probe(&script::probe_script(cfg))?;
    info!("SFTP 服务器连接成功");
    info!("当前路径: {}", pwd);
    Ok(pwd)
}

/// 完整流程：连接测试 → 收集文件 → 生成上传脚本 → 执行上传。
/// `workdir` 下的 `public/<skin>` 为本地皮肤目录。
pub fn deploy_skin(
    cfg: &DeployConfig,
    workdir: &Path,
    transport: &dyn Transport,
) -> Result<Outcome, DeployError> {
    check_connection(cfg, transport)?;
    info!("{RULE}");

    let root = cfg.local_skin_root(workdir);
    let assets = collector::collect_assets(&root)?;
    info!("找到待上传文件 {} 个", assets.len());
    for a in &assets {
        debug!("  {}", a.relative.display());
    }

    if assets.is_empty() {
        info!("没有需要上传的文件，结束部署");
        return Ok(Outcome::NothingToUpload);
    }

    let upload = script::upload_script(cfg, &assets);
    transport.upload(&upload)?;
    info!("文件上传成功: {} 个 -> {}", upload.put_count(), cfg.remote_skin_dir());

    info!("{RULE}");
    info!("全部文件上传完成");
    Ok(Outcome::Uploaded(assets.len()))
}
