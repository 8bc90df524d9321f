use crate::deployer::Transport;
use crate::error::DeployError;
use crate::runner::CommandRunner;
use crate::script::CommandScript;
use crate::script_file::ScriptFile;
use log::{debug, error};
use std::ffi::OsStr;
use std::path::PathBuf;

pub const PROBE_SCRIPT_NAME: &str = "sftp_test.txt";
pub const UPLOAD_SCRIPT_NAME: &str = "sftp_upload.txt";

/// 通过 `lftp -f <脚本>` 执行命令脚本
pub struct LftpTransport<R> {
    runner: R,
    program: String,
    /// 临时脚本所在目录
    workdir: PathBuf,
}

impl<R: CommandRunner> LftpTransport<R> {
    pub fn new(runner: R, program: impl Into<String>, workdir: PathBuf) -> Self {
        Self {
            runner,
            program: program.into(),
            workdir,
        }
    }
}

impl<R: CommandRunner> Transport for LftpTransport<R> {
    fn probe(&self, script: &CommandScript) -> Result<String, DeployError> {
        debug!("连接测试脚本:\n{}", script.render_masked());
        let file = ScriptFile::create(self.workdir.join(PROBE_SCRIPT_NAME), &script.render())?;

        let out = self
            .runner
            .output(&self.program, &[OsStr::new("-f"), file.path().as_os_str()])
            .map_err(|e| DeployError::Connectivity(e.to_string()))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let detail = if stderr.trim().is_empty() {
                out.status.to_string()
            } else {
                format!("{} ({})", stderr.trim(), out.status)
            };
            error!("SFTP 连接失败: {}", detail);
            return Err(DeployError::Connectivity(detail));
        }

        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    fn upload(&self, script: &CommandScript) -> Result<(), DeployError> {
        debug!("上传脚本:\n{}", script.render_masked());
        let file = ScriptFile::create(self.workdir.join(UPLOAD_SCRIPT_NAME), &script.render())?;

        let status = self
            .runner
            .status(&self.program, &[OsStr::new("-f"), file.path().as_os_str()])?;

        if !status.success() {
            error!("文件上传失败: {} 退出状态 {}", self.program, status);
            return Err(DeployError::Upload(format!(
                "{} 退出状态 {}",
                self.program, status
            )));
        }
        Ok(())
    }
}
