use crate::error::DeployError;
use std::ffi::OsStr;
use std::process::{Command, ExitStatus, Output, Stdio};

/// 外部命令执行接口。生产实现直接启动进程，测试可返回预设结果。
pub trait CommandRunner {
    /// 执行命令并捕获标准输出与标准错误
    fn output(&self, program: &str, args: &[&OsStr]) -> Result<Output, DeployError>;

    /// 执行命令，标准输入输出直接继承当前进程（实时显示进度）
    fn status(&self, program: &str, args: &[&OsStr]) -> Result<ExitStatus, DeployError>;
}

/// 基于 `std::process::Command` 的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, program: &str, args: &[&OsStr]) -> Result<Output, DeployError> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| DeployError::Spawn {
                program: program.to_string(),
                source,
            })
    }

    fn status(&self, program: &str, args: &[&OsStr]) -> Result<ExitStatus, DeployError> {
        Command::new(program)
            .args(args)
            .status()
            .map_err(|source| DeployError::Spawn {
                program: program.to_string(),
                source,
            })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let out = SystemRunner
            .output("sh", &[OsStr::new("-c"), OsStr::new("echo /home/shop; exit 3")])
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "/home/shop");
        assert_eq!(out.status.code(), Some(3));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = SystemRunner
            .status("definitely-not-an-installed-client", &[])
            .unwrap_err();
        assert!(matches!(err, DeployError::Spawn { .. }));
    }
}
