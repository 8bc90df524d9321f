use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 写入磁盘的临时脚本，离开作用域时删除（成功或失败都会删除）。
/// 脚本包含明文密码，Unix 下以 0600 权限创建。
#[derive(Debug)]
pub struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    pub fn create(path: PathBuf, content: &str) -> io::Result<Self> {
        // 上次中断遗留的脚本可能权限过宽，先删除再新建
        match fs::remove_file(&path) {
            Ok(()) => debug!("已删除遗留脚本: {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }

        let mut file = opts.open(&path)?;
        // 先交给守卫，写入失败时同样会被清理
        let guard = Self { path };
        file.write_all(content.as_bytes())?;
        file.flush()?;
        debug!("已写入临时脚本: {}", guard.path.display());
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("已删除临时脚本: {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("删除临时脚本失败 {}: {}", self.path.display(), e),
        }
    }
}
