use crate::error::DeployError;
use ssh2::{OpenFlags, OpenType, Sftp};
use std::fs::File;
use std::path::Path;

/// 使用 SFTP 将本地文件上传到远端指定路径（已存在则覆盖）
pub fn sftp_upload_file(sftp: &Sftp, local_path: &Path, remote_path: &str) -> Result<u64, DeployError> {
    let mut local_file = File::open(local_path)?;

    let flags = OpenFlags::CREATE | OpenFlags::WRITE | OpenFlags::TRUNCATE;
    let mode: i32 = 0o644;
    let mut remote_file = sftp.open_mode(Path::new(remote_path), flags, mode, OpenType::File)?;

    let written = std::io::copy(&mut local_file, &mut remote_file)?;
    Ok(written)
}

/// 逐级创建远端目录，已存在的目录跳过（`mkdir -p`）
pub fn sftp_mkdir_all(sftp: &Sftp, remote_dir: &str) -> Result<(), DeployError> {
    for prefix in dir_prefixes(remote_dir) {
        match sftp.stat(Path::new(&prefix)) {
            Ok(st) if st.is_dir() => continue,
            Ok(_) => {
                return Err(DeployError::Upload(format!("远端路径已存在且不是目录: {prefix}")));
            }
            Err(_) => sftp.mkdir(Path::new(&prefix), 0o755)?,
        }
    }
    Ok(())
}

/// 列出远端目录下的条目名
pub fn sftp_list_dir(sftp: &Sftp, remote_dir: &str) -> Result<Vec<String>, DeployError> {
    let mut names: Vec<String> = sftp
        .readdir(Path::new(remote_dir))?
        .into_iter()
        .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// `/a/b/c` → [`/a`, `/a/b`, `/a/b/c`]；相对路径同理
fn dir_prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut acc = String::new();
    let mut out = Vec::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !acc.is_empty() || absolute {
            acc.push('/');
        }
        acc.push_str(part);
        out.push(acc.clone());
    }
    out
}
