use crate::error::DeployError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3822;
pub const DEFAULT_SKIN: &str = "base";
pub const CONFIG_FILE_NAME: &str = "deploy.toml";
pub const DOTENV_FILE_NAME: &str = ".env";

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// 部署配置：SFTP 连接参数与要上传的皮肤目录
#[derive(Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// 远端基础目录，实际上传到 `<base_dir>/<skin>`
    pub base_dir: String,
    /// 本地 `public/` 下的皮肤目录名
    pub skin: String,
}

/// deploy.toml 中的可选项，未填写的由环境变量或默认值补齐
#[derive(Debug, Default, Deserialize, Clone)]
pub struct FileSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_dir: Option<String>,
    pub skin: Option<String>,
}

impl DeployConfig {
    /// 按 环境变量 > 配置文件 > 默认值 的顺序解析配置。
    /// `lookup` 返回环境变量的值，便于测试时注入。
    pub fn resolve<F>(lookup: F, file: FileSettings) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("FTP_HOST")
            .or(non_blank(file.host))
            .ok_or(DeployError::MissingSetting("FTP_HOST"))?;
        let username = get("FTP_USERNAME")
            .or(non_blank(file.username))
            .ok_or(DeployError::MissingSetting("FTP_USERNAME"))?;
        let password = get("FTP_PASSWORD")
            .or(non_blank(file.password))
            .ok_or(DeployError::MissingSetting("FTP_PASSWORD"))?;
        let base_dir = get("FTP_BASE_DIR")
            .or(non_blank(file.base_dir))
            .ok_or(DeployError::MissingSetting("FTP_BASE_DIR"))?;

        let port = match get("FTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| DeployError::InvalidPort(raw.clone()))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };
        if port == 0 {
            return Err(DeployError::InvalidPort("0".to_string()));
        }

        let skin = get("SKIN_DIR")
            .or(non_blank(file.skin))
            .unwrap_or_else(|| DEFAULT_SKIN.to_string());

        Ok(Self {
            host,
            port,
            username,
            password,
            base_dir,
            skin,
        })
    }

    /// 从进程环境变量、当前目录的 .env 与可选的 deploy.toml 加载。
    /// .env 中的值不会覆盖已设置的环境变量。
    pub fn from_env() -> Result<Self, DeployError> {
        let dotenv_path = Path::new(DOTENV_FILE_NAME);
        let dotenv = if dotenv_path.exists() {
            read_dotenv(dotenv_path)?
        } else {
            HashMap::new()
        };
        let file = load_file_settings()?.unwrap_or_default();
        Self::resolve(
            |key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()),
            file,
        )
    }

    /// 远端皮肤目录：`<base_dir>/<skin>`
    pub fn remote_skin_dir(&self) -> String {
        format!("{}/{}", self.base_dir.trim_end_matches('/'), self.skin)
    }

    /// 本地皮肤目录：`<workdir>/public/<skin>`
    pub fn local_skin_root(&self, workdir: &Path) -> PathBuf {
        workdir.join("public").join(&self.skin)
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("base_dir", &self.base_dir)
            .field("skin", &self.skin)
            .finish()
    }
}

/// 查找 deploy.toml：优先当前工作目录，其次可执行文件所在目录。
/// 两处都没有时返回 None，配置完全来自环境变量。
pub fn load_file_settings() -> Result<Option<FileSettings>, DeployError> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
    {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }

    for p in candidates {
        if p.exists() {
            return read_file_settings(&p).map(Some);
        }
    }
    Ok(None)
}

/// 读取 .env 文件中的键值对（不写入进程环境）
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, DeployError> {
    let to_err = |message: String| DeployError::ConfigFile {
        path: path.to_path_buf(),
        message,
    };
    let iter = dotenvy::from_path_iter(path).map_err(|e| to_err(e.to_string()))?;
    let mut vars = HashMap::new();
    for item in iter {
        let (k, v) = item.map_err(|e| to_err(e.to_string()))?;
        vars.insert(k, v);
    }
    Ok(vars)
}

pub fn read_file_settings(path: &Path) -> Result<FileSettings, DeployError> {
    let content = fs::read_to_string(path).map_err(|e| DeployError::ConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| DeployError::ConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("FTP_HOST", "sftp.example.com"),
            ("FTP_USERNAME", "shop"),
            ("FTP_PASSWORD", "secret"),
            ("FTP_BASE_DIR", "/www/skins"),
        ]
    }

    #[test]
    fn applies_port_and_skin_defaults() {
        let cfg = DeployConfig::resolve(env(&full_env()), FileSettings::default()).unwrap();
        assert_eq!(cfg.port, 3822);
        assert_eq!(cfg.skin, "base");
        assert_eq!(cfg.remote_skin_dir(), "/www/skins/base");
    }

    #[test]
    fn missing_password_fails_fast() {
        let mut vars = full_env();
        vars.retain(|(k, _)| *k != "FTP_PASSWORD");
        let err = DeployConfig::resolve(env(&vars), FileSettings::default()).unwrap_err();
        assert!(matches!(err, DeployError::MissingSetting("FTP_PASSWORD")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = full_env();
        vars.push(("FTP_HOST", ""));
        vars.remove(0);
        let err = DeployConfig::resolve(env(&vars), FileSettings::default()).unwrap_err();
        assert!(matches!(err, DeployError::MissingSetting("FTP_HOST")));
    }

    #[test]
    fn rejects_unparseable_port() {
        let mut vars = full_env();
        vars.push(("FTP_PORT", "22x"));
        let err = DeployConfig::resolve(env(&vars), FileSettings::default()).unwrap_err();
        assert!(matches!(err, DeployError::InvalidPort(ref v) if v == "22x"));
    }

    #[test]
    fn environment_overrides_file_settings() {
        let mut vars = full_env();
        vars.push(("SKIN_DIR", "mobile"));
        let file = FileSettings {
            host: Some("file-host".into()),
            port: Some(2222),
            skin: Some("desktop".into()),
            ..FileSettings::default()
        };
        let cfg = DeployConfig::resolve(env(&vars), file).unwrap();
        assert_eq!(cfg.host, "sftp.example.com");
        assert_eq!(cfg.port, 2222);
        assert_eq!(cfg.skin, "mobile");
    }

    #[test]
    fn file_fills_missing_environment() {
        let file = FileSettings {
            host: Some("h".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            base_dir: Some("/b/".into()),
            ..FileSettings::default()
        };
        let cfg = DeployConfig::resolve(env(&[]), file).unwrap();
        assert_eq!(cfg.remote_skin_dir(), "/b/base");
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg = DeployConfig::resolve(env(&full_env()), FileSettings::default()).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("sftp.example.com"));
    }

    #[test]
    fn reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "host = \"h\"\nport = 2022\nskin = \"dark\"\n").unwrap();
        let settings = read_file_settings(&path).unwrap();
        assert_eq!(settings.host.as_deref(), Some("h"));
        assert_eq!(settings.port, Some(2022));
        assert_eq!(settings.skin.as_deref(), Some("dark"));
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "port = \"not a number\"").unwrap();
        let err = read_file_settings(&path).unwrap_err();
        assert!(matches!(err, DeployError::ConfigFile { .. }));
    }

    #[test]
    fn blank_file_values_are_treated_as_missing() {
        let file = FileSettings {
            host: Some("h".into()),
            username: Some("u".into()),
            password: Some("".into()),
            base_dir: Some("/www".into()),
            ..FileSettings::default()
        };
        let err = DeployConfig::resolve(env(&[]), file).unwrap_err();
        assert!(matches!(err, DeployError::MissingSetting("FTP_PASSWORD")));
    }

    #[test]
    fn blank_skin_in_file_falls_back_to_default() {
        let file = FileSettings {
            host: Some("h".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            base_dir: Some("/www".into()),
            skin: Some("  ".into()),
            ..FileSettings::default()
        };
        let cfg = DeployConfig::resolve(env(&[]), file).unwrap();
        assert_eq!(cfg.skin, "base");
        assert_eq!(cfg.remote_skin_dir(), "/www/base");
        assert_eq!(
            cfg.local_skin_root(Path::new("/site")),
            PathBuf::from("/site/public/base")
        );
    }

    #[test]
    fn dotenv_values_fill_in_behind_real_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOTENV_FILE_NAME);
        fs::write(
            &path,
            "FTP_HOST=dotenv-host\nFTP_USERNAME=shop\nFTP_PASSWORD=\"p@ss word\"\nFTP_BASE_DIR=/www\nSKIN_DIR=mobile\n",
        )
        .unwrap();
        let dotenv = read_dotenv(&path).unwrap();
        let real = env(&[("FTP_HOST", "real-host")]);

        let cfg = DeployConfig::resolve(
            |key| real(key).or_else(|| dotenv.get(key).cloned()),
            FileSettings::default(),
        )
        .unwrap();
        assert_eq!(cfg.host, "real-host");
        assert_eq!(cfg.password, "p@ss word");
        assert_eq!(cfg.skin, "mobile");
    }
}
