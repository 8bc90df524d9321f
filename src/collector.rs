use log::warn;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// 需要上传的静态资源扩展名（区分大小写）
pub const ASSET_EXTENSIONS: &[&str] = &[
    "html", "css", "js", "jpg", "jpeg", "png", "gif", "svg", "webp",
];

/// 待上传的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAsset {
    /// 本地绝对路径
    pub local: PathBuf,
    /// 相对皮肤根目录的路径
    pub relative: PathBuf,
}

impl LocalAsset {
    /// 远端目标目录（相对皮肤目录，`/` 分隔）；位于根目录时为 None
    pub fn remote_dir(&self) -> Option<String> {
        let parent = self.relative.parent()?;
        let parts: Vec<String> = parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    pub fn file_name(&self) -> String {
        self.relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn has_asset_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ASSET_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// 递归收集皮肤目录下的静态资源文件。
/// 目录本身与隐藏条目被跳过；按文件名深度优先排序，结果可复现。
/// 根目录不存在时返回空列表。
pub fn collect_assets(root: &Path) -> std::io::Result<Vec<LocalAsset>> {
    if !root.is_dir() {
        warn!("本地皮肤目录不存在: {}", root.display());
        return Ok(Vec::new());
    }
    let root = std::path::absolute(root)?;

    let mut assets = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("跳过无法读取的条目: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_asset_extension(entry.path()) {
            continue;
        }
        let rel = match entry.path().strip_prefix(&root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        assets.push(LocalAsset {
            local: entry.path().to_path_buf(),
            relative: rel,
        });
    }
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"x").unwrap();
    }

    fn relatives(assets: &[LocalAsset]) -> Vec<String> {
        assets
            .iter()
            .map(|a| a.relative.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn collects_matching_extensions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "index.html");
        touch(root, "sub/b.css");
        touch(root, "sub/deeper/logo.webp");
        touch(root, "a.js");
        touch(root, "notes.txt");
        touch(root, "README.md");

        let assets = collect_assets(root).unwrap();
        assert_eq!(
            relatives(&assets),
            vec!["a.js", "index.html", "sub/b.css", "sub/deeper/logo.webp"]
        );
        assert!(assets.iter().all(|a| a.local.is_absolute()));
    }

    #[test]
    fn directories_with_asset_names_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor.js")).unwrap();
        touch(dir.path(), "vendor.js/inner.js");

        let assets = collect_assets(dir.path()).unwrap();
        assert_eq!(relatives(&assets), vec!["vendor.js/inner.js"]);
    }

    #[test]
    fn skips_hidden_entries_and_uppercase_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".cache/x.css");
        touch(dir.path(), ".hidden.html");
        touch(dir.path(), "PHOTO.JPG");
        touch(dir.path(), "ok.png");

        let assets = collect_assets(dir.path()).unwrap();
        assert_eq!(relatives(&assets), vec!["ok.png"]);
    }

    #[test]
    fn missing_root_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let assets = collect_assets(&dir.path().join("public/nope")).unwrap();
        assert!(assets.is_empty());
    }

    #[test]
    fn remote_dir_uses_forward_slashes() {
        let top = LocalAsset {
            local: PathBuf::from("/x/a.html"),
            relative: PathBuf::from("a.html"),
        };
        let nested = LocalAsset {
            local: PathBuf::from("/x/img/icons/i.svg"),
            relative: PathBuf::from("img").join("icons").join("i.svg"),
        };
        assert_eq!(top.remote_dir(), None);
        assert_eq!(nested.remote_dir().as_deref(), Some("img/icons"));
        assert_eq!(nested.file_name(), "i.svg");
    }
}
