use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use tracing::warn;

use super::github::{DirectoryEntry, RepositoryClient};

/// 远程目录递归遍历
///
/// 每一层发起一次目录列表请求，子目录并发递归，结果拍平成一个文件列表。
/// 任一层请求失败时只丢弃该子树。
pub struct RemoteDirectoryWalker<'a> {
    client: &'a dyn RepositoryClient,
    git_ref: &'a str,
}

impl<'a> RemoteDirectoryWalker<'a> {
    pub fn new(client: &'a dyn RepositoryClient, git_ref: &'a str) -> Self {
        Self { client, git_ref }
    }

    /// 列出 `path` 下的全部文件（父目录文件在前，子目录结果按目录顺序追加）
    pub fn list_files(&self, path: &str) -> BoxFuture<'_, Vec<DirectoryEntry>> {
        let path = path.to_string();
        async move {
            let entries = match self.client.list_directory(&path, self.git_ref).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path, "列出远程目录失败: {e}");
                    return Vec::new();
                }
            };

            let (mut files, directories): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(DirectoryEntry::is_file);
            let directories: Vec<_> = directories.into_iter().filter(DirectoryEntry::is_dir).collect();
            if directories.is_empty() {
                return files;
            }

            let subtrees = join_all(directories.iter().map(|dir| self.list_files(&dir.path))).await;
            files.extend(subtrees.into_iter().flatten());
            files
        }
        .boxed()
    }
}
