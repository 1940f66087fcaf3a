pub mod directory_walker;
pub mod github;
pub mod http_client;

#[cfg(test)]
pub mod fakes;

pub use directory_walker::RemoteDirectoryWalker;
pub use github::{contents_api_url, DirectoryEntry, EntryKind, FileContent, GitHubContentsClient, RepositoryClient};
pub use http_client::{HttpClient, JsonFetcher, NetworkError, ProgressCallback};
