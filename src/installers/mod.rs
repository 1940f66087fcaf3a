pub mod asset;
pub mod catalog;
pub mod classifier;
pub mod generator;
pub mod grouping;
pub mod manifest;
pub mod metadata;
pub mod platform;

pub use asset::{AssetBuilder, AssetContext, AssetInput, InstallerAsset};
pub use catalog::InstallerCatalog;
pub use grouping::{group_installers, InstallerGroup, InstallerTree};
pub use manifest::{normalize_manifest_relative_path, ManifestFileEntry, ManifestWalker, NodeKind, PathRules};
pub use metadata::{InstallerDetails, LicenseInfo, Metadata};
pub use platform::Platform;
