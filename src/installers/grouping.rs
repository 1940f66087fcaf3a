use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::asset::InstallerAsset;

/// 展示用的目录分组
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallerGroup {
    pub name: String,
    pub path: Vec<String>,
    pub installers: Vec<InstallerAsset>,
    pub children: Vec<InstallerGroup>,
}

impl InstallerGroup {
    /// 分组（含子分组）下的安装包总数
    pub fn total_installers(&self) -> usize {
        self.installers.len()
            + self
                .children
                .iter()
                .map(InstallerGroup::total_installers)
                .sum::<usize>()
    }
}

/// 根目录安装包 + 顶层分组
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallerTree {
    pub installers: Vec<InstallerAsset>,
    pub groups: Vec<InstallerGroup>,
}

impl InstallerTree {
    pub fn is_empty(&self) -> bool {
        self.installers.is_empty() && self.groups.is_empty()
    }
}

/// 先忽略大小写比较，相同时再按原始字符串比较，保证全序
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// 最终列表的排序：平台，其次文件名
pub fn sort_by_platform(assets: &mut [InstallerAsset]) {
    assets.sort_by(|a, b| {
        compare_labels(a.platform.as_str(), b.platform.as_str())
            .then_with(|| compare_labels(&a.filename, &b.filename))
    });
}

/// 分组内的排序：名称，其次文件名
pub fn sort_by_name(assets: &mut [InstallerAsset]) {
    assets.sort_by(|a, b| {
        compare_labels(&a.name, &b.name).then_with(|| compare_labels(&a.filename, &b.filename))
    });
}

/// 按 `directories` 构建分组树
pub fn group_installers(assets: &[InstallerAsset]) -> InstallerTree {
    let (root, nested): (Vec<&InstallerAsset>, Vec<&InstallerAsset>) =
        assets.iter().partition(|asset| asset.directories.is_empty());

    let mut installers: Vec<InstallerAsset> = root.into_iter().cloned().collect();
    sort_by_name(&mut installers);

    let with_depth: Vec<(&InstallerAsset, usize)> = nested.into_iter().map(|a| (a, 0)).collect();
    InstallerTree {
        installers,
        groups: build_groups(&with_depth, &[]),
    }
}

fn build_groups(assets: &[(&InstallerAsset, usize)], parent: &[String]) -> Vec<InstallerGroup> {
    let mut buckets: BTreeMap<&str, Vec<(&InstallerAsset, usize)>> = BTreeMap::new();
    for &(asset, depth) in assets {
        if let Some(segment) = asset.directories.get(depth) {
            buckets.entry(segment.as_str()).or_default().push((asset, depth + 1));
        }
    }

    let mut groups: Vec<InstallerGroup> = buckets
        .into_iter()
        .map(|(name, members)| {
            let mut path = parent.to_vec();
            path.push(name.to_string());

            let (here, deeper): (Vec<_>, Vec<_>) = members
                .into_iter()
                .partition(|(asset, depth)| asset.directories.len() == *depth);

            let mut installers: Vec<InstallerAsset> =
                here.into_iter().map(|(asset, _)| asset.clone()).collect();
            sort_by_name(&mut installers);

            let children = build_groups(&deeper, &path);
            InstallerGroup {
                name: name.to_string(),
                path,
                installers,
                children,
            }
        })
        .collect();

    groups.sort_by(|a, b| compare_labels(&a.name, &b.name));
    groups
}
