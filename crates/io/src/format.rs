use crate::{read_pcd, read_ply, write_pcd, write_pcd_binary, write_ply, write_ply_binary};
use cloudpick_core::PointCloud;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// How point records are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Ascii,
    #[default]
    Binary,
}

/// On-disk point cloud formats, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudFormat {
    Pcd,
    Ply,
}

impl CloudFormat {
    /// Match an extension (without the dot), ignoring ASCII case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("pcd") {
            Some(CloudFormat::Pcd)
        } else if ext.eq_ignore_ascii_case("ply") {
            Some(CloudFormat::Ply)
        } else {
            None
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            CloudFormat::Pcd => "pcd",
            CloudFormat::Ply => "ply",
        }
    }

    pub fn read(self, path: impl AsRef<Path>) -> io::Result<PointCloud> {
        match self {
            CloudFormat::Pcd => read_pcd(path),
            CloudFormat::Ply => read_ply(path),
        }
    }

    pub fn write(
        self,
        path: impl AsRef<Path>,
        cloud: &PointCloud,
        encoding: Encoding,
    ) -> io::Result<()> {
        match (self, encoding) {
            (CloudFormat::Pcd, Encoding::Ascii) => write_pcd(path, cloud),
            (CloudFormat::Pcd, Encoding::Binary) => write_pcd_binary(path, cloud),
            (CloudFormat::Ply, Encoding::Ascii) => write_ply(path, cloud),
            (CloudFormat::Ply, Encoding::Binary) => write_ply_binary(path, cloud),
        }
    }
}

fn unsupported(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unrecognized point cloud extension: {}", path.display()),
    )
}

/// Load a point cloud, choosing the reader from the path's extension.
pub fn load(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let path = path.as_ref();
    CloudFormat::from_path(path)
        .ok_or_else(|| unsupported(path))?
        .read(path)
}

/// Save a point cloud, choosing the writer from the path's extension.
pub fn save(path: impl AsRef<Path>, cloud: &PointCloud, encoding: Encoding) -> io::Result<()> {
    let path = path.as_ref();
    CloudFormat::from_path(path)
        .ok_or_else(|| unsupported(path))?
        .write(path, cloud, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_lookup() {
        assert_eq!(CloudFormat::from_extension("pcd"), Some(CloudFormat::Pcd));
        assert_eq!(CloudFormat::from_extension("PLY"), Some(CloudFormat::Ply));
        assert_eq!(CloudFormat::from_extension("las"), None);
        assert_eq!(CloudFormat::from_path("a/b/scan.pcd"), Some(CloudFormat::Pcd));
        assert_eq!(CloudFormat::from_path("noext"), None);
    }

    #[test]
    fn save_then_load_each_format() {
        let dir = tempdir().unwrap();
        let cloud = PointCloud::from_xyz(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
        for name in ["a.pcd", "b.ply"] {
            for encoding in [Encoding::Ascii, Encoding::Binary] {
                let path = dir.path().join(name);
                save(&path, &cloud, encoding).unwrap();
                assert_eq!(load(&path).unwrap(), cloud, "{} {:?}", name, encoding);
            }
        }
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.xyz");
        let err = save(&path, &PointCloud::new(), Encoding::Binary).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_eq!(load(&path).unwrap_err().kind(), io::ErrorKind::Unsupported);
        assert!(!path.exists());
    }
}
