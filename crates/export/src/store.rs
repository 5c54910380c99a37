use cloudpick_core::PointCloud;
use cloudpick_io::Encoding;
use std::io;
use std::path::Path;

/// Where source clouds come from and filtered clouds go.
pub trait CloudStore {
    fn load(&self, path: &Path) -> io::Result<PointCloud>;
    fn save(&self, path: &Path, cloud: &PointCloud, encoding: Encoding) -> io::Result<()>;
}

impl<T: CloudStore + ?Sized> CloudStore for &T {
    fn load(&self, path: &Path) -> io::Result<PointCloud> {
        (**self).load(path)
    }

    fn save(&self, path: &Path, cloud: &PointCloud, encoding: Encoding) -> io::Result<()> {
        (**self).save(path, cloud, encoding)
    }
}

/// Reads and writes clouds on the local filesystem, picking PCD or PLY
/// from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl CloudStore for FileStore {
    fn load(&self, path: &Path) -> io::Result<PointCloud> {
        cloudpick_io::load(path)
    }

    fn save(&self, path: &Path, cloud: &PointCloud, encoding: Encoding) -> io::Result<()> {
        cloudpick_io::save(path, cloud, encoding)
    }
}
