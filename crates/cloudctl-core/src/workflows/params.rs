//! Convenience parameter structs for disk creation
//!
//! Only the fields the caller sets are required; the rest are filled with
//! the API's documented defaults when converted to a request.

use crate::api::DiskCreateRequest;

/// Disk type used when none is given
pub const DEFAULT_DISK_TYPE: &str = "persistent-ssd";

/// Block size used for `persistent-ssd` disks when none is given
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// Block sizes the API accepts
pub const SUPPORTED_BLOCK_SIZES: [u64; 2] = [512, 4096];

/// Parameters for creating a disk
///
/// # Example
///
/// ```rust
/// use cloudctl_core::workflows::CreateDiskParams;
///
/// let request = CreateDiskParams::new("scratch", "us-east1-a", "200GiB").into_request();
///
/// assert_eq!(request.disk_type, "persistent-ssd");
/// assert_eq!(request.block_size, Some(4096));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDiskParams {
    pub name: String,
    pub location: String,
    /// Size with unit, e.g. `200GiB` or `1TiB`
    pub size: String,
    /// Disk type (default: `persistent-ssd`)
    pub disk_type: Option<String>,
    /// Block size in bytes, 512 or 4096
    pub block_size: Option<u64>,
}

impl CreateDiskParams {
    /// Create new params with required fields
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            size: size.into(),
            disk_type: None,
            block_size: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, disk_type: impl Into<String>) -> Self {
        self.disk_type = Some(disk_type.into());
        self
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Convert to a [`DiskCreateRequest`], applying defaults
    ///
    /// A missing block size is only defaulted for `persistent-ssd`; other
    /// types leave the choice to the server.
    #[must_use]
    pub fn into_request(self) -> DiskCreateRequest {
        let disk_type = self
            .disk_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_DISK_TYPE.to_string());
        let block_size = match self.block_size.filter(|size| *size != 0) {
            Some(size) => Some(size),
            None if disk_type == DEFAULT_DISK_TYPE => Some(DEFAULT_BLOCK_SIZE),
            None => None,
        };

        DiskCreateRequest {
            name: self.name,
            location: self.location,
            disk_type,
            size: self.size,
            block_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_persistent_ssd() {
        let request = CreateDiskParams::new("d", "loc", "10GiB").into_request();
        assert_eq!(request.disk_type, DEFAULT_DISK_TYPE);
        assert_eq!(request.block_size, Some(DEFAULT_BLOCK_SIZE));
    }

    #[test]
    fn test_explicit_block_size_is_kept() {
        let request = CreateDiskParams::new("d", "loc", "10GiB")
            .with_block_size(512)
            .into_request();
        assert_eq!(request.block_size, Some(512));
    }

    #[test]
    fn test_other_types_get_no_default_block_size() {
        let request = CreateDiskParams::new("d", "loc", "10TiB")
            .with_type("shared-volume")
            .into_request();
        assert_eq!(request.disk_type, "shared-volume");
        assert_eq!(request.block_size, None);
    }
}
