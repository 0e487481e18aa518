//! Shared AWS SDK setup for the cloud-backed collaborators.
//!
//! The SDK clients are async; the pipeline threads are not. Each backend
//! keeps a [`Handle`] and blocks on it from the calling thread, which must
//! not be a runtime worker thread.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tokio::runtime::Handle;

/// Load credentials and endpoint configuration for `region`.
pub fn load_sdk_config(handle: &Handle, region: &str) -> SdkConfig {
    handle.block_on(
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load(),
    )
}
