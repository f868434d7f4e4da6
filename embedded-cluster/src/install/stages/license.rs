//! Stage: license check.

use crate::bundle::ReleaseBundle;
use crate::license::{License, check_license_matches};
use embedded_cluster_shared::errors::ClusterResult;
use std::path::Path;

/// Load the license at `path` (if any) and match it against the release.
pub fn run(release: &ReleaseBundle, path: Option<&Path>) -> ClusterResult<Option<License>> {
    let channel = release.channel_release()?;
    let license = path.map(License::load).transpose()?;
    check_license_matches(channel.as_ref(), license.as_ref())?;
    Ok(license)
}
