//! Application license handling.
//!
//! Only the fields the bootstrap needs are read; everything else in the
//! license document is ignored.

use crate::bundle::ChannelRelease;
use embedded_cluster_shared::errors::{ClusterError, ClusterResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct License {
    pub spec: LicenseSpec,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSpec {
    #[serde(default)]
    pub app_slug: String,
    #[serde(default, rename = "channelID")]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    /// Vendor API endpoint, also used as the metrics base URL
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, rename = "licenseID")]
    pub license_id: String,
}

impl License {
    pub fn parse(raw: &str) -> ClusterResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| ClusterError::License(e.to_string()))
    }

    pub fn load(path: &Path) -> ClusterResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::License(format!(
                "unable to read the license file at {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&raw).map_err(|e| {
            ClusterError::License(format!(
                "unable to parse the license file at {}, please ensure it is not corrupt: {e}",
                path.display()
            ))
        })
    }
}

/// Check that the license (if any) belongs to the release (if any).
///
/// No release and no license is fine. Either one without the other is an
/// error, as is a license for a different app or channel.
pub fn check_license_matches(
    release: Option<&ChannelRelease>,
    license: Option<&License>,
) -> ClusterResult<()> {
    let (release, license) = match (release, license) {
        (None, None) => return Ok(()),
        (None, Some(_)) => {
            return Err(ClusterError::License(
                "a license was provided but no release was found in binary, please rerun without the license flag".into(),
            ));
        }
        (Some(release), None) => {
            return Err(ClusterError::License(format!(
                "no license was provided for {} and one is required, please rerun with '--license <path to license file>'",
                release.app_slug
            )));
        }
        (Some(release), Some(license)) => (release, license),
    };

    if release.app_slug != license.spec.app_slug {
        return Err(ClusterError::License(format!(
            "license app {} does not match binary app {}, please provide the correct license",
            license.spec.app_slug, release.app_slug
        )));
    }
    if release.channel_id != license.spec.channel_id {
        return Err(ClusterError::License(format!(
            "license channel {} ({}) does not match binary channel {}, please provide the correct license",
            license.spec.channel_id, license.spec.channel_name, release.channel_id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> ChannelRelease {
        ChannelRelease {
            app_slug: "my-app".into(),
            channel_id: "ch-1".into(),
            channel_slug: "stable".into(),
            version_label: "1.0.0".into(),
        }
    }

    fn license(app: &str, channel: &str) -> License {
        License {
            spec: LicenseSpec {
                app_slug: app.into(),
                channel_id: channel.into(),
                channel_name: "Stable".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_release_no_license_is_ok() {
        check_license_matches(None, None).unwrap();
    }

    #[test]
    fn test_license_without_release() {
        let err = check_license_matches(None, Some(&license("my-app", "ch-1"))).unwrap_err();
        assert!(err.to_string().contains("no release was found"));
    }

    #[test]
    fn test_release_without_license() {
        let err = check_license_matches(Some(&release()), None).unwrap_err();
        assert!(err.to_string().contains("no license was provided for my-app"));
    }

    #[test]
    fn test_mismatches() {
        let rel = release();
        let err = check_license_matches(Some(&rel), Some(&license("other", "ch-1"))).unwrap_err();
        assert!(err.to_string().contains("license app other"));

        let err = check_license_matches(Some(&rel), Some(&license("my-app", "ch-2"))).unwrap_err();
        assert!(err.to_string().contains("license channel ch-2 (Stable)"));

        check_license_matches(Some(&rel), Some(&license("my-app", "ch-1"))).unwrap();
    }

    #[test]
    fn test_parse_license_document() {
        let raw = r#"
apiVersion: kots.io/v1beta1
kind: License
spec:
  appSlug: my-app
  channelID: ch-1
  channelName: Stable
  endpoint: https://replicated.app
  licenseID: abc
  customerName: ignored
"#;
        let lic = License::parse(raw).unwrap();
        assert_eq!(lic.spec.app_slug, "my-app");
        assert_eq!(lic.spec.endpoint, "https://replicated.app");
        assert_eq!(lic.spec.license_id, "abc");
    }

    #[test]
    fn test_load_missing_file() {
        let err = License::load(Path::new("/nonexistent/license.yaml")).unwrap_err();
        assert!(matches!(err, ClusterError::License(_)));
    }
}
