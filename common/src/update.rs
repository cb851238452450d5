use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ManifestError;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateManifest {
    #[serde(default)]
    pub latest: String,
    #[serde(default)]
    pub rollback: Option<String>,
    #[serde(default)]
    pub firmwares: BTreeMap<String, FirmwareEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FirmwareEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareTarget {
    pub version: String,
    pub url: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    UpToDate,
    Install {
        target: FirmwareTarget,
        rollback: Option<FirmwareTarget>,
    },
}

impl UpdateManifest {
    pub fn parse(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    fn target(&self, version: &str) -> Option<FirmwareTarget> {
        let entry = self.firmwares.get(version)?;
        let url = entry.url.trim();
        if url.is_empty() {
            return None;
        }
        Some(FirmwareTarget {
            version: version.to_string(),
            url: url.to_string(),
            sha256: entry.sha256.clone().filter(|digest| !digest.trim().is_empty()),
        })
    }

    /// Decides whether the running firmware should be replaced. The rollback
    /// entry is only offered when it names a different, resolvable version.
    pub fn plan(&self, current_version: &str) -> Result<UpdatePlan, ManifestError> {
        let latest = self.latest.trim();
        if latest.is_empty() {
            return Err(ManifestError::MissingLatest);
        }
        if latest == current_version {
            return Ok(UpdatePlan::UpToDate);
        }

        let target = self
            .target(latest)
            .ok_or_else(|| ManifestError::MissingUrl(latest.to_string()))?;
        let rollback = self
            .rollback
            .as_deref()
            .map(str::trim)
            .filter(|version| !version.is_empty() && *version != latest)
            .and_then(|version| self.target(version));

        Ok(UpdatePlan::Install { target, rollback })
    }
}

pub fn plan_update(manifest_json: &str, current_version: &str) -> Result<UpdatePlan, ManifestError> {
    UpdateManifest::parse(manifest_json)?.plan(current_version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"{
        "latest": "0.2.0",
        "rollback": "0.1.0",
        "firmwares": {
            "0.1.0": { "url": "https://fw.example/heatmat-0.1.0.bin" },
            "0.2.0": { "url": "https://fw.example/heatmat-0.2.0.bin", "sha256": "ABCD" }
        }
    }"#;

    #[test]
    fn same_version_is_up_to_date() {
        assert_eq!(plan_update(MANIFEST, "0.2.0").unwrap(), UpdatePlan::UpToDate);
    }

    #[test]
    fn newer_version_installs_with_rollback() {
        let plan = plan_update(MANIFEST, "0.1.0").unwrap();
        assert_eq!(
            plan,
            UpdatePlan::Install {
                target: FirmwareTarget {
                    version: "0.2.0".to_string(),
                    url: "https://fw.example/heatmat-0.2.0.bin".to_string(),
                    sha256: Some("ABCD".to_string()),
                },
                rollback: Some(FirmwareTarget {
                    version: "0.1.0".to_string(),
                    url: "https://fw.example/heatmat-0.1.0.bin".to_string(),
                    sha256: None,
                }),
            }
        );
    }

    #[test]
    fn missing_latest_is_rejected() {
        let err = plan_update(r#"{"firmwares": {}}"#, "0.1.0").unwrap_err();
        assert!(matches!(err, ManifestError::MissingLatest));
    }

    #[test]
    fn latest_without_url_is_rejected() {
        let err = plan_update(
            r#"{"latest": "0.3.0", "firmwares": {"0.3.0": {"url": ""}}}"#,
            "0.1.0",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingUrl(version) if version == "0.3.0"));
    }

    #[test]
    fn unresolvable_rollback_is_dropped() {
        let plan = plan_update(
            r#"{"latest": "0.3.0", "rollback": "0.0.9",
                "firmwares": {"0.3.0": {"url": "http://x/fw.bin"}}}"#,
            "0.1.0",
        )
        .unwrap();
        assert!(matches!(plan, UpdatePlan::Install { rollback: None, .. }));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            plan_update("not json", "0.1.0"),
            Err(ManifestError::Json(_))
        ));
    }
}
