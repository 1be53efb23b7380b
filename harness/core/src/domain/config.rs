// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Harness Configuration Types
//
// Defines the configuration manifest for a checkfiles node, including:
// - Manifest format (apiVersion/kind/metadata/spec)
// - Portal endpoint and submitter credentials
// - Check pipeline paths and external tool locations
// - Watch-mode cadence and metrics endpoint
// - Chat notification settings and report sinks

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "CheckfilesConfig";

/// Top-level configuration manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CheckfilesConfig")
    pub kind: String,

    /// Node metadata (name, labels)
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Harness configuration specification
    #[serde(default)]
    pub spec: HarnessSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    #[serde(default)]
    pub name: String,

    /// Optional: labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessSpec {
    #[serde(default)]
    pub portal: PortalSettings,

    #[serde(default)]
    pub checks: CheckSettings,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub notify: NotifySettings,

    #[serde(default)]
    pub reports: ReportSettings,
}

/// Portal endpoint and the submitter key pair used for basic auth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalSettings {
    /// Base URL of the metadata portal
    #[serde(default)]
    pub url: String,

    /// Access key id (HTTP username)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Secret access key (HTTP password)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSettings {
    /// Where the object store is mounted
    #[serde(default = "default_mirror")]
    pub mirror: PathBuf,

    /// Reference data (chrom.sizes, autosql schemas) for validateFiles
    #[serde(default = "default_enc_valdata")]
    pub enc_valdata: PathBuf,

    /// File search query selecting what to check
    #[serde(default = "default_search_query")]
    pub search_query: String,

    /// Check files whose upload credentials have not yet expired
    /// (they may be replaced mid-check!)
    #[serde(default)]
    pub include_unexpired_upload: bool,

    /// Concurrent checks per batch; defaults to available cores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default = "default_validate_files_bin")]
    pub validate_files_bin: String,

    #[serde(default = "default_samtools_bin")]
    pub samtools_bin: String,

    #[serde(default)]
    pub crispr: CrisprSettings,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            mirror: default_mirror(),
            enc_valdata: default_enc_valdata(),
            search_query: default_search_query(),
            include_unexpired_upload: false,
            workers: None,
            validate_files_bin: default_validate_files_bin(),
            samtools_bin: default_samtools_bin(),
            crispr: CrisprSettings::default(),
        }
    }
}

/// External scripts for CRISPR guide quantification checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisprSettings {
    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    #[serde(default = "default_guide_script")]
    pub guide_script: PathBuf,

    #[serde(default = "default_pam_script")]
    pub pam_script: PathBuf,

    #[serde(default = "default_guide_format")]
    pub guide_format: PathBuf,

    #[serde(default = "default_genome_reference")]
    pub genome_reference: PathBuf,
}

impl Default for CrisprSettings {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            guide_script: default_guide_script(),
            pam_script: default_pam_script(),
            guide_format: default_guide_format(),
            genome_reference: default_genome_reference(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Fixed sleep between polling cycles
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,

    /// Prometheus exporter port for watch mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySettings {
    /// Slack bot token; notification is disabled without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel: default_channel(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Report file for all rows; stdout when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<PathBuf>,

    /// Report file for rows with errors; stderr when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<PathBuf>,

    /// Emit JSON lines instead of tab rows
    #[serde(default)]
    pub json_out: bool,
}

fn default_mirror() -> PathBuf {
    PathBuf::from("/s3")
}

fn default_enc_valdata() -> PathBuf {
    PathBuf::from("/opt/encValData")
}

fn default_search_query() -> String {
    "status=uploading".to_owned()
}

fn default_validate_files_bin() -> String {
    "validateFiles".to_owned()
}

fn default_samtools_bin() -> String {
    "samtools".to_owned()
}

fn default_python_bin() -> String {
    "python3".to_owned()
}

fn default_guide_script() -> PathBuf {
    PathBuf::from("/opt/ENCODE_CRISPR_Validation/check_guide_quant_format.py")
}

fn default_pam_script() -> PathBuf {
    PathBuf::from("/opt/ENCODE_CRISPR_Validation/check_PAM.py")
}

fn default_guide_format() -> PathBuf {
    PathBuf::from("/opt/ENCODE_CRISPR_Validation/guide_quant_format.txt")
}

fn default_genome_reference() -> PathBuf {
    PathBuf::from("/opt/GRCh38_no_alt_analysis_set_GCA_000001405.15.fasta")
}

fn default_interval() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_channel() -> String {
    "#bot-reporting".to_owned()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config kind is {found:?}, expected {KIND:?}")]
    WrongKind { found: String },

    #[error("config apiVersion is {found:?}, expected {API_VERSION:?}")]
    WrongApiVersion { found: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Default for ConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: KIND.to_owned(),
            metadata: ManifestMetadata::default(),
            spec: HarnessSpec::default(),
        }
    }
}

impl ConfigManifest {
    /// Load from an explicit path, or the first discovered location, or
    /// defaults when nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        for candidate in Self::discovery_paths() {
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn discovery_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("checkfiles.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("checkfiles").join("config.yml"));
        }
        paths
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let manifest: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind != KIND {
            return Err(ConfigError::WrongKind {
                found: self.kind.clone(),
            });
        }
        if self.api_version != API_VERSION {
            return Err(ConfigError::WrongApiVersion {
                found: self.api_version.clone(),
            });
        }
        if !self.spec.portal.url.is_empty() {
            url::Url::parse(&self.spec.portal.url)
                .map_err(|e| ConfigError::Invalid(format!("portal.url: {e}")))?;
        }
        if self.spec.watch.interval.is_zero() {
            return Err(ConfigError::Invalid("watch.interval must be > 0".into()));
        }
        if self.spec.checks.workers == Some(0) {
            return Err(ConfigError::Invalid("checks.workers must be > 0".into()));
        }
        Ok(())
    }

    /// Worker count for a batch, defaulting to available cores.
    pub fn workers(&self) -> usize {
        self.spec.checks.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        })
    }

    /// A commented starter manifest for `config generate`.
    pub fn example_yaml() -> String {
        let defaults = Self {
            metadata: ManifestMetadata {
                name: "checkfiles-demo".to_owned(),
                labels: None,
            },
            ..Self::default()
        };
        let body = serde_yaml::to_string(&defaults).unwrap_or_default();
        format!(
            "# checkfiles harness configuration.\n\
             # Credentials can also come from CHECKFILES_ACCESS_KEY_ID /\n\
             # CHECKFILES_SECRET_ACCESS_KEY or command-line flags.\n\
             {body}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let manifest = ConfigManifest::default();
        manifest.validate().unwrap();
        assert_eq!(manifest.spec.checks.mirror, PathBuf::from("/s3"));
        assert_eq!(manifest.spec.watch.interval, Duration::from_secs(1800));
        assert_eq!(manifest.spec.notify.channel, "#bot-reporting");
    }

    #[test]
    fn example_round_trips() {
        let yaml = ConfigManifest::example_yaml();
        let parsed: ConfigManifest = serde_yaml::from_str(&yaml).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.metadata.name, "checkfiles-demo");
    }

    #[test]
    fn interval_accepts_humantime() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: CheckfilesConfig
metadata:
  name: demo
spec:
  watch:
    interval: 15m
"#;
        let parsed: ConfigManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.spec.watch.interval, Duration::from_secs(900));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: SomethingElse
metadata:
  name: demo
"#;
        let parsed: ConfigManifest = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(ConfigError::WrongKind { .. })
        ));
    }

    #[test]
    fn bad_portal_url_is_rejected() {
        let mut manifest = ConfigManifest::default();
        manifest.spec.portal.url = "not a url".to_owned();
        assert!(matches!(
            manifest.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
