use conduit_fs::{NormalizedPath, io};
use std::path::PathBuf;

use super::Settings;
use crate::Result;

/// Resolves [`Settings`] by merging the configuration layers
pub struct ConfigResolver {
    data_dir: NormalizedPath,
    /// Replaces `dirs::config_dir()/conduit` when set
    global_config_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(data_dir: impl Into<NormalizedPath>) -> Self {
        Self {
            data_dir: data_dir.into(),
            global_config_dir_override: None,
        }
    }

    /// Use `global_config_dir` instead of the platform config directory.
    pub fn with_global_config_dir(
        data_dir: impl Into<NormalizedPath>,
        global_config_dir: PathBuf,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("conduit"))
    }

    fn layers(&self) -> Vec<NormalizedPath> {
        let mut layers = Vec::new();
        if let Some(global_dir) = self.global_config_dir() {
            layers.push(NormalizedPath::new(global_dir.join("config.toml")));
        }
        layers.push(self.data_dir.join("conduit.toml"));
        layers.push(self.data_dir.join("conduit.local.toml"));
        layers
    }

    /// Merge every existing layer over the defaults.
    ///
    /// Missing layers are skipped; invalid TOML in any layer or an
    /// out-of-range value is an error.
    pub fn resolve(&self) -> Result<Settings> {
        let mut merged = toml::Table::new();

        for path in self.layers() {
            match io::read_text_if_exists(&path)? {
                Some(content) => {
                    tracing::debug!(%path, "Loading config layer");
                    let layer: toml::Table = toml::from_str(&content)?;
                    merge_tables(&mut merged, layer);
                }
                None => tracing::debug!(%path, "No config layer, skipping"),
            }
        }

        let settings: Settings = toml::Value::Table(merged).try_into()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Deep-merge `overlay` into `base`; nested tables merge, other values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_defaults_without_files() {
        let data = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        let settings =
            ConfigResolver::with_global_config_dir(data.path(), global.path().to_path_buf())
                .resolve()
                .unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sync.call_timeout_secs, 30);
        assert_eq!(settings.logs.retention_days, 7);
    }

    #[test]
    fn test_later_layers_override_per_key() {
        let data = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        fs::write(
            global.path().join("config.toml"),
            "[server]\nport = 9000\nhost = \"0.0.0.0\"\n[logs]\nretentionDays = 30\n",
        )
        .unwrap();
        fs::write(data.path().join("conduit.toml"), "[server]\nport = 9100\n").unwrap();
        fs::write(
            data.path().join("conduit.local.toml"),
            "[sync]\nfailFast = true\ncallTimeoutSecs = 5\n",
        )
        .unwrap();

        let settings =
            ConfigResolver::with_global_config_dir(data.path(), global.path().to_path_buf())
                .resolve()
                .unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.logs.retention_days, 30);
        assert!(settings.sync.fail_fast);
        assert_eq!(settings.sync_options().call_timeout.as_secs(), 5);
    }

    #[rstest::rstest]
    #[case("[sync]\ncallTimeoutSecs = 0\n", "sync.callTimeoutSecs")]
    #[case("[sync]\ncallTimeoutSecs = 9223372036854775807\n", "sync.callTimeoutSecs")]
    #[case("[logs]\nretentionDays = 4611686018427387903\n", "logs.retentionDays")]
    #[case("[logs]\nretentionDays = -1\n", "logs.retentionDays")]
    fn test_out_of_range_values_are_rejected(#[case] content: &str, #[case] key: &str) {
        let data = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        fs::write(data.path().join("conduit.toml"), content).unwrap();

        let err = ConfigResolver::with_global_config_dir(data.path(), global.path().to_path_buf())
            .resolve()
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
        assert!(err.to_string().contains(key), "{err}");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let data = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        fs::write(data.path().join("conduit.toml"), "[server\nport = ").unwrap();
        assert!(
            ConfigResolver::with_global_config_dir(data.path(), global.path().to_path_buf())
                .resolve()
                .is_err()
        );
    }
}
