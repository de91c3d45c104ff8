use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings read from a JSON file, e.g.
///
/// ```json
/// { "adapter": "hci0", "device": "HC-05" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// BlueZ adapter name; the default adapter when absent.
    pub adapter: Option<String>,
    /// Fixed RFCOMM channel. When absent the channel is found through
    /// service discovery.
    pub channel: Option<u8>,
    /// Address or name of the device to use when none is given.
    pub device: Option<String>,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read config file `{}`", path.display()))?;
        Self::from_slice(&file)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("failed to parse config")
    }

    /// Values set in `other` replace the ones in `self`.
    pub fn merge(self, other: Config) -> Config {
        Config {
            adapter: other.adapter.or(self.adapter),
            channel: other.channel.or(self.channel),
            device: other.device.or(self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial() {
        let cfg = Config::from_slice(br#"{ "device": "HC-05" }"#).unwrap();
        assert_eq!(
            cfg,
            Config {
                device: Some("HC-05".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(Config::from_slice(b"{}").unwrap(), Config::default());
    }

    #[test]
    fn reject_unknown_keys() {
        assert!(Config::from_slice(br#"{ "baud": 9600 }"#).is_err());
        assert!(Config::from_slice(br#"{ "channel": 300 }"#).is_err());
    }

    #[test]
    fn later_values_win() {
        let file = Config {
            adapter: Some("hci0".to_string()),
            channel: Some(1),
            device: Some("HC-05".to_string()),
        };
        let args = Config {
            device: Some("98:D3:31:F5:2A:11".to_string()),
            ..Default::default()
        };
        let cfg = file.merge(args);
        assert_eq!(cfg.adapter.as_deref(), Some("hci0"));
        assert_eq!(cfg.channel, Some(1));
        assert_eq!(cfg.device.as_deref(), Some("98:D3:31:F5:2A:11"));
    }

    #[tokio::test]
    async fn missing_file() {
        let err = Config::load("/nonexistent/rover.json").await.unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
