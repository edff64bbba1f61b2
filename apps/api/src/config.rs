use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
    /// Hour of the local day at which a summary window starts.
    pub day_start_offset_hours: u32,
    /// Fixed offset of the local zone that record keys are written in.
    pub utc_offset_hours: i32,
    pub max_upload_bytes: usize,
    /// Remote mirroring is enabled only when this is set.
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let day_start_offset_hours = parsed("DAY_START_OFFSET_HOURS", "2")
            .parse::<u32>()
            .context("DAY_START_OFFSET_HOURS must be a whole number of hours")?;
        if day_start_offset_hours > 23 {
            bail!("DAY_START_OFFSET_HOURS must be between 0 and 23, got {day_start_offset_hours}");
        }

        let utc_offset_hours = parsed("LOCAL_UTC_OFFSET_HOURS", "9")
            .parse::<i32>()
            .context("LOCAL_UTC_OFFSET_HOURS must be a whole number of hours")?;
        if !(-12..=14).contains(&utc_offset_hours) {
            bail!("LOCAL_UTC_OFFSET_HOURS must be between -12 and 14, got {utc_offset_hours}");
        }

        let max_upload_mb = parsed("MAX_UPLOAD_MB", "64")
            .parse::<usize>()
            .context("MAX_UPLOAD_MB must be a positive integer")?;

        let s3 = match lookup("S3_BUCKET").filter(|b| !b.is_empty()) {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: lookup("S3_ENDPOINT").filter(|e| !e.is_empty()),
                region: parsed("S3_REGION", "us-east-1"),
                access_key_id: require(&lookup, "AWS_ACCESS_KEY_ID")?,
                secret_access_key: require(&lookup, "AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        Ok(Config {
            data_dir: PathBuf::from(parsed("DATA_DIR", "./data")),
            port: parsed("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: parsed("RUST_LOG", "info"),
            day_start_offset_hours,
            utc_offset_hours,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            s3,
        })
    }

    pub fn local_offset(&self) -> chrono::FixedOffset {
        use chrono::Offset;
        chrono::FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or(chrono::Utc.fix())
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.day_start_offset_hours, 2);
        assert_eq!(config.utc_offset_hours, 9);
        assert_eq!(config.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.s3.is_none());
    }

    #[test]
    fn test_rejects_out_of_range_offsets() {
        assert!(config_from(&[("DAY_START_OFFSET_HOURS", "24")]).is_err());
        assert!(config_from(&[("LOCAL_UTC_OFFSET_HOURS", "15")]).is_err());
        assert!(config_from(&[("PORT", "http")]).is_err());
    }

    #[test]
    fn test_s3_requires_credentials() {
        assert!(config_from(&[("S3_BUCKET", "diet-backup")]).is_err());

        let config = config_from(&[
            ("S3_BUCKET", "diet-backup"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("AWS_ACCESS_KEY_ID", "minio"),
            ("AWS_SECRET_ACCESS_KEY", "minio123"),
        ])
        .unwrap();
        let s3 = config.s3.unwrap();
        assert_eq!(s3.bucket, "diet-backup");
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(s3.region, "us-east-1");
    }

    #[test]
    fn test_local_offset() {
        let config = config_from(&[("LOCAL_UTC_OFFSET_HOURS", "-5")]).unwrap();
        assert_eq!(config.local_offset().local_minus_utc(), -5 * 3600);
    }
}
