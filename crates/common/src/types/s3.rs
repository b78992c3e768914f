use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Location in the object store. Directories always render with a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct S3Path {
    pub bucket: String,
    pub key: String,
    pub is_directory: bool,
}

impl S3Path {
    pub fn directory(bucket: impl Into<String>, key: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.as_ref().trim_matches('/').to_string(),
            is_directory: true,
        }
    }

    pub fn file(bucket: impl Into<String>, key: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.as_ref().trim_start_matches('/').to_string(),
            is_directory: false,
        }
    }

    /// Parse an `s3://bucket/key` URI; a trailing slash marks a directory.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| ConfigError::invalid(format!("'{uri}' is not an s3:// URI")))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(ConfigError::invalid(format!("'{uri}' has no bucket")));
        }
        if key.is_empty() || key.ends_with('/') {
            Ok(Self::directory(bucket, key))
        } else {
            Ok(Self::file(bucket, key))
        }
    }

    /// Append path components below this directory.
    pub fn join_dir(&self, part: impl AsRef<str>) -> Self {
        Self::directory(self.bucket.clone(), self.joined_key(part.as_ref()))
    }

    pub fn join_file(&self, part: impl AsRef<str>) -> Self {
        Self::file(self.bucket.clone(), self.joined_key(part.as_ref()))
    }

    fn joined_key(&self, part: &str) -> String {
        let part = part.trim_matches('/');
        if self.key.is_empty() {
            part.to_string()
        } else {
            format!("{}/{}", self.key, part)
        }
    }

    pub fn uri(&self) -> String {
        match (self.is_directory, self.key.is_empty()) {
            (_, true) => format!("s3://{}/", self.bucket),
            (true, false) => format!("s3://{}/{}/", self.bucket, self.key),
            (false, false) => format!("s3://{}/{}", self.bucket, self.key),
        }
    }

    /// Final path component, without the trailing slash.
    pub fn base_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or_default()
    }
}

impl Display for S3Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_render_with_trailing_slash() {
        let root = S3Path::directory("bucket", "/dev/etl/");
        assert_eq!(root.uri(), "s3://bucket/dev/etl/");
        let step = root.join_dir("src").join_dir("pipe/version_1");
        assert_eq!(step.uri(), "s3://bucket/dev/etl/src/pipe/version_1/");
        assert_eq!(step.join_file("run.sh").uri(), "s3://bucket/dev/etl/src/pipe/version_1/run.sh");
    }

    #[test]
    fn parses_uris() {
        let file = S3Path::from_uri("s3://bucket/a/b.tsv").unwrap();
        assert!(!file.is_directory);
        assert_eq!(file.base_name(), "b.tsv");
        let dir = S3Path::from_uri("s3://bucket/a/").unwrap();
        assert!(dir.is_directory);
        assert_eq!(dir.key, "a");
        assert!(S3Path::from_uri("/local/path").is_err());
    }
}
