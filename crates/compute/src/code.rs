//! Where a function's code comes from.
//!
//! Packaging (installing dependencies into an output directory and copying the
//! sources next to them) is performed by an external bundler. The graph only
//! records what to bundle and where the bundle will be staged.

use std::path::PathBuf;

use serde_json::{Value, json};

use stackgraph_core::{GraphError, GraphResult};

/// Container image + command used by the external bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundling {
    pub image: String,
    pub command: Vec<String>,
}

impl Bundling {
    /// Install declared dependencies into the output directory, then copy the sources.
    pub fn pip_install(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: vec![
                "bash".to_string(),
                "-c".to_string(),
                "pip install -r requirements.txt -t /asset-output && cp -au . /asset-output"
                    .to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// Local directory bundled by the external packaging step and staged at
    /// `bucket/key`.
    Asset {
        path: PathBuf,
        bundling: Option<Bundling>,
        bucket: String,
        key: String,
    },
    /// An already uploaded archive.
    Object { bucket: String, key: String },
}

impl Code {
    pub fn asset(
        path: impl Into<PathBuf>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> GraphResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(GraphError::validation("asset path cannot be empty"));
        }
        let (bucket, key) = validate_location(bucket.into(), key.into())?;
        Ok(Self::Asset {
            path,
            bundling: None,
            bucket,
            key,
        })
    }

    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> GraphResult<Self> {
        let (bucket, key) = validate_location(bucket.into(), key.into())?;
        Ok(Self::Object { bucket, key })
    }

    /// Attach bundling instructions; no-op for pre-built objects.
    pub fn with_bundling(self, bundling: Bundling) -> Self {
        match self {
            Code::Asset {
                path, bucket, key, ..
            } => Code::Asset {
                path,
                bundling: Some(bundling),
                bucket,
                key,
            },
            other => other,
        }
    }

    pub(crate) fn properties(&self) -> Value {
        match self {
            Code::Asset { bucket, key, .. } | Code::Object { bucket, key } => {
                json!({ "S3Bucket": bucket, "S3Key": key })
            }
        }
    }

    /// Resource metadata consumed by the external asset publisher.
    pub(crate) fn metadata(&self) -> Option<Value> {
        match self {
            Code::Asset { path, bundling, .. } => {
                let mut meta = json!({
                    "aws:asset:path": path.display().to_string(),
                    "aws:asset:property": "Code",
                });
                if let Some(b) = bundling {
                    meta["aws:asset:bundling"] = json!({ "image": b.image, "command": b.command });
                }
                Some(meta)
            }
            Code::Object { .. } => None,
        }
    }
}

fn validate_location(bucket: String, key: String) -> GraphResult<(String, String)> {
    if bucket.trim().is_empty() {
        return Err(GraphError::validation("code bucket cannot be empty"));
    }
    if key.trim().is_empty() {
        return Err(GraphError::validation("code key cannot be empty"));
    }
    Ok((bucket, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_metadata_records_bundling() {
        let code = Code::asset("hello_world", "assets", "items/handler.zip")
            .unwrap()
            .with_bundling(Bundling::pip_install("public.ecr.aws/sam/build-python3.9"));

        assert_eq!(
            code.properties(),
            json!({ "S3Bucket": "assets", "S3Key": "items/handler.zip" })
        );
        let meta = code.metadata().unwrap();
        assert_eq!(meta["aws:asset:path"], json!("hello_world"));
        assert_eq!(meta["aws:asset:bundling"]["command"][0], json!("bash"));
    }

    #[test]
    fn objects_have_no_asset_metadata() {
        let code = Code::object("artifacts", "handler.zip").unwrap();
        assert!(code.metadata().is_none());
        assert_eq!(code.clone().with_bundling(Bundling::pip_install("img")), code);
    }

    #[test]
    fn empty_locations_are_rejected() {
        assert!(Code::asset("", "b", "k").is_err());
        assert!(Code::object(" ", "k").is_err());
        assert!(Code::object("b", "").is_err());
    }
}
