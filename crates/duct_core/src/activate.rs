use crate::error::ActivateError;
use crate::pipeline::CompiledPipeline;
use common::types::S3Path;
use log::{debug, info};
use shared_clients::{ObjectStore, ObjectStoreError, RetryPolicy};
use std::path::Path;
use steps::ArtifactSource;
use walkdir::WalkDir;

/// What one activation wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub uploaded: Vec<S3Path>,
    pub definition: S3Path,
}

/// Upload every staged artifact, then the definition document. Uploads run
/// one after another; the first failure stops activation before the
/// definition is written.
pub fn activate(
    pipeline: &CompiledPipeline,
    store: &mut dyn ObjectStore,
    policy: &RetryPolicy,
) -> Result<ActivationReport, ActivateError> {
    info!(
        "activating '{}': {} artifacts to {}",
        pipeline.name,
        pipeline.artifacts.len(),
        store.location()
    );
    let mut uploaded = vec![];
    for artifact in &pipeline.artifacts {
        match &artifact.source {
            ArtifactSource::Inline(body) => {
                upload(policy, &artifact.dest, || store.put_bytes(body.as_bytes(), &artifact.dest))?;
                uploaded.push(artifact.dest.clone());
            }
            ArtifactSource::File(path) => {
                upload(policy, &artifact.dest, || store.put_file(path, &artifact.dest))?;
                uploaded.push(artifact.dest.clone());
            }
            ArtifactSource::Directory(root) => {
                for (local, dest) in directory_entries(root, &artifact.dest)? {
                    upload(policy, &dest, || store.put_file(&local, &dest))?;
                    uploaded.push(dest);
                }
            }
        }
    }

    let definition = pipeline.definition_path();
    let json = pipeline.definition_json()?;
    upload(policy, &definition, || store.put_bytes(json.as_bytes(), &definition))?;
    info!("wrote {definition}");
    Ok(ActivationReport {
        uploaded,
        definition,
    })
}

fn upload(
    policy: &RetryPolicy,
    dest: &S3Path,
    op: impl FnMut() -> Result<(), ObjectStoreError>,
) -> Result<(), ActivateError> {
    debug!("uploading {dest}");
    policy
        .retry(ObjectStoreError::is_transient, op)
        .map_err(|e| ActivateError::store(dest, e))
}

/// Files under `root` in name order, each paired with its place under `dest`.
fn directory_entries(
    root: &Path,
    dest: &S3Path,
) -> Result<Vec<(std::path::PathBuf, S3Path)>, ActivateError> {
    let mut entries = vec![];
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((entry.path().to_path_buf(), dest.join_file(key)));
    }
    Ok(entries)
}
