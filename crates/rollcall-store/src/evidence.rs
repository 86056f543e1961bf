//! Content-addressed filesystem storage for evidence images.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use rollcall_core::store::{EvidenceStore, StoredEvidence};

use crate::{Error, Result};

/// Length of the content-hash prefix used as the filename stem.
const REF_HASH_LEN: usize = 16;

/// Evidence store writing images under a single root directory.
///
/// References are derived from the image content (SHA-256 prefix plus
/// extension), so re-storing identical bytes yields the same reference
/// and never duplicates the file. Writes go through a temporary file and
/// a rename, so a partially written image never becomes visible.
#[derive(Clone)]
pub struct FsEvidenceStore {
    root: PathBuf,
}

impl FsEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of a stored reference.
    pub fn path_for(&self, evidence_ref: &str) -> PathBuf {
        self.root.join(evidence_ref)
    }

    fn make_ref(bytes: &[u8], extension: &str) -> String {
        let digest = Sha256::digest(bytes);
        let hex: String = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();
        format!("{}.{extension}", &hex[..REF_HASH_LEN])
    }
}

impl EvidenceStore for FsEvidenceStore {
    type Error = Error;

    async fn store(&self, bytes: &[u8], extension: &str) -> Result<StoredEvidence> {
        let evidence_ref = Self::make_ref(bytes, extension);
        let final_path = self.path_for(&evidence_ref);

        tokio::fs::create_dir_all(&self.root).await?;

        if tokio::fs::try_exists(&final_path).await? {
            // Same content already stored under this reference; the
            // earlier write owns the file.
            return Ok(StoredEvidence {
                evidence_ref,
                created: false,
            });
        }

        let tmp_path = final_path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(Error::Io(e));
        }

        tracing::debug!(evidence_ref = %evidence_ref, size = bytes.len(), "evidence stored");
        Ok(StoredEvidence {
            evidence_ref,
            created: true,
        })
    }

    async fn remove(&self, evidence_ref: &str) -> Result<()> {
        // Refuse path traversal through a crafted reference.
        if Path::new(evidence_ref).components().count() != 1 {
            return Ok(());
        }
        match tokio::fs::remove_file(self.path_for(evidence_ref)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> FsEvidenceStore {
        let dir = std::env::temp_dir().join(format!("rollcall-evidence-{tag}-{}", uuid::Uuid::new_v4()));
        FsEvidenceStore::new(dir)
    }

    #[tokio::test]
    async fn store_writes_file_and_ref_is_content_addressed() {
        let store = temp_store("basic");
        let r1 = store.store(b"image-bytes", "jpg").await.unwrap();
        let r2 = store.store(b"image-bytes", "jpg").await.unwrap();
        assert_eq!(r1.evidence_ref, r2.evidence_ref);
        assert!(r1.evidence_ref.ends_with(".jpg"));
        assert!(store.path_for(&r1.evidence_ref).exists());

        let other = store.store(b"different", "jpg").await.unwrap();
        assert_ne!(r1.evidence_ref, other.evidence_ref);
    }

    #[tokio::test]
    async fn duplicate_content_is_not_reported_as_created() {
        let store = temp_store("dedup");
        let first = store.store(b"same-bytes", "jpg").await.unwrap();
        assert!(first.created);

        // The second write dedupes; it does not own the file.
        let second = store.store(b"same-bytes", "jpg").await.unwrap();
        assert!(!second.created);
        assert_eq!(first.evidence_ref, second.evidence_ref);
    }

    #[tokio::test]
    async fn remove_deletes_and_tolerates_missing() {
        let store = temp_store("remove");
        let r = store.store(b"to-remove", "png").await.unwrap();
        store.remove(&r.evidence_ref).await.unwrap();
        assert!(!store.path_for(&r.evidence_ref).exists());
        // A second remove is a no-op.
        store.remove(&r.evidence_ref).await.unwrap();
    }
}
