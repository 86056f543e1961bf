//! The attendance engine service.
//!
//! One [`Engine`] serves independent concurrent requests; all durable
//! state lives in the store, so there is no shared mutable state here.
//! Evidence images are written only after identity resolution succeeds,
//! and are removed again when the subsequent record write is rejected,
//! so no orphaned evidence can accumulate.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use rollcall_core::{
    compare::compare,
    enroll::average,
    status::{status_for_check_in, AttendanceStatus},
    store::{
        AttendanceStore, CheckInInsert, EvidenceStore, IdentityRegistry, NewCheckIn,
        StoredEvidence, TemplateStore,
    },
    types::{Descriptor, Identity},
};

use crate::{
    config::EngineConfig,
    error::EngineError,
    extract::{decode_image, EmbeddingExtractor},
    matcher::{find_best, MatchOutcome},
};

/// Identity fields echoed back in receipts.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityRef {
    pub identity_id: Uuid,
    pub code: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSummary {
    pub identity: IdentityRef,
    /// Dimension of the stored template vector.
    pub dim: usize,
    pub images_received: usize,
    pub images_used: usize,
    pub images_invalid: usize,
    pub evidence_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub record_id: Uuid,
    pub identity: IdentityRef,
    pub status: AttendanceStatus,
    pub checked_in_at: DateTime<Utc>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutReceipt {
    pub record_id: Uuid,
    pub identity: IdentityRef,
    pub checked_in_at: DateTime<Utc>,
    pub checked_out_at: DateTime<Utc>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Verification {
    pub verified: bool,
    pub similarity: f32,
}

/// Biometric attendance engine over an extractor, a store backend and
/// an evidence store.
pub struct Engine<X, S, V> {
    extractor: X,
    store: S,
    evidence: V,
    config: EngineConfig,
}

impl<X, S, V> Engine<X, S, V>
where
    X: EmbeddingExtractor,
    S: IdentityRegistry + TemplateStore + AttendanceStore,
    V: EvidenceStore,
{
    pub fn new(extractor: X, store: S, evidence: V, config: EngineConfig) -> Self {
        Self {
            extractor,
            store,
            evidence,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Enrollment ───────────────────────────────────────────────────

    /// Enroll an identity from several captured images.
    ///
    /// Images failing extraction are counted as invalid and skipped;
    /// the first image that yields a descriptor is retained as the
    /// template's representative evidence.
    pub async fn enroll(
        &self,
        code: &str,
        images: &[Vec<u8>],
    ) -> Result<EnrollmentSummary, EngineError> {
        self.require_samples(images.len())?;
        let identity = self.require_identity(code).await?;

        let mut valid = Vec::new();
        let mut first_valid: Option<usize> = None;
        for (i, bytes) in images.iter().enumerate() {
            let img = match decode_image(bytes) {
                Ok(img) => img,
                Err(e) => {
                    tracing::warn!(code = %code, index = i, error = %e, "enrollment image rejected");
                    continue;
                }
            };
            match self.extractor.extract(&img).await {
                Ok(d) => {
                    first_valid.get_or_insert(i);
                    valid.push(d);
                }
                Err(e) => {
                    tracing::warn!(code = %code, index = i, error = %e, "enrollment image yielded no descriptor");
                }
            }
        }

        let evidence = first_valid.map(|i| images[i].as_slice());
        self.finish_enroll(identity, valid, images.len(), evidence)
            .await
    }

    /// Enroll from descriptors precomputed by the capture client.
    pub async fn enroll_with_descriptors(
        &self,
        code: &str,
        descriptors: Vec<Descriptor>,
    ) -> Result<EnrollmentSummary, EngineError> {
        self.require_samples(descriptors.len())?;
        let identity = self.require_identity(code).await?;
        let received = descriptors.len();
        self.finish_enroll(identity, descriptors, received, None)
            .await
    }

    async fn finish_enroll(
        &self,
        identity: Identity,
        valid: Vec<Descriptor>,
        images_received: usize,
        evidence_bytes: Option<&[u8]>,
    ) -> Result<EnrollmentSummary, EngineError> {
        let Some(template) = average(&valid) else {
            return Err(EngineError::EnrollmentFailed { images_received });
        };

        let evidence = self.store_evidence(evidence_bytes).await?;
        let evidence_ref = evidence.as_ref().map(|e| e.evidence_ref.clone());

        let upserted = self
            .store
            .upsert_template(identity.identity_id, &template, evidence_ref.as_deref())
            .await;
        let stored = match upserted {
            Ok(t) => t,
            Err(e) => {
                self.discard_evidence(evidence.as_ref()).await;
                return Err(EngineError::store(e));
            }
        };

        tracing::info!(
            code = %identity.code,
            dim = stored.descriptor.dim(),
            images_used = valid.len(),
            images_received,
            "template enrolled"
        );

        Ok(EnrollmentSummary {
            identity: identity_ref(&identity),
            dim: stored.descriptor.dim(),
            images_received,
            images_used: valid.len(),
            images_invalid: images_received - valid.len(),
            evidence_ref,
        })
    }

    // ── Attendance transitions ───────────────────────────────────────

    /// Resolve the face in `image` and check the matched identity in.
    pub async fn check_in(
        &self,
        image: &[u8],
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckInReceipt, EngineError> {
        let probe = self.extract_probe(image).await?;
        self.check_in_at(&probe, Local::now(), Some(image), location, notes)
            .await
    }

    /// Check in from a descriptor precomputed by the capture client.
    pub async fn check_in_with_descriptor(
        &self,
        probe: &Descriptor,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckInReceipt, EngineError> {
        self.check_in_at(probe, Local::now(), None, location, notes)
            .await
    }

    /// Check-in transition at an explicit capture time.
    ///
    /// The local time decides both the calendar day of the record and
    /// the present/late status; the status is fixed here and never
    /// recomputed.
    pub async fn check_in_at(
        &self,
        probe: &Descriptor,
        at: DateTime<Local>,
        evidence: Option<&[u8]>,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckInReceipt, EngineError> {
        let (identity, similarity) = self.resolve(probe).await?;
        let day = at.date_naive();

        // A completed record means today is done; check-in is not
        // re-openable through this engine.
        if let Some(done) = self
            .store
            .find_completed_record(identity.identity_id, day)
            .await
            .map_err(EngineError::store)?
        {
            return Err(EngineError::AlreadyCheckedIn {
                since: done.check_in,
            });
        }

        let stored_evidence = self.store_evidence(evidence).await?;
        let status = status_for_check_in(at.time(), self.config.late_cutoff);
        let check_in = at.with_timezone(&Utc);

        let inserted = self
            .store
            .insert_check_in(NewCheckIn {
                identity_id: identity.identity_id,
                day,
                check_in,
                evidence_ref: stored_evidence.as_ref().map(|e| e.evidence_ref.clone()),
                status,
                location,
                notes,
            })
            .await;

        let record = match inserted {
            Ok(CheckInInsert::Created(record)) => record,
            Ok(CheckInInsert::OpenRecordExists) => {
                self.discard_evidence(stored_evidence.as_ref()).await;
                let since = self
                    .store
                    .find_open_record(identity.identity_id, day)
                    .await
                    .map_err(EngineError::store)?
                    .map(|r| r.check_in)
                    .unwrap_or(check_in);
                return Err(EngineError::AlreadyCheckedIn { since });
            }
            Err(e) => {
                self.discard_evidence(stored_evidence.as_ref()).await;
                return Err(EngineError::store(e));
            }
        };

        tracing::info!(
            code = %identity.code,
            status = %status,
            similarity,
            "check-in recorded"
        );

        Ok(CheckInReceipt {
            record_id: record.record_id,
            identity,
            status,
            checked_in_at: record.check_in,
            similarity,
        })
    }

    /// Resolve the face in `image` and check the matched identity out.
    pub async fn check_out(
        &self,
        image: &[u8],
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckOutReceipt, EngineError> {
        let probe = self.extract_probe(image).await?;
        self.check_out_at(&probe, Local::now(), Some(image), location, notes)
            .await
    }

    /// Check out from a descriptor precomputed by the capture client.
    pub async fn check_out_with_descriptor(
        &self,
        probe: &Descriptor,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckOutReceipt, EngineError> {
        self.check_out_at(probe, Local::now(), None, location, notes)
            .await
    }

    /// Check-out transition at an explicit capture time. The record's
    /// status is left untouched.
    pub async fn check_out_at(
        &self,
        probe: &Descriptor,
        at: DateTime<Local>,
        evidence: Option<&[u8]>,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckOutReceipt, EngineError> {
        let (identity, similarity) = self.resolve(probe).await?;
        let day = at.date_naive();

        let open = self
            .store
            .find_open_record(identity.identity_id, day)
            .await
            .map_err(EngineError::store)?
            .ok_or(EngineError::NotCheckedIn)?;

        // A closed record must span forward in time; a stale or
        // backwards clock never produces check_out <= check_in.
        let check_out = at.with_timezone(&Utc);
        if check_out <= open.check_in {
            return Err(EngineError::CheckOutNotAfterCheckIn {
                check_in: open.check_in,
                check_out,
            });
        }

        let stored_evidence = self.store_evidence(evidence).await?;

        let closed = self
            .store
            .complete_check_out(
                open.record_id,
                check_out,
                stored_evidence.as_ref().map(|e| e.evidence_ref.as_str()),
                location.as_deref(),
                notes.as_deref(),
            )
            .await;
        let record = match closed {
            Ok(r) => r,
            Err(e) => {
                self.discard_evidence(stored_evidence.as_ref()).await;
                return Err(EngineError::store(e));
            }
        };

        tracing::info!(code = %identity.code, similarity, "check-out recorded");

        Ok(CheckOutReceipt {
            record_id: record.record_id,
            identity,
            checked_in_at: record.check_in,
            checked_out_at: check_out,
            similarity,
        })
    }

    // ── Verification ─────────────────────────────────────────────────

    /// One-to-one verification of `image` against one identity's
    /// enrolled template.
    pub async fn verify(&self, code: &str, image: &[u8]) -> Result<Verification, EngineError> {
        let probe = self.extract_probe(image).await?;
        self.verify_with_descriptor(code, &probe).await
    }

    pub async fn verify_with_descriptor(
        &self,
        code: &str,
        probe: &Descriptor,
    ) -> Result<Verification, EngineError> {
        let identity = self.require_identity(code).await?;
        let template = self
            .store
            .get_template(identity.identity_id)
            .await
            .map_err(EngineError::store)?
            .ok_or_else(|| EngineError::IdentityHasNoTemplate(code.to_string()))?;

        let comparison = compare(
            probe,
            &template.descriptor,
            self.config.metric,
            self.config.threshold,
        )?;

        tracing::info!(
            code = %code,
            similarity = comparison.similarity,
            verified = comparison.is_match,
            "one-to-one verification"
        );

        Ok(Verification {
            verified: comparison.is_match,
            similarity: comparison.similarity,
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn extract_probe(&self, image: &[u8]) -> Result<Descriptor, EngineError> {
        let img = decode_image(image)?;
        Ok(self.extractor.extract(&img).await?)
    }

    /// One-to-many resolution via the gallery matcher. An unresolved
    /// outcome is a normal negative result carrying the closest-miss
    /// similarity for diagnostics.
    async fn resolve(&self, probe: &Descriptor) -> Result<(IdentityRef, f32), EngineError> {
        let gallery = self
            .store
            .list_gallery(true)
            .await
            .map_err(EngineError::store)?;

        match find_best(probe, gallery, &self.config.match_config()).await {
            MatchOutcome::Match {
                identity_id,
                code,
                display_name,
                similarity,
            } => Ok((
                IdentityRef {
                    identity_id,
                    code,
                    display_name,
                },
                similarity,
            )),
            MatchOutcome::Unresolved { highest_similarity } => {
                Err(EngineError::FaceNotRecognized {
                    highest_similarity,
                    threshold: self.config.threshold,
                })
            }
        }
    }

    fn require_samples(&self, received: usize) -> Result<(), EngineError> {
        let required = self.config.min_enroll_samples;
        if received < required {
            return Err(EngineError::NotEnoughSamples { received, required });
        }
        Ok(())
    }

    async fn require_identity(&self, code: &str) -> Result<Identity, EngineError> {
        self.store
            .get_active(code)
            .await
            .map_err(EngineError::store)?
            .ok_or_else(|| EngineError::IdentityNotFound(code.to_string()))
    }

    async fn store_evidence(
        &self,
        bytes: Option<&[u8]>,
    ) -> Result<Option<StoredEvidence>, EngineError> {
        match bytes {
            Some(bytes) => Ok(Some(
                self.evidence
                    .store(bytes, image_extension(bytes))
                    .await
                    .map_err(EngineError::evidence)?,
            )),
            None => Ok(None),
        }
    }

    /// Roll back evidence stored for an operation that was rejected.
    /// Deduplicated refs are owned by the write that first created the
    /// file and are left alone.
    async fn discard_evidence(&self, evidence: Option<&StoredEvidence>) {
        let Some(evidence) = evidence else { return };
        if !evidence.created {
            return;
        }
        if let Err(e) = self.evidence.remove(&evidence.evidence_ref).await {
            tracing::warn!(
                evidence_ref = %evidence.evidence_ref,
                error = %e,
                "failed to clean up evidence"
            );
        }
    }
}

fn identity_ref(identity: &Identity) -> IdentityRef {
    IdentityRef {
        identity_id: identity.identity_id,
        code: identity.code.clone(),
        display_name: identity.display_name.clone(),
    }
}

fn image_extension(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("img")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use chrono::TimeZone;
    use image::{DynamicImage, ImageFormat};

    use rollcall_store::{FsEvidenceStore, SqliteStore};

    use crate::extract::ExtractError;

    /// Extractor keyed on image width: width 1 yields a fixed unit
    /// descriptor, width 2 finds no face.
    struct WidthKeyedExtractor;

    impl EmbeddingExtractor for WidthKeyedExtractor {
        async fn extract(&self, image: &DynamicImage) -> Result<Descriptor, ExtractError> {
            match image.width() {
                2 => Err(ExtractError::NoFaceFound),
                _ => Ok(Descriptor::new(vec![1.0, 0.0])),
            }
        }
    }

    fn png_bytes(width: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, 1);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    async fn engine() -> Engine<WidthKeyedExtractor, SqliteStore, FsEvidenceStore> {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let evidence_dir =
            std::env::temp_dir().join(format!("rollcall-engine-{}", Uuid::new_v4()));
        Engine::new(
            WidthKeyedExtractor,
            store,
            FsEvidenceStore::new(evidence_dir),
            EngineConfig::default(),
        )
    }

    fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, h, m, s).unwrap()
    }

    async fn enroll_e1(engine: &Engine<WidthKeyedExtractor, SqliteStore, FsEvidenceStore>) {
        engine.store.add_identity("E1", "Alice").await.unwrap();
        engine
            .enroll_with_descriptors(
                "E1",
                vec![
                    Descriptor::new(vec![1.0, 0.0]),
                    Descriptor::new(vec![1.0, 0.0]),
                    Descriptor::new(vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
    }

    // ── Enrollment ───────────────────────────────────────────────────

    #[tokio::test]
    async fn enroll_with_one_bad_image_still_succeeds() {
        let engine = engine().await;
        engine.store.add_identity("E1", "Alice").await.unwrap();

        // Width 2 finds no face; the other two extract fine.
        let images = vec![png_bytes(1), png_bytes(2), png_bytes(1)];
        let summary = engine.enroll("E1", &images).await.unwrap();

        assert_eq!(summary.images_received, 3);
        assert_eq!(summary.images_used, 2);
        assert_eq!(summary.images_invalid, 1);
        assert_eq!(summary.dim, 2);
        assert!(summary.evidence_ref.is_some());
    }

    #[tokio::test]
    async fn enroll_fails_when_no_image_has_a_face() {
        let engine = engine().await;
        engine.store.add_identity("E1", "Alice").await.unwrap();

        let images = vec![png_bytes(2), png_bytes(2), png_bytes(2)];
        let err = engine.enroll("E1", &images).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::EnrollmentFailed { images_received: 3 }
        ));
    }

    #[tokio::test]
    async fn enroll_enforces_minimum_sample_policy() {
        let engine = engine().await;
        engine.store.add_identity("E1", "Alice").await.unwrap();

        let err = engine.enroll("E1", &[png_bytes(1)]).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotEnoughSamples {
                received: 1,
                required: 3
            }
        ));
    }

    #[tokio::test]
    async fn enroll_unknown_code_is_rejected_before_extraction() {
        let engine = engine().await;
        let images = vec![png_bytes(1), png_bytes(1), png_bytes(1)];
        let err = engine.enroll("NOBODY", &images).await.unwrap_err();
        assert!(matches!(err, EngineError::IdentityNotFound(_)));
    }

    #[tokio::test]
    async fn reenrollment_replaces_the_template() {
        let engine = engine().await;
        let identity = engine.store.add_identity("E1", "Alice").await.unwrap();

        engine
            .enroll_with_descriptors("E1", vec![Descriptor::new(vec![1.0, 0.0]); 3])
            .await
            .unwrap();
        engine
            .enroll_with_descriptors("E1", vec![Descriptor::new(vec![0.0, 1.0]); 3])
            .await
            .unwrap();

        let template = engine
            .store
            .get_template(identity.identity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.descriptor.values, vec![0.0, 1.0]);
    }

    // ── State machine scenario ───────────────────────────────────────

    #[tokio::test]
    async fn full_day_lifecycle_for_one_identity() {
        let engine = engine().await;
        enroll_e1(&engine).await;
        let probe = Descriptor::new(vec![1.0, 0.0]);

        // 08:05 check-in is late.
        let receipt = engine
            .check_in_at(&probe, local(8, 5, 0), None, None, None)
            .await
            .unwrap();
        assert_eq!(receipt.status, AttendanceStatus::Late);
        assert_eq!(receipt.identity.code, "E1");

        // Second check-in before any check-out is rejected.
        let err = engine
            .check_in_at(&probe, local(9, 0, 0), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn { since }
            if since == receipt.checked_in_at));

        // Check-out closes the record.
        let out = engine
            .check_out_at(&probe, local(15, 0, 0), None, None, None)
            .await
            .unwrap();
        assert_eq!(out.record_id, receipt.record_id);
        assert!(out.checked_out_at > out.checked_in_at);

        // A third check-in the same day is still rejected: today is done.
        let err = engine
            .check_in_at(&probe, local(16, 0, 0), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn { .. }));
    }

    #[tokio::test]
    async fn early_check_in_is_present() {
        let engine = engine().await;
        enroll_e1(&engine).await;
        let probe = Descriptor::new(vec![1.0, 0.0]);

        let receipt = engine
            .check_in_at(&probe, local(7, 59, 59), None, None, None)
            .await
            .unwrap();
        assert_eq!(receipt.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn rejected_duplicate_check_in_keeps_committed_evidence() {
        let engine = engine().await;
        enroll_e1(&engine).await;
        let image = png_bytes(1);

        let receipt = engine.check_in(&image, None, None).await.unwrap();
        let open = engine
            .store
            .find_open_record(receipt.identity.identity_id, Local::now().date_naive())
            .await
            .unwrap()
            .expect("open record");
        let evidence_ref = open.check_in_evidence.expect("evidence stored");
        assert!(engine.evidence.path_for(&evidence_ref).exists());

        // A client resend with byte-identical content dedupes to the same
        // reference; the rejection must not delete the record's file.
        let err = engine.check_in(&image, None, None).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn { .. }));
        assert!(engine.evidence.path_for(&evidence_ref).exists());
    }

    #[tokio::test]
    async fn check_out_must_be_after_check_in() {
        let engine = engine().await;
        enroll_e1(&engine).await;
        let probe = Descriptor::new(vec![1.0, 0.0]);

        let receipt = engine
            .check_in_at(&probe, local(8, 5, 0), None, None, None)
            .await
            .unwrap();

        // Same instant and earlier are both rejected.
        for when in [local(8, 5, 0), local(8, 0, 0)] {
            let err = engine
                .check_out_at(&probe, when, None, None, None)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::CheckOutNotAfterCheckIn { check_in, .. }
                    if check_in == receipt.checked_in_at
            ));
        }

        // The record stays open and can still be closed later.
        let out = engine
            .check_out_at(&probe, local(15, 0, 0), None, None, None)
            .await
            .unwrap();
        assert_eq!(out.record_id, receipt.record_id);
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_rejected() {
        let engine = engine().await;
        enroll_e1(&engine).await;
        let probe = Descriptor::new(vec![1.0, 0.0]);

        let err = engine
            .check_out_at(&probe, local(15, 0, 0), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCheckedIn));
    }

    #[tokio::test]
    async fn unknown_face_is_not_recognized_and_writes_nothing() {
        let engine = engine().await;
        enroll_e1(&engine).await;

        // Orthogonal probe: similarity 0 against the whole gallery.
        let stranger = Descriptor::new(vec![0.0, 1.0]);
        let err = engine
            .check_in_at(&stranger, local(8, 0, 0), None, None, None)
            .await
            .unwrap_err();
        match err {
            EngineError::FaceNotRecognized {
                highest_similarity,
                threshold,
            } => {
                assert!(highest_similarity.abs() < 1e-5);
                assert!((threshold - 0.55).abs() < 1e-6);
            }
            other => panic!("expected FaceNotRecognized, got {other}"),
        }

        // The rejection wrote no record; a later check-out still fails.
        let probe = Descriptor::new(vec![1.0, 0.0]);
        let err = engine
            .check_out_at(&probe, local(15, 0, 0), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCheckedIn));
    }

    // ── Verification ─────────────────────────────────────────────────

    #[tokio::test]
    async fn verify_accepts_matching_descriptor() {
        let engine = engine().await;
        enroll_e1(&engine).await;

        let v = engine
            .verify_with_descriptor("E1", &Descriptor::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        assert!(v.verified);
        assert!((v.similarity - 1.0).abs() < 1e-5);

        let v = engine
            .verify_with_descriptor("E1", &Descriptor::new(vec![0.0, 1.0]))
            .await
            .unwrap();
        assert!(!v.verified);
    }

    #[tokio::test]
    async fn verify_without_template_reports_missing_enrollment() {
        let engine = engine().await;
        engine.store.add_identity("E1", "Alice").await.unwrap();

        let err = engine
            .verify_with_descriptor("E1", &Descriptor::new(vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IdentityHasNoTemplate(_)));
    }

    #[tokio::test]
    async fn image_check_in_stores_evidence() {
        let engine = engine().await;
        enroll_e1(&engine).await;

        let receipt = engine
            .check_in(&png_bytes(1), Some("front gate".into()), None)
            .await
            .unwrap();
        assert_eq!(receipt.identity.code, "E1");

        let open = engine
            .store
            .find_open_record(receipt.identity.identity_id, Local::now().date_naive())
            .await
            .unwrap()
            .expect("open record");
        assert!(open.check_in_evidence.is_some());
        assert_eq!(open.location.as_deref(), Some("front gate"));
    }
}
