//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use rollcall_core::{
    status::AttendanceStatus,
    store::{AttendanceStore, CheckInInsert, IdentityRegistry, NewCheckIn, TemplateStore},
    types::Descriptor,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_check_in(identity_id: Uuid, d: NaiveDate, status: AttendanceStatus) -> NewCheckIn {
    NewCheckIn {
        identity_id,
        day: d,
        check_in: Utc.with_ymd_and_hms(2025, 3, 3, 1, 5, 0).unwrap(),
        evidence_ref: Some("abc123.jpg".into()),
        status,
        location: Some("front gate".into()),
        notes: None,
    }
}

// ── Identities ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_active_finds_by_code() {
    let s = store().await;
    let added = s.add_identity("E1", "Alice").await.unwrap();

    let found = s.get_active("E1").await.unwrap().expect("found");
    assert_eq!(found.identity_id, added.identity_id);
    assert_eq!(found.display_name, "Alice");
}

#[tokio::test]
async fn inactive_identity_is_not_found() {
    let s = store().await;
    s.add_identity("E1", "Alice").await.unwrap();
    assert!(s.set_active("E1", false).await.unwrap());
    assert!(s.get_active("E1").await.unwrap().is_none());
}

// ── Templates ────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_template_replaces_single_row() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();

    let first = Descriptor::new(vec![1.0, 0.0]);
    let t1 = s
        .upsert_template(identity.identity_id, &first, Some("ev1.jpg"))
        .await
        .unwrap();
    assert_eq!(t1.descriptor, first);

    let second = Descriptor::new(vec![0.0, 1.0]);
    let t2 = s
        .upsert_template(identity.identity_id, &second, Some("ev2.jpg"))
        .await
        .unwrap();
    assert_eq!(t2.descriptor, second);
    assert_eq!(t2.evidence_ref.as_deref(), Some("ev2.jpg"));
    assert_eq!(t2.created_at, t1.created_at);

    // Still exactly one gallery entry for this identity.
    let gallery = s.list_gallery(true).await.unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery[0].identity_id, identity.identity_id);
}

#[tokio::test]
async fn gallery_excludes_inactive_when_asked() {
    let s = store().await;
    let a = s.add_identity("E1", "Alice").await.unwrap();
    let b = s.add_identity("E2", "Bob").await.unwrap();
    let d = Descriptor::new(vec![1.0, 0.0]);
    s.upsert_template(a.identity_id, &d, None).await.unwrap();
    s.upsert_template(b.identity_id, &d, None).await.unwrap();

    s.set_active("E2", false).await.unwrap();

    assert_eq!(s.list_gallery(true).await.unwrap().len(), 1);
    assert_eq!(s.list_gallery(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn gallery_order_is_stable_enrollment_order() {
    let s = store().await;
    let a = s.add_identity("E1", "Alice").await.unwrap();
    let b = s.add_identity("E2", "Bob").await.unwrap();
    let d = Descriptor::new(vec![1.0, 0.0]);
    s.upsert_template(a.identity_id, &d, None).await.unwrap();
    s.upsert_template(b.identity_id, &d, None).await.unwrap();

    let g1 = s.list_gallery(true).await.unwrap();
    let g2 = s.list_gallery(true).await.unwrap();
    let order1: Vec<Uuid> = g1.iter().map(|e| e.identity_id).collect();
    let order2: Vec<Uuid> = g2.iter().map(|e| e.identity_id).collect();
    assert_eq!(order1, order2);
}

// ── Attendance ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_find_open_record() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();
    let d = day(2025, 3, 3);

    let inserted = s
        .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Late))
        .await
        .unwrap();
    let record = match inserted {
        CheckInInsert::Created(r) => r,
        CheckInInsert::OpenRecordExists => panic!("unexpected conflict"),
    };
    assert!(record.is_open());
    assert_eq!(record.status, AttendanceStatus::Late);

    let open = s
        .find_open_record(identity.identity_id, d)
        .await
        .unwrap()
        .expect("open record");
    assert_eq!(open.record_id, record.record_id);
    assert!(s
        .find_completed_record(identity.identity_id, d)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn second_open_insert_same_day_conflicts() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();
    let d = day(2025, 3, 3);

    let first = s
        .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Present))
        .await
        .unwrap();
    assert!(matches!(first, CheckInInsert::Created(_)));

    let second = s
        .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Present))
        .await
        .unwrap();
    assert!(matches!(second, CheckInInsert::OpenRecordExists));
}

#[tokio::test]
async fn check_out_closes_record_and_keeps_status() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();
    let d = day(2025, 3, 3);

    let record = match s
        .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Late))
        .await
        .unwrap()
    {
        CheckInInsert::Created(r) => r,
        CheckInInsert::OpenRecordExists => panic!("unexpected conflict"),
    };

    let out_at = Utc.with_ymd_and_hms(2025, 3, 3, 9, 30, 0).unwrap();
    let closed = s
        .complete_check_out(record.record_id, out_at, Some("out.jpg"), None, Some("left early"))
        .await
        .unwrap();

    assert_eq!(closed.check_out, Some(out_at));
    assert_eq!(closed.check_out_evidence.as_deref(), Some("out.jpg"));
    assert_eq!(closed.status, AttendanceStatus::Late);
    assert_eq!(closed.notes.as_deref(), Some("left early"));
    // Location was not supplied at check-out; the check-in value stays.
    assert_eq!(closed.location.as_deref(), Some("front gate"));

    assert!(s
        .find_open_record(identity.identity_id, d)
        .await
        .unwrap()
        .is_none());
    assert!(s
        .find_completed_record(identity.identity_id, d)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn check_out_of_closed_record_fails() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();
    let d = day(2025, 3, 3);

    let record = match s
        .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Present))
        .await
        .unwrap()
    {
        CheckInInsert::Created(r) => r,
        CheckInInsert::OpenRecordExists => panic!("unexpected conflict"),
    };

    let out_at = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    s.complete_check_out(record.record_id, out_at, None, None, None)
        .await
        .unwrap();

    let again = s
        .complete_check_out(record.record_id, out_at, None, None, None)
        .await;
    assert!(again.is_err());
}

#[tokio::test]
async fn list_range_is_day_ordered_and_bounded() {
    let s = store().await;
    let identity = s.add_identity("E1", "Alice").await.unwrap();

    for d in [day(2025, 3, 5), day(2025, 3, 3), day(2025, 3, 10)] {
        let inserted = s
            .insert_check_in(new_check_in(identity.identity_id, d, AttendanceStatus::Present))
            .await
            .unwrap();
        assert!(matches!(inserted, CheckInInsert::Created(_)));
    }

    let records = s
        .list_range(identity.identity_id, day(2025, 3, 1), day(2025, 3, 7))
        .await
        .unwrap();
    let days: Vec<NaiveDate> = records.iter().map(|r| r.day).collect();
    assert_eq!(days, vec![day(2025, 3, 3), day(2025, 3, 5)]);
}
