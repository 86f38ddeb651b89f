//! Query-level tests against a real Postgres (`DATABASE_URL`). Run with
//! `cargo test -- --ignored` against a scratch database.

use meta_store::{Database, FileType, sessions::NewSession, sync_files, users};
use uuid::Uuid;

async fn database() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch db");
    let db = Database::connect(&url, 4).await.unwrap();
    db.ensure_schema().await.unwrap();
    db
}

async fn fresh_user(db: &Database) -> i64 {
    db.create_user(&format!("meta-store-{}@example.com", Uuid::new_v4()))
        .await
        .unwrap()
}

fn new_session(external_id: &str) -> NewSession<'_> {
    NewSession {
        external_id,
        transcript_path: "/t.jsonl",
        cwd: "/w",
        git_info: None,
        hostname: None,
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn session_upsert_is_idempotent_and_refreshes_late_metadata() {
    let db = database().await;
    let user = fresh_user(&db).await;

    let first = db.upsert_session(user, new_session("ext-1")).await.unwrap();

    let second = db
        .upsert_session(
            user,
            NewSession {
                cwd: "/elsewhere",
                ..new_session("ext-1")
            },
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.cwd, "/elsewhere");
    assert_eq!(second.first_seen, first.first_seen);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn same_external_id_under_different_owners_is_two_sessions() {
    let db = database().await;
    let a = fresh_user(&db).await;
    let b = fresh_user(&db).await;

    let sa = db.upsert_session(a, new_session("shared-ext")).await.unwrap();
    let sb = db.upsert_session(b, new_session("shared-ext")).await.unwrap();

    assert_ne!(sa.id, sb.id);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn watermark_updates_are_monotonic() {
    let db = database().await;
    let user = fresh_user(&db).await;
    let session = db.upsert_session(user, new_session("ext-wm")).await.unwrap();

    let mut tx = db.begin().await.unwrap();
    sync_files::ensure_sync_file(&mut *tx, session.id, "t.jsonl", FileType::Transcript)
        .await
        .unwrap();
    sync_files::set_watermark(&mut *tx, session.id, "t.jsonl", 5, 50)
        .await
        .unwrap();
    // a stale lower write must not move the watermark backwards
    sync_files::set_watermark(&mut *tx, session.id, "t.jsonl", 3, 0)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let file = db.get_sync_file(session.id, "t.jsonl").await.unwrap().unwrap();
    assert_eq!(file.last_synced_line, 5);
    assert_eq!(file.bytes_used, 50);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn api_key_lookup_ignores_revoked_keys() {
    let db = database().await;
    let user = fresh_user(&db).await;

    let hash = format!("{:064}", user);
    db.create_api_key(user, "laptop", &hash).await.unwrap();
    assert!(db.lookup_api_key(&hash).await.unwrap().is_some());

    assert!(db.revoke_api_key(user, "laptop").await.unwrap());
    assert!(db.lookup_api_key(&hash).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_key_names_are_rejected() {
    let db = database().await;
    let user = fresh_user(&db).await;

    db.create_api_key(user, "laptop", &format!("a{:063}", user))
        .await
        .unwrap();
    let err = db
        .create_api_key(user, "laptop", &format!("b{:063}", user))
        .await
        .unwrap_err();

    assert!(matches!(err, meta_store::Error::DuplicateKeyName { .. }));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn expired_shares_do_not_resolve() {
    let db = database().await;
    let user = fresh_user(&db).await;
    let session = db.upsert_session(user, new_session("ext-share")).await.unwrap();

    let token = format!("tok-{}", Uuid::new_v4());
    let expired = time::OffsetDateTime::now_utc() - time::Duration::hours(1);
    db.create_share(session.id, Some(&token), None, Some(expired))
        .await
        .unwrap();

    assert!(db.lookup_share_by_token(&token).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn session_delete_cascades_and_reclaims_bytes() {
    let db = database().await;
    let user = fresh_user(&db).await;
    let session = db.upsert_session(user, new_session("ext-del")).await.unwrap();

    let mut tx = db.begin().await.unwrap();
    sync_files::ensure_sync_file(&mut *tx, session.id, "t.jsonl", FileType::Transcript)
        .await
        .unwrap();
    sync_files::set_watermark(&mut *tx, session.id, "t.jsonl", 2, 20)
        .await
        .unwrap();
    users::add_user_bytes(&mut *tx, user, 20).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.begin().await.unwrap();
    let reclaimed = meta_store::sessions::sum_session_bytes(&mut *tx, session.id)
        .await
        .unwrap();
    assert_eq!(reclaimed, 20);
    assert!(meta_store::sessions::delete_session(&mut *tx, session.id)
        .await
        .unwrap());
    users::add_user_bytes(&mut *tx, user, -reclaimed).await.unwrap();
    tx.commit().await.unwrap();

    assert!(db.get_session(session.id).await.unwrap().is_none());
    assert!(db.list_sync_files(session.id).await.unwrap().is_empty());
    assert_eq!(db.get_user(user).await.unwrap().unwrap().bytes_used, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn analytics_claims_only_sessions_with_new_lines() {
    let db = database().await;
    let user = fresh_user(&db).await;
    let session = db
        .upsert_session(user, new_session("ext-analytics"))
        .await
        .unwrap();

    let mut tx = db.begin().await.unwrap();
    sync_files::ensure_sync_file(&mut *tx, session.id, "t.jsonl", FileType::Transcript)
        .await
        .unwrap();
    sync_files::set_watermark(&mut *tx, session.id, "t.jsonl", 4, 40)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    db.seed_analytics_rows().await.unwrap();

    // claim until our session comes up; other tests' sessions may be queued
    let claim = loop {
        let claim = db
            .claim_next_analytics(600.0)
            .await
            .unwrap()
            .expect("session with new lines should be claimable");
        if claim.session_id == session.id {
            break claim;
        }
        db.complete_analytics(claim.session_id, i64::MAX, &Default::default())
            .await
            .unwrap();
    };
    assert_eq!(claim.computed_line_count, 0);

    db.complete_analytics(session.id, 4, &Default::default())
        .await
        .unwrap();

    // fully computed sessions are not claimable again
    loop {
        match db.claim_next_analytics(600.0).await.unwrap() {
            None => break,
            Some(other) => {
                assert_ne!(other.session_id, session.id);
                db.complete_analytics(other.session_id, i64::MAX, &Default::default())
                    .await
                    .unwrap();
            }
        }
    }
}
