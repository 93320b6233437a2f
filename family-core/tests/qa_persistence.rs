//! QA tests for save/load through a file-backed session.
//!
//! Run with: `cargo test -p family-core --test qa_persistence`

use family_core::persist::{load_store, parse_store};
use family_core::sample::sample_store;
use family_core::testing::assert_consistent;
use family_core::{
    materialize, Attachment, FamilySession, FileStorage, Gender, MemberId, MemberPatch, NewMember,
    SessionConfig,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// =============================================================================
// TEST 1: A fresh session starts from the sample family
// =============================================================================

#[tokio::test]
async fn test_fresh_session_uses_sample() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = SessionConfig::new().with_data_path(temp_dir.path().join("tree.json"));

    let session = FamilySession::open(config).await;

    assert_eq!(session.store(), &sample_store());
    assert_eq!(session.forest().len(), 1);
}

// =============================================================================
// TEST 2: Edits survive a reopen
// =============================================================================

#[tokio::test]
async fn test_edits_survive_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("tree.json");
    let config = SessionConfig::new()
        .with_data_path(&path)
        .with_sample_fallback(false);

    let mut session = FamilySession::open(config.clone()).await;
    assert!(session.store().is_empty());

    let alice = session
        .add_member(NewMember::new("Alice", Gender::Female), Attachment::Root)
        .await
        .unwrap();
    session
        .add_member(NewMember::new("Bob", Gender::Male), Attachment::Spouse(alice))
        .await
        .unwrap();
    let carl = session
        .add_member(
            NewMember::new("Carl", Gender::Male).with_dob("1990-05-01"),
            Attachment::Child(alice),
        )
        .await
        .unwrap();
    session
        .update_member(carl, MemberPatch::new().description("First born"))
        .await
        .unwrap();
    assert!(path.exists(), "tree should be saved after each edit");

    let forest_before = session.forest();
    drop(session);

    let reopened = FamilySession::open(config).await;
    assert_eq!(reopened.forest(), forest_before);
    let carl_record = reopened.store().get(carl).unwrap();
    assert_eq!(carl_record.description, "First born");
    assert_eq!(carl_record.dob.as_deref(), Some("1990-05-01"));
    assert_consistent(reopened.store());
}

// =============================================================================
// TEST 3: New ids after reopen do not collide
// =============================================================================

#[tokio::test]
async fn test_ids_continue_after_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = SessionConfig::new().with_data_path(temp_dir.path().join("tree.json"));

    let mut session = FamilySession::open(config.clone()).await;
    let first = session
        .add_member(NewMember::new("Gus", Gender::Male), Attachment::Root)
        .await
        .unwrap();
    drop(session);

    let mut session = FamilySession::open(config).await;
    let second = session
        .add_member(NewMember::new("Hal", Gender::Male), Attachment::Root)
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(session.store().get(first).unwrap().name, "Gus");
}

// =============================================================================
// TEST 4: Legacy files load
// =============================================================================

#[tokio::test]
async fn test_legacy_array_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("legacy.json");
    std::fs::write(
        &path,
        r#"[
            {"id": 1700000000001, "name": "Ida", "gender": "female", "spouseId": 1700000000002, "children": [1700000000003]},
            {"id": 1700000000002, "name": "Jon", "gender": "male", "spouseId": 1700000000001, "children": [1700000000003]},
            {"id": 1700000000003, "name": "Kit", "parents": [1700000000001, 1700000000002]}
        ]"#,
    )
    .unwrap();

    let store = load_store(&FileStorage::new(&path)).await;

    assert_eq!(store.len(), 3);
    assert_consistent(&store);
    let forest = materialize(&store);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].member.id, MemberId::new(1_700_000_000_001));
    assert_eq!(forest[0].children[0].member.name, "Kit");
}

// =============================================================================
// TEST 5: Corrupt file falls back without failing
// =============================================================================

#[tokio::test]
async fn test_corrupt_file_falls_back_to_sample() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("tree.json");
    std::fs::write(&path, "this is not json").unwrap();

    let session = FamilySession::open(SessionConfig::new().with_data_path(&path)).await;

    assert_eq!(session.store(), &sample_store());
}

// =============================================================================
// TEST 6: Save failures are reported, not fatal
// =============================================================================

#[tokio::test]
async fn test_unwritable_location_reports_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    // A directory where the file should be makes every write fail.
    let path = temp_dir.path().join("occupied");
    std::fs::create_dir_all(&path).unwrap();

    let mut session = FamilySession::open(SessionConfig::new().with_data_path(&path)).await;
    let id = session
        .add_member(NewMember::new("Lea", Gender::Female), Attachment::Root)
        .await
        .unwrap();

    assert!(session.last_save_error().is_some());
    assert!(session.store().contains(id));
}

// =============================================================================
// TEST 7: Saved text parses back to the same store
// =============================================================================

#[test]
fn test_saved_text_parses_back() {
    let store = sample_store();
    let json = family_core::persist::to_json(&store).unwrap();
    assert_eq!(parse_store(&json).unwrap(), store);
}
