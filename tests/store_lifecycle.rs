use notes_core::{AppError, Note, NoteColor, NoteStore, NotesCore, StoreConfig};
use rusqlite::Connection;

#[tokio::test]
async fn milk_note_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = NoteStore::open(&dir.path().join("notes.db")).expect("store");
    let mut all = store.get_all();
    assert!(all.next().await.expect("emission").expect("query").is_empty());

    let milk = store
        .insert(Note::new("Milk", "Buy milk"))
        .await
        .expect("insert");
    assert_eq!(milk.id, 1);

    let listed = all.next().await.expect("emission").expect("query");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, 1);
    assert_eq!(listed[0].title, "Milk");

    let mut single = store.get_by_id(1);
    single.next().await.expect("emission").expect("query");

    let green = NoteColor::parse("#FF00FF00").expect("color");
    store
        .update(Note {
            id: 1,
            title: "Milk".to_string(),
            description: "Buy milk".to_string(),
            color: Some(green),
        })
        .await
        .expect("update");

    let recolored = single
        .next()
        .await
        .expect("emission")
        .expect("query")
        .expect("present");
    assert_eq!(recolored.color, Some(green));
    assert_eq!(all.next().await.expect("emission").expect("query")[0].color, Some(green));

    assert!(store.delete(&recolored).await.expect("delete"));
    assert!(all.next().await.expect("emission").expect("query").is_empty());
    assert!(single.next().await.expect("emission").expect("query").is_none());
}

#[tokio::test]
async fn listing_length_tracks_inserts_minus_deletes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = NoteStore::open(&dir.path().join("notes.db")).expect("store");

    let mut inserted = Vec::new();
    for index in 0..10 {
        inserted.push(
            store
                .insert(Note::new(format!("note {index}"), ""))
                .await
                .expect("insert"),
        );
    }
    let mut deleted = 0;
    for note in inserted.iter().step_by(3) {
        if store.delete(note).await.expect("delete") {
            deleted += 1;
        }
    }
    // repeated deletes are no-ops
    store.delete(&inserted[0]).await.expect("repeat delete");

    let listed = store.get_all().next().await.expect("emission").expect("query");
    assert_eq!(listed.len(), inserted.len() - deleted);
    assert!(listed.windows(2).all(|pair| pair[0].id > pair[1].id));
}

#[tokio::test]
async fn version_one_file_is_upgraded_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.db");
    {
        let conn = Connection::open(&path).expect("fixture");
        conn.execute_batch(
            "CREATE TABLE notes (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               title TEXT NOT NULL,
               description TEXT NOT NULL
             );
             INSERT INTO notes (title, description) VALUES ('one', 'a');
             INSERT INTO notes (title, description) VALUES ('two', 'b');
             INSERT INTO notes (title, description) VALUES ('three', 'c');
             PRAGMA user_version = 1;",
        )
        .expect("v1 schema");
    }

    let store = NoteStore::open(&path).expect("store");
    let listed = store.get_all().next().await.expect("emission").expect("query");
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|note| note.color.is_none()));

    let tagged = store
        .insert(Note::new("four", "d").with_color(NoteColor::from_argb(0x80FF0000)))
        .await
        .expect("insert with color");
    assert_eq!(tagged.id, 4);

    let mut first = listed[2].clone();
    first.color = Some(NoteColor::from_argb(0xFF0000FF));
    store.update(first.clone()).await.expect("update with color");
    let loaded = store
        .get_by_id(first.id)
        .next()
        .await
        .expect("emission")
        .expect("query")
        .expect("present");
    assert_eq!(loaded.color, first.color);
}

#[tokio::test]
async fn core_shares_stores_per_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StoreConfig::new(dir.path().join("data"));

    let first = NotesCore::open(&config).expect("open");
    let second = NotesCore::open(&config).expect("reopen");
    assert!(std::sync::Arc::ptr_eq(&first.notes, &second.notes));
    assert!(std::sync::Arc::ptr_eq(&first.preferences, &second.preferences));

    let mut dark_mode = first.preferences.dark_mode_enabled();
    assert_eq!(dark_mode.next().await, Some(false));
    second.preferences.set_dark_mode(true).await.expect("save");
    assert_eq!(dark_mode.next().await, Some(true));
}

#[test]
fn invalid_config_is_rejected_before_touching_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = StoreConfig::new(dir.path().join("never-created"));
    config.database_file = String::new();

    let err = NotesCore::open(&config).expect_err("invalid");
    assert!(matches!(err, AppError::Config(_)));
    assert!(!dir.path().join("never-created").exists());
}
