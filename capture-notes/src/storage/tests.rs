use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::task::JoinSet;

use super::{CaptureStore, MemoryStore, SqliteStore, Store};
use crate::{
    captures::{NewAudio, NewImage},
    config::{Config, StorageBackend},
    notes::Note,
    Error, Result,
};

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap()
}

pub(crate) fn note_at(id: &str, t: DateTime<Utc>) -> Note {
    Note {
        id: id.into(),
        title: "Test".into(),
        description: String::new(),
        created_at: t,
        updated_at: t,
    }
}

pub(crate) fn draft_image(created_at: DateTime<Utc>) -> NewImage {
    NewImage {
        note_id: None,
        image_data: "aW1hZ2U=".into(),
        thumbnail_data: "dGh1bWI=".into(),
        file_name: format!("photo_{}.jpg", created_at.timestamp_millis()),
        mime_type: "image/jpeg".into(),
        width: 1920,
        height: 1080,
        created_at,
        saved: false,
    }
}

pub(crate) fn draft_audio(created_at: DateTime<Utc>) -> NewAudio {
    NewAudio {
        note_id: None,
        audio_data: "YXVkaW8=".into(),
        file_name: format!("audio_{}.m4a", created_at.timestamp_millis()),
        mime_type: "audio/m4a".into(),
        duration: 12.75,
        created_at,
        saved: false,
    }
}

async fn open_sqlite() -> Result<Store> {
    let store = SqliteStore::in_memory();
    store.init().await?;
    Ok(Arc::new(store))
}

async fn open_memory() -> Result<Store> {
    let store = MemoryStore::new();
    store.init().await?;
    Ok(Arc::new(store))
}

macro_rules! conformance {
    ($($name:ident),* $(,)?) => {
        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() -> crate::Result<()> {
                    super::$name(super::open_sqlite().await?).await
                }
            )*
        }

        mod memory {
            $(
                #[tokio::test]
                async fn $name() -> crate::Result<()> {
                    super::$name(super::open_memory().await?).await
                }
            )*
        }
    };
}

conformance!(
    commit_draft_image,
    commit_draft_audio,
    mark_as_saved_is_idempotent,
    mark_as_saved_rejects_missing_rows_and_notes,
    committed_media_cannot_move_to_another_note,
    note_media_in_capture_order,
    drafts_newest_first,
    retention_boundary,
    retention_is_idempotent,
    delete_note_cascades_to_media,
    save_note_upserts_in_place,
    notes_ordered_by_last_update,
    missing_note_is_none,
    committed_rows_always_have_a_note,
    delete_media_is_unconditional,
    concurrent_captures_get_distinct_ids,
    closed_store_is_not_initialized,
);

async fn commit_draft_image(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;

    store.mark_image_as_saved(image_id, "n1").await?;

    let images = store.get_images_by_note_id("n1").await?;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].id, image_id);
    assert!(images[0].saved);
    assert_eq!(images[0].note_id.as_deref(), Some("n1"));
    assert!(store.get_unsaved_images().await?.is_empty());
    Ok(())
}

async fn commit_draft_audio(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let audio_id = store.save_audio(draft_audio(t)).await?;
    assert_eq!(store.get_unsaved_audio().await?.len(), 1);

    store.mark_audio_as_saved(audio_id, "n1").await?;

    let audio = store.get_audio_by_note_id("n1").await?;
    assert_eq!(audio.len(), 1);
    assert!(audio[0].saved);
    assert_eq!(audio[0].duration, 12.75);
    assert!(store.get_unsaved_audio().await?.is_empty());
    Ok(())
}

async fn mark_as_saved_is_idempotent(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;

    store.mark_image_as_saved(image_id, "n1").await?;
    let first = store.get_images_by_note_id("n1").await?;
    store.mark_image_as_saved(image_id, "n1").await?;
    let second = store.get_images_by_note_id("n1").await?;

    assert_eq!(first, second);
    Ok(())
}

async fn mark_as_saved_rejects_missing_rows_and_notes(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;
    let audio_id = store.save_audio(draft_audio(t)).await?;

    assert!(matches!(store.mark_image_as_saved(999, "n1").await, Err(Error::NotFound(_))));
    assert!(matches!(store.mark_audio_as_saved(999, "n1").await, Err(Error::NotFound(_))));
    assert!(matches!(store.mark_image_as_saved(image_id, "nope").await, Err(Error::NotFound(_))));
    assert!(matches!(store.mark_audio_as_saved(audio_id, "").await, Err(Error::Validation(_))));

    // failed attempts leave the drafts untouched
    assert_eq!(store.get_unsaved_images().await?.len(), 1);
    assert_eq!(store.get_unsaved_audio().await?.len(), 1);
    Ok(())
}

async fn committed_media_cannot_move_to_another_note(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    store.save_note(note_at("n2", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;
    store.mark_image_as_saved(image_id, "n1").await?;

    assert!(matches!(store.mark_image_as_saved(image_id, "n2").await, Err(Error::Validation(_))));
    assert_eq!(store.get_images_by_note_id("n1").await?.len(), 1);
    assert!(store.get_images_by_note_id("n2").await?.is_empty());
    Ok(())
}

async fn note_media_in_capture_order(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;

    let t1 = t + Duration::seconds(1);
    let t2 = t + Duration::seconds(2);
    let t3 = t + Duration::seconds(3);
    let third = store.save_image(draft_image(t3)).await?;
    let first = store.save_image(draft_image(t1)).await?;
    let second = store.save_image(draft_image(t2)).await?;
    let second_tie = store.save_image(draft_image(t2)).await?;
    for id in [first, second, second_tie, third] {
        store.mark_image_as_saved(id, "n1").await?;
    }

    let ids: Vec<_> = store
        .get_images_by_note_id("n1")
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec![first, second, second_tie, third]);
    Ok(())
}

async fn drafts_newest_first(store: Store) -> Result<()> {
    let t = base_time();
    let old = store.save_audio(draft_audio(t)).await?;
    let new = store.save_audio(draft_audio(t + Duration::minutes(5))).await?;
    let middle = store.save_audio(draft_audio(t + Duration::minutes(1))).await?;
    let middle_tie = store.save_audio(draft_audio(t + Duration::minutes(1))).await?;

    let ids: Vec<_> = store.get_unsaved_audio().await?.into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![new, middle, middle_tie, old]);
    Ok(())
}

async fn retention_boundary(store: Store) -> Result<()> {
    let now = Utc::now();
    store.save_note(note_at("n1", now - Duration::days(100))).await?;

    let stale = store.save_image(draft_image(now - Duration::days(8))).await?;
    let fresh = store.save_image(draft_image(now - Duration::days(6))).await?;
    let committed = store.save_image(draft_image(now - Duration::days(100))).await?;
    store.mark_image_as_saved(committed, "n1").await?;
    store.save_audio(draft_audio(now - Duration::days(8))).await?;

    let report = store.cleanup_old_unsaved_items(7).await?;
    assert_eq!(report.images_deleted, 1);
    assert_eq!(report.audio_deleted, 1);

    let drafts: Vec<_> = store.get_unsaved_images().await?.into_iter().map(|i| i.id).collect();
    assert_eq!(drafts, vec![fresh]);
    assert!(!drafts.contains(&stale));
    assert_eq!(store.get_images_by_note_id("n1").await?.len(), 1);
    assert!(store.get_unsaved_audio().await?.is_empty());
    Ok(())
}

async fn retention_is_idempotent(store: Store) -> Result<()> {
    let cutoff = base_time();
    store.save_image(draft_image(cutoff - Duration::seconds(1))).await?;
    store.save_image(draft_image(cutoff)).await?;

    let first = store.delete_unsaved_before(cutoff).await?;
    let second = store.delete_unsaved_before(cutoff).await?;

    assert_eq!(first.images_deleted, 1);
    assert_eq!(second, super::CleanupReport::default());
    // a row created exactly at the cutoff is not older than it
    assert_eq!(store.get_unsaved_images().await?.len(), 1);
    Ok(())
}

async fn delete_note_cascades_to_media(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    store.save_note(note_at("n2", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;
    let audio_id = store.save_audio(draft_audio(t)).await?;
    let other_image = store.save_image(draft_image(t)).await?;
    let draft = store.save_image(draft_image(t)).await?;
    store.mark_image_as_saved(image_id, "n1").await?;
    store.mark_audio_as_saved(audio_id, "n1").await?;
    store.mark_image_as_saved(other_image, "n2").await?;

    store.delete_note("n1").await?;

    assert_eq!(store.get_note("n1").await?, None);
    assert!(store.get_images_by_note_id("n1").await?.is_empty());
    assert!(store.get_audio_by_note_id("n1").await?.is_empty());
    assert_eq!(store.get_images_by_note_id("n2").await?.len(), 1);
    let drafts: Vec<_> = store.get_unsaved_images().await?.into_iter().map(|i| i.id).collect();
    assert_eq!(drafts, vec![draft]);

    // deleting again is harmless
    store.delete_note("n1").await?;
    Ok(())
}

async fn save_note_upserts_in_place(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let image_id = store.save_image(draft_image(t)).await?;
    store.mark_image_as_saved(image_id, "n1").await?;

    let edited = Note {
        title: "Edited".into(),
        description: "more words".into(),
        updated_at: t + Duration::hours(1),
        ..note_at("n1", t)
    };
    store.save_note(edited.clone()).await?;

    assert_eq!(store.get_note("n1").await?, Some(edited));
    assert_eq!(store.get_all_notes().await?.len(), 1);
    assert_eq!(store.get_images_by_note_id("n1").await?.len(), 1);

    let invalid = Note {
        title: " ".into(),
        ..note_at("n1", t)
    };
    assert!(matches!(store.save_note(invalid).await, Err(Error::Validation(_))));
    Ok(())
}

async fn notes_ordered_by_last_update(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("a", t)).await?;
    store.save_note(note_at("b", t + Duration::hours(2))).await?;
    store.save_note(note_at("c", t)).await?;
    store
        .save_note(Note {
            updated_at: t + Duration::hours(1),
            ..note_at("a", t)
        })
        .await?;
    store.save_note(note_at("d", t)).await?;

    let ids: Vec<_> = store.get_all_notes().await?.into_iter().map(|n| n.id).collect();
    assert_eq!(ids, vec!["b", "a", "c", "d"]);
    Ok(())
}

async fn missing_note_is_none(store: Store) -> Result<()> {
    assert_eq!(store.get_note("missing").await?, None);
    assert!(store.get_images_by_note_id("missing").await?.is_empty());
    Ok(())
}

async fn committed_rows_always_have_a_note(store: Store) -> Result<()> {
    let t = base_time();
    let orphan = NewImage {
        saved: true,
        ..draft_image(t)
    };
    assert!(matches!(store.save_image(orphan).await, Err(Error::Validation(_))));

    let dangling = NewAudio {
        note_id: Some("ghost".into()),
        saved: true,
        ..draft_audio(t)
    };
    assert!(matches!(store.save_audio(dangling).await, Err(Error::NotFound(_))));

    store.save_note(note_at("n1", t)).await?;
    let attached = store
        .save_image(NewImage {
            note_id: Some("n1".into()),
            saved: true,
            ..draft_image(t)
        })
        .await?;
    let draft = store.save_image(draft_image(t)).await?;
    store.delete_image(draft).await?;

    let rows = store.get_images_by_note_id("n1").await?;
    assert_eq!(rows.iter().map(|i| i.id).collect::<Vec<_>>(), vec![attached]);
    for row in rows.iter().chain(store.get_unsaved_images().await?.iter()) {
        assert!(!row.saved || row.note_id.is_some());
    }
    Ok(())
}

async fn delete_media_is_unconditional(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;
    let draft = store.save_image(draft_image(t)).await?;
    let committed = store.save_audio(draft_audio(t)).await?;
    store.mark_audio_as_saved(committed, "n1").await?;

    store.delete_image(draft).await?;
    store.delete_audio(committed).await?;
    store.delete_image(12345).await?;

    assert!(store.get_unsaved_images().await?.is_empty());
    assert!(store.get_audio_by_note_id("n1").await?.is_empty());
    Ok(())
}

async fn concurrent_captures_get_distinct_ids(store: Store) -> Result<()> {
    let t = base_time();
    store.save_note(note_at("n1", t)).await?;

    let mut tasks = JoinSet::new();
    for i in 0..32 {
        let store = store.clone();
        // later spawns carry earlier capture times
        tasks.spawn(async move { store.save_image(draft_image(t + Duration::milliseconds(31 - i))).await });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let id = joined.map_err(|e| Error::Unexpected(e.to_string()))??;
        assert!(ids.insert(id), "duplicate id {id}");
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(store.get_unsaved_images().await?.len(), 32);

    for id in &ids {
        store.mark_image_as_saved(*id, "n1").await?;
    }

    let images = store.get_images_by_note_id("n1").await?;
    assert_eq!(images.len(), 32);
    assert!(images.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(images[0].created_at, t);
    assert_eq!(images[31].created_at, t + Duration::milliseconds(31));
    Ok(())
}

async fn closed_store_is_not_initialized(store: Store) -> Result<()> {
    store.close().await?;

    assert!(matches!(store.get_all_notes().await, Err(Error::NotInitialized)));
    assert!(matches!(
        store.save_image(draft_image(base_time())).await,
        Err(Error::NotInitialized)
    ));
    assert!(matches!(store.cleanup_old_unsaved_items(7).await, Err(Error::NotInitialized)));

    store.init().await?;
    assert!(store.get_all_notes().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn uninitialized_stores_refuse_work() {
    let sqlite = SqliteStore::new("never-opened.db");
    let memory = MemoryStore::new();

    assert!(matches!(sqlite.get_note("n1").await, Err(Error::NotInitialized)));
    assert!(matches!(memory.get_note("n1").await, Err(Error::NotInitialized)));
    assert!(matches!(memory.delete_image(1).await, Err(Error::NotInitialized)));
}

#[tokio::test]
async fn open_selects_configured_backend() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("capture.db");

    for backend in [StorageBackend::Sqlite, StorageBackend::Memory] {
        let config = Config {
            storage_backend: backend,
            database_url: path.to_string_lossy().into_owned(),
            ..Config::default()
        };
        let store = super::open(&config).await?;

        store.save_note(note_at("n1", base_time())).await?;
        let id = store.save_image(draft_image(base_time())).await?;
        store.mark_image_as_saved(id, "n1").await?;
        assert_eq!(store.get_images_by_note_id("n1").await?[0].id, id);

        store.close().await?;
    }

    assert!(path.exists());
    Ok(())
}
