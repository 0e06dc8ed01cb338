use lazy_static::lazy_static;
use rusqlite_migration::{Migrations, M};

lazy_static! {
    pub static ref MIGRATIONS: Migrations<'static> = Migrations::new(vec![
        M::up(
            r#"
            CREATE TABLE notes (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#
        ),
        M::up(
            r#"
            CREATE TABLE images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id TEXT,

                image_data TEXT NOT NULL,
                thumbnail_data TEXT NOT NULL,
                file_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,

                created_at TEXT NOT NULL,
                saved INTEGER NOT NULL DEFAULT 0 CHECK (saved = 0 OR note_id IS NOT NULL),

                FOREIGN KEY (note_id) REFERENCES notes (id) ON DELETE CASCADE
            );

            CREATE INDEX idx_images_note_id ON images (note_id);
            CREATE INDEX idx_images_saved ON images (saved);
        "#
        ),
        M::up(
            r#"
            CREATE TABLE audio (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id TEXT,

                audio_data TEXT NOT NULL,
                file_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                duration REAL NOT NULL,

                created_at TEXT NOT NULL,
                saved INTEGER NOT NULL DEFAULT 0 CHECK (saved = 0 OR note_id IS NOT NULL),

                FOREIGN KEY (note_id) REFERENCES notes (id) ON DELETE CASCADE
            );

            CREATE INDEX idx_audio_note_id ON audio (note_id);
            CREATE INDEX idx_audio_saved ON audio (saved);
        "#
        ),
    ]);
}
