//! End-to-end extraction over change-sets recorded by SQLite's session
//! extension against a store carrying an ECDb-style catalog.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use changeids_changeset::{ChangesetBuilder, ChangesetFormat};
use changeids_core::{ChangedIdsExtractor, ExtractConfig, extract_changed_instance_ids};
use changeids_error::ExtractStatus;
use changeids_types::{DbOpcode, EntityCategory, SqliteValue};
use rusqlite::Connection;
use rusqlite::session::Session;
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ─── Store fixture ──────────────────────────────────────────────────────────

const STORE_DDL: &str = "
    CREATE TABLE ec_Schema (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL);
    CREATE TABLE ec_Class (Id INTEGER PRIMARY KEY, SchemaId INTEGER NOT NULL,
                           Name TEXT NOT NULL);
    CREATE TABLE ec_Table (Id INTEGER PRIMARY KEY, ParentTableId INTEGER,
                           Name TEXT NOT NULL, Type INTEGER NOT NULL,
                           ExclusiveRootClassId INTEGER);
    INSERT INTO ec_Schema VALUES (1, 'BisCore');
    INSERT INTO ec_Class VALUES
        (0x10, 1, 'Element'), (0x11, 1, 'ElementUniqueAspect'),
        (0x12, 1, 'ElementMultiAspect'), (0x13, 1, 'Model'),
        (0x14, 1, 'ElementRefersToElements'), (0x15, 1, 'CodeSpec');
    INSERT INTO ec_Table VALUES
        (1, NULL, 'bis_Element', 0, 0x10),
        (2, 1, 'bis_GeometricElement3d', 1, NULL),
        (3, NULL, 'bis_ElementUniqueAspect', 0, 0x11),
        (4, NULL, 'bis_ElementMultiAspect', 0, 0x12),
        (5, NULL, 'bis_Model', 0, 0x13),
        (6, NULL, 'bis_ElementRefersToElements', 0, 0x14),
        (7, NULL, 'bis_CodeSpec', 0, 0x15),
        (8, NULL, 'be_Prop', 0, NULL);

    CREATE TABLE bis_Element (Id INTEGER PRIMARY KEY, ModelId INTEGER, CodeValue TEXT);
    CREATE TABLE bis_GeometricElement3d (ElementId INTEGER PRIMARY KEY, Origin BLOB);
    CREATE TABLE bis_ElementUniqueAspect (Id INTEGER PRIMARY KEY, ElementId INTEGER);
    CREATE TABLE bis_ElementMultiAspect (Id INTEGER PRIMARY KEY, ElementId INTEGER);
    CREATE TABLE bis_Model (Id INTEGER PRIMARY KEY, ParentModelId INTEGER);
    CREATE TABLE bis_ElementRefersToElements (Id INTEGER PRIMARY KEY,
                                              SourceId INTEGER, TargetId INTEGER);
    CREATE TABLE bis_CodeSpec (Id INTEGER PRIMARY KEY, Name TEXT);
    CREATE TABLE be_Prop (Namespace TEXT, Name TEXT, Id INTEGER PRIMARY KEY);
    CREATE TABLE dgn_Font (Id INTEGER PRIMARY KEY, Type INTEGER, Name TEXT);
    CREATE TABLE tmp_Scratch (Id INTEGER PRIMARY KEY, Note TEXT);

    INSERT INTO bis_Model VALUES (1, NULL);
    INSERT INTO bis_Element VALUES (50, 1, 'existing');
    INSERT INTO dgn_Font VALUES (4, 1, 'Old Font');
";

struct Store {
    dir: TempDir,
    conn: Connection,
    files: usize,
}

impl Store {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = Connection::open(dir.path().join("store.bim")).expect("open store");
        conn.execute_batch(STORE_DDL).expect("store ddl");
        Self {
            dir,
            conn,
            files: 0,
        }
    }

    /// Run `sql` under a session and write the resulting change-set file.
    fn record(&mut self, sql: &str) -> PathBuf {
        self.record_with(sql, false)
    }

    fn record_patchset(&mut self, sql: &str) -> PathBuf {
        self.record_with(sql, true)
    }

    fn record_with(&mut self, sql: &str, patchset: bool) -> PathBuf {
        let mut bytes = Vec::new();
        {
            let mut session = Session::new(&self.conn).expect("session");
            session.attach(None).expect("attach");
            self.conn.execute_batch(sql).expect("edits");
            if patchset {
                session.patchset_strm(&mut bytes).expect("patchset");
            } else {
                session.changeset_strm(&mut bytes).expect("changeset");
            }
        }
        self.files += 1;
        let path = self.dir.path().join(format!("{:03}.cs", self.files));
        fs::write(&path, bytes).expect("write change-set");
        path
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

// ─── Log capture ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct CapturedEvents(Arc<Mutex<Vec<(Level, String)>>>);

impl CapturedEvents {
    fn at_least(&self, level: Level) -> Vec<String> {
        self.0
            .lock()
            .expect("capture lock")
            .iter()
            .filter(|(l, _)| *l <= level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.0
            .lock()
            .expect("capture lock")
            .push((*event.metadata().level(), visitor.0));
    }
}

fn with_captured_logs<T>(run: impl FnOnce() -> T) -> (T, CapturedEvents) {
    let events = CapturedEvents::default();
    let subscriber = Registry::default().with(events.clone());
    let out = tracing::subscriber::with_default(subscriber, run);
    (out, events)
}

// ─── Scenarios ──────────────────────────────────────────────────────────────

#[test]
fn test_insert_then_update_across_files_nets_to_insert() {
    let mut store = Store::new();
    let first = store.record("INSERT INTO bis_Element VALUES (100, 1, 'new');");
    let second = store.record("UPDATE bis_Element SET CodeValue = 'renamed' WHERE Id = 100;");

    let ids = extract_changed_instance_ids(&store.conn, &[first, second]).expect("extract");
    assert_eq!(ids.get(EntityCategory::Element, 100), Some(DbOpcode::Insert));
    assert_eq!(ids.len(), 1);
}

#[test]
fn test_delete_then_reinsert_is_an_update() {
    let mut store = Store::new();
    let delete = store.record("DELETE FROM bis_Element WHERE Id = 50;");
    let insert = store.record("INSERT INTO bis_Element VALUES (50, 1, 'again');");

    let forward =
        extract_changed_instance_ids(&store.conn, &[&delete, &insert]).expect("forward");
    assert_eq!(forward.get(EntityCategory::Element, 50), Some(DbOpcode::Update));

    let reversed =
        extract_changed_instance_ids(&store.conn, &[&insert, &delete]).expect("reversed");
    assert!(reversed.elements.is_empty());
}

#[test]
fn test_every_category_is_routed() {
    let mut store = Store::new();
    let path = store.record(
        "INSERT INTO bis_Element VALUES (101, 1, 'e');
         INSERT INTO bis_ElementUniqueAspect VALUES (201, 101);
         INSERT INTO bis_ElementMultiAspect VALUES (202, 101);
         INSERT INTO bis_Model VALUES (301, 1);
         INSERT INTO bis_ElementRefersToElements VALUES (401, 50, 101);
         INSERT INTO bis_CodeSpec VALUES (501, 'spec');
         INSERT INTO dgn_Font VALUES (3, 1, 'Arial');",
    );

    let ids = extract_changed_instance_ids(&store.conn, &[path]).expect("extract");
    assert_eq!(ids.get(EntityCategory::Element, 101), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Aspect, 201), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Aspect, 202), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Model, 301), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Relationship, 401), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::CodeSpec, 501), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Font, 3), Some(DbOpcode::Insert));
    assert_eq!(ids.len(), 7);
}

#[test]
fn test_font_ids_come_from_column_zero() {
    let mut store = Store::new();
    let path = store.record(
        "INSERT INTO dgn_Font VALUES (7, 1, 'Inserted');
         DELETE FROM dgn_Font WHERE Id = 4;",
    );
    let ids = extract_changed_instance_ids(&store.conn, &[path]).expect("extract");
    assert_eq!(ids.get(EntityCategory::Font, 7), Some(DbOpcode::Insert));
    assert_eq!(ids.get(EntityCategory::Font, 4), Some(DbOpcode::Delete));
}

#[test]
fn test_joined_rows_do_not_double_count() {
    let mut store = Store::new();
    let path = store.record(
        "INSERT INTO bis_Element VALUES (102, 1, 'geom');
         INSERT INTO bis_GeometricElement3d VALUES (102, x'00');",
    );
    let extractor =
        ChangedIdsExtractor::new(&store.conn, ExtractConfig::default()).expect("extractor");
    let mut ids = changeids_types::ChangedInstanceIds::new();
    let stats = extractor.extract_into(&mut ids, &[path]).expect("extract");

    assert_eq!(stats.changes, 2);
    assert_eq!(stats.recorded, 1);
    assert_eq!(stats.ignored, 1);
    assert_eq!(ids.get(EntityCategory::Element, 102), Some(DbOpcode::Insert));
}

#[test]
fn test_unmapped_table_is_silent() {
    let mut store = Store::new();
    let path = store.record("INSERT INTO tmp_Scratch VALUES (1, 'x');");

    let (ids, events) =
        with_captured_logs(|| extract_changed_instance_ids(&store.conn, &[path]).expect("extract"));
    assert!(ids.is_empty());
    assert!(events.at_least(Level::WARN).is_empty());
}

#[test]
fn test_rootless_mapped_table_warns_and_continues() {
    let mut store = Store::new();
    let path = store.record(
        "INSERT INTO be_Prop VALUES ('ns', 'name', 9);
         INSERT INTO bis_Element VALUES (103, 1, 'after');",
    );

    let (ids, events) =
        with_captured_logs(|| extract_changed_instance_ids(&store.conn, &[path]).expect("extract"));
    assert_eq!(ids.get(EntityCategory::Element, 103), Some(DbOpcode::Insert));
    let warnings = events.at_least(Level::WARN);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("no exclusive root class"));
}

#[test]
fn test_patchsets_extract_like_changesets() {
    let mut store = Store::new();
    let path = store.record_patchset(
        "UPDATE bis_Element SET CodeValue = 'patched' WHERE Id = 50;
         DELETE FROM dgn_Font WHERE Id = 4;",
    );
    let ids = extract_changed_instance_ids(&store.conn, &[path]).expect("extract");
    assert_eq!(ids.get(EntityCategory::Element, 50), Some(DbOpcode::Update));
    assert_eq!(ids.get(EntityCategory::Font, 4), Some(DbOpcode::Delete));
}

#[test]
fn test_schema_change_rejected_when_configured() {
    let mut store = Store::new();
    let path = store.record("INSERT INTO ec_Class VALUES (0x20, 1, 'NewClass');");

    let lenient = extract_changed_instance_ids(&store.conn, &[&path]).expect("ignored");
    assert!(lenient.is_empty());

    let config = ExtractConfig::from_toml_str("schema_changes = \"reject\"").expect("config");
    let strict = ChangedIdsExtractor::new(&store.conn, config).expect("extractor");
    let (err, events) = with_captured_logs(|| strict.extract(&[&path]).expect_err("rejected"));
    assert_eq!(err.status(), ExtractStatus::SchemaChanged);
    let errors = events.at_least(Level::ERROR);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("schema catalog"));
}

#[test]
fn test_malformed_font_row_is_logged_and_fatal() {
    let store = Store::new();
    let mut builder = ChangesetBuilder::new(ChangesetFormat::Changeset);
    builder.table("dgn_Font", &[0, 1]).insert(&[
        Some(SqliteValue::Integer(7)),
        Some(SqliteValue::Integer(1)),
    ]);
    let path = store.path().join("font.cs");
    fs::write(&path, builder.finish().expect("encode")).expect("write");

    let (err, events) = with_captured_logs(|| {
        extract_changed_instance_ids(&store.conn, &[&path]).expect_err("malformed")
    });
    assert_eq!(err.status(), ExtractStatus::UnknownFormat);
    let errors = events.at_least(Level::ERROR);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("legacy table row"));
}

#[test]
fn test_input_files_are_left_untouched() {
    let mut store = Store::new();
    let path = store.record("INSERT INTO bis_Element VALUES (104, 1, 'x');");
    let before = fs::read(&path).expect("read");
    extract_changed_instance_ids(&store.conn, &[&path]).expect("extract");
    assert_eq!(fs::read(&path).expect("read again"), before);
    assert!(store.path().join("001.cs").exists());
}
