use super::{ChangeSet, JournalEntry, ProjectSnapshot, ScheduleStore, StoreError, StoreResult};
use crate::calendar::WorkCalendarConfig;
use crate::entity::{FollowsRelation, ScheduledEntity};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;

pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self { connection })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS working_calendar (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY,
                start_date TEXT,
                due_date TEXT,
                entity_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS follows_relations (
                predecessor INTEGER NOT NULL,
                successor INTEGER NOT NULL,
                lag INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (predecessor, successor)
            );
            CREATE TABLE IF NOT EXISTS journal (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id INTEGER NOT NULL,
                entry_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn write_calendar(tx: &Transaction, config: &WorkCalendarConfig) -> StoreResult<()> {
        let json = serde_json::to_string(config)?;
        tx.execute("DELETE FROM working_calendar", [])?;
        tx.execute(
            "INSERT INTO working_calendar (id, config_json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn insert_entities(tx: &Transaction, entities: &[ScheduledEntity]) -> StoreResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO entities (id, start_date, due_date, entity_json) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for entity in entities {
            let json = serde_json::to_string(entity)?;
            stmt.execute(params![
                entity.id,
                entity.start_date.map(|d| d.to_string()),
                entity.due_date.map(|d| d.to_string()),
                json
            ])?;
        }
        Ok(())
    }

    fn insert_relations(tx: &Transaction, relations: &[FollowsRelation]) -> StoreResult<()> {
        let mut stmt = tx.prepare(
            "INSERT INTO follows_relations (predecessor, successor, lag) VALUES (?1, ?2, ?3)",
        )?;
        for relation in relations {
            stmt.execute(params![relation.predecessor, relation.successor, relation.lag])?;
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteStore {
    fn load_calendar(&self) -> StoreResult<Option<WorkCalendarConfig>> {
        let mut stmt = self
            .connection
            .prepare("SELECT config_json FROM working_calendar WHERE id = 1")?;
        let json: Option<String> = stmt.query_row([], |row| row.get(0)).optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn load_entities(&self) -> StoreResult<Vec<ScheduledEntity>> {
        // ISO dates sort correctly as text; unset dates come first.
        let mut stmt = self.connection.prepare(
            "SELECT entity_json FROM entities
             ORDER BY start_date IS NOT NULL, start_date, due_date IS NOT NULL, due_date, id",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for json in rows {
            let json = json?;
            entities.push(serde_json::from_str::<ScheduledEntity>(&json)?);
        }
        Ok(entities)
    }

    fn load_relations(&self) -> StoreResult<Vec<FollowsRelation>> {
        let mut stmt = self.connection.prepare(
            "SELECT predecessor, successor, lag FROM follows_relations
             ORDER BY predecessor, successor",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FollowsRelation {
                predecessor: row.get(0)?,
                successor: row.get(1)?,
                lag: row.get(2)?,
            })
        })?;

        let mut relations = Vec::new();
        for relation in rows {
            relations.push(relation?);
        }
        Ok(relations)
    }

    fn commit(&mut self, change_set: &ChangeSet) -> StoreResult<()> {
        // Dropping the transaction on an early return rolls it back.
        let tx = self.connection.transaction()?;
        if let Some(calendar) = &change_set.calendar {
            Self::write_calendar(&tx, calendar)?;
        }
        {
            let mut update = tx.prepare(
                "UPDATE entities SET start_date = ?2, due_date = ?3, entity_json = ?4 WHERE id = ?1",
            )?;
            for entity in &change_set.entities {
                let json = serde_json::to_string(entity)?;
                let updated = update.execute(params![
                    entity.id,
                    entity.start_date.map(|d| d.to_string()),
                    entity.due_date.map(|d| d.to_string()),
                    json
                ])?;
                if updated == 0 {
                    return Err(StoreError::NotFound(entity.id));
                }
            }

            let mut exists = tx.prepare("SELECT 1 FROM entities WHERE id = ?1")?;
            let mut insert =
                tx.prepare("INSERT INTO journal (entity_id, entry_json) VALUES (?1, ?2)")?;
            for entry in &change_set.journal {
                if !exists.exists(params![entry.entity_id])? {
                    return Err(StoreError::NotFound(entry.entity_id));
                }
                let json = serde_json::to_string(entry)?;
                insert.execute(params![entry.entity_id, json])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_journal(&self) -> StoreResult<Vec<JournalEntry>> {
        let mut stmt = self
            .connection
            .prepare("SELECT entry_json FROM journal ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut journal = Vec::new();
        for json in rows {
            let json = json?;
            journal.push(serde_json::from_str::<JournalEntry>(&json)?);
        }
        Ok(journal)
    }

    fn replace_project(&mut self, snapshot: &ProjectSnapshot) -> StoreResult<()> {
        super::validate_snapshot(snapshot)?;
        let tx = self.connection.transaction()?;
        if let Some(calendar) = &snapshot.calendar {
            Self::write_calendar(&tx, calendar)?;
        }
        tx.execute("DELETE FROM journal", [])?;
        tx.execute("DELETE FROM follows_relations", [])?;
        tx.execute("DELETE FROM entities", [])?;
        Self::insert_entities(&tx, &snapshot.entities)?;
        Self::insert_relations(&tx, &snapshot.relations)?;
        tx.commit()?;
        Ok(())
    }
}
