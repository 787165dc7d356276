//! The database client: owns the connection, registers model types, and
//! serializes writers.
//!
//! Two locks coordinate access. The state lock is a short-duration mutex
//! around the connection handle and the in-flight transaction token. The
//! writer gate enforces the single-writer rule the embedded engine imposes:
//! it is held for the full duration of any write outside a transaction, and
//! for the full lifetime of any transaction. Reads take only the state
//! lock.
//!
//! Writes issued while a transaction is open join it — the connection is
//! the transaction scope.

use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};

use model_store_core::{ListOptions, Model, Predicate};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::schema;
use crate::table::Table;

/// Renders DDL for a registered model type.
type DdlFn = Box<dyn Fn() -> Result<Vec<String>> + Send + Sync>;

struct State {
    conn: Option<Connection>,
    tx: Option<u64>,
    next_tx: u64,
}

/// Client for a single SQLite database file.
///
/// Model types registered before [`open`](Self::open) get their schema
/// created when the database opens. The client may be shared across
/// threads; writers are serialized internally.
///
/// # Example
///
/// ```no_run
/// use model_store_core::{Field, Model, ValueCell};
/// use model_store_sqlite::Client;
///
/// #[derive(Default)]
/// struct Label {
///     id: String,
///     name: String,
/// }
///
/// impl Model for Label {
///     fn table_name() -> &'static str {
///         "Label"
///     }
///
///     fn fields(&mut self) -> Vec<Field<'_>> {
///         vec![
///             Field::new("ID", "pk", ValueCell::Text(&mut self.id)),
///             Field::new("Name", "key", ValueCell::Text(&mut self.name)),
///         ]
///     }
/// }
///
/// let mut client = Client::new("inventory.db");
/// client.register::<Label>();
/// client.open(false).unwrap();
///
/// let mut label = Label { id: String::new(), name: "alpha".into() };
/// client.insert(&mut label).unwrap();
///
/// let tx = client.begin().unwrap();
/// client.insert(&mut Label { id: String::new(), name: "beta".into() }).unwrap();
/// tx.commit().unwrap();
/// ```
pub struct Client {
    path: PathBuf,
    models: Vec<DdlFn>,
    state: Mutex<State>,
    writer: WriterGate,
}

impl Client {
    /// Create a client for the database file at `path`. The database is not
    /// touched until [`open`](Self::open).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Client {
            path: path.as_ref().to_path_buf(),
            models: Vec::new(),
            state: Mutex::new(State {
                conn: None,
                tx: None,
                next_tx: 0,
            }),
            writer: WriterGate::new(),
        }
    }

    /// Register a model type; its schema is created at open.
    pub fn register<M: Model + Default + 'static>(&mut self) {
        self.models.push(Box::new(schema::model_ddl::<M>));
    }

    /// Open the database and build the schema for every registered model.
    /// Optionally purge (delete) the file first. Schema errors are fatal to
    /// the open.
    pub fn open(&self, purge: bool) -> Result<()> {
        if purge {
            let _ = std::fs::remove_file(&self.path);
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for ddl in &self.models {
            for statement in ddl()? {
                conn.execute_batch(&statement)?;
            }
        }
        let mut state = self.lock_state();
        state.conn = Some(conn);
        info!(path = %self.path.display(), "database opened");
        Ok(())
    }

    /// Close the database; optionally purge (delete) the file.
    pub fn close(&self, purge: bool) -> Result<()> {
        let mut state = self.lock_state();
        state.conn = None;
        drop(state);
        if purge {
            let _ = std::fs::remove_file(&self.path);
        }
        Ok(())
    }

    /// Insert a model. Outside a transaction the writer gate is held for
    /// the duration of the call.
    pub fn insert<M: Model>(&self, model: &mut M) -> Result<()> {
        self.write(|conn| Table::new(conn).insert(model))
    }

    /// Update a model; see [`Table::update`](crate::Table::update).
    pub fn update<M: Model>(&self, model: &mut M) -> Result<()> {
        self.write(|conn| Table::new(conn).update(model))
    }

    /// Delete a model; see [`Table::delete`](crate::Table::delete).
    pub fn delete<M: Model>(&self, model: &mut M) -> Result<()> {
        self.write(|conn| Table::new(conn).delete(model))
    }

    /// Fetch a model by pk.
    pub fn get<M: Model>(&self, model: &mut M) -> Result<()> {
        self.read(|conn| Table::new(conn).get(model))
    }

    /// List models qualified by the options.
    pub fn list<M: Model + Default>(&self, options: &mut ListOptions) -> Result<Vec<M>> {
        self.read(|conn| Table::new(conn).list(options))
    }

    /// Count models matching the predicate; all rows when `None`.
    pub fn count<M: Model + Default>(&self, predicate: Option<Predicate>) -> Result<i64> {
        self.read(|conn| Table::new(conn).count::<M>(predicate))
    }

    /// Begin a transaction. The writer gate is held until the returned
    /// token is committed, rolled back, or dropped; writes issued meanwhile
    /// join the transaction.
    pub fn begin(&self) -> Result<Tx<'_>> {
        self.writer.acquire();
        let mut state = self.lock_state();
        let started = match state.conn.as_ref() {
            Some(conn) => conn.execute_batch("BEGIN;").map_err(StoreError::from),
            None => Err(StoreError::NotOpen),
        };
        if let Err(error) = started {
            drop(state);
            self.writer.release();
            return Err(error);
        }
        let id = state.next_tx;
        state.next_tx += 1;
        state.tx = Some(id);
        debug!(tx = id, "transaction begun");
        Ok(Tx { client: self, id })
    }

    /// Complete the in-flight transaction. The gate is released even when
    /// the completion statement fails.
    fn finish_tx(&self, tx: &Tx<'_>, sql: &str) -> Result<()> {
        let mut state = self.lock_state();
        if state.tx != Some(tx.id) {
            return Err(StoreError::TxInvalid);
        }
        state.tx = None;
        let result = match state.conn.as_ref() {
            Some(conn) => conn.execute_batch(sql).map_err(StoreError::from),
            None => Err(StoreError::NotOpen),
        };
        drop(state);
        self.writer.release();
        debug!(tx = tx.id, "transaction finished");
        result
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let state = self.lock_state();
        let conn = state.conn.as_ref().ok_or(StoreError::NotOpen)?;
        op(conn)
    }

    fn write<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        {
            let state = self.lock_state();
            if state.tx.is_some() {
                let conn = state.conn.as_ref().ok_or(StoreError::NotOpen)?;
                return op(conn);
            }
        }
        let _writer = self.writer.guard();
        // A transaction cannot begin while the gate is held.
        let state = self.lock_state();
        let conn = state.conn.as_ref().ok_or(StoreError::NotOpen)?;
        op(conn)
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Transaction token returned by [`Client::begin`].
///
/// Dropping an unresolved token rolls the transaction back, releasing the
/// writer gate on every exit path.
pub struct Tx<'c> {
    client: &'c Client,
    id: u64,
}

impl Tx<'_> {
    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// [`StoreError::TxInvalid`] when this token no longer refers to the
    /// client's in-flight transaction.
    pub fn commit(&self) -> Result<()> {
        self.client.finish_tx(self, "COMMIT;")
    }

    /// Roll the transaction back. `TxInvalid` as for
    /// [`commit`](Self::commit).
    pub fn rollback(&self) -> Result<()> {
        self.client.finish_tx(self, "ROLLBACK;")
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        // An already-resolved token is rejected by the client.
        let _ = self.client.finish_tx(self, "ROLLBACK;");
    }
}

/// Mutex-and-condvar gate enforcing the single-writer rule.
///
/// Unlike a plain mutex guard, acquisition and release may happen in
/// different calls, which is what lets a transaction hold the gate for its
/// whole lifetime.
struct WriterGate {
    held: Mutex<bool>,
    released: Condvar,
}

impl WriterGate {
    fn new() -> Self {
        WriterGate {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut held = self.lock();
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *held = true;
    }

    fn release(&self) {
        let mut held = self.lock();
        *held = false;
        self.released.notify_one();
    }

    /// Scoped acquisition for non-transactional writes.
    fn guard(&self) -> WriterGuard<'_> {
        self.acquire();
        WriterGuard { gate: self }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct WriterGuard<'g> {
    gate: &'g WriterGate,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_store_core::{Field, ValueCell};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Label {
        id: String,
        name: String,
    }

    impl Model for Label {
        fn table_name() -> &'static str {
            "Label"
        }

        fn fields(&mut self) -> Vec<Field<'_>> {
            vec![
                Field::new("ID", "pk", ValueCell::Text(&mut self.id)),
                Field::new("Name", "key", ValueCell::Text(&mut self.name)),
            ]
        }
    }

    fn temp_db(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("model_store_client_tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_operations_require_open() {
        let client = Client::new(temp_db("unopened.db"));
        let mut label = Label::default();
        assert!(matches!(
            client.get(&mut label),
            Err(StoreError::NotOpen)
        ));
        assert!(matches!(
            client.insert(&mut label),
            Err(StoreError::NotOpen)
        ));
    }

    #[test]
    fn test_open_creates_schema_and_purges() {
        let path = temp_db("schema.db");
        let mut client = Client::new(&path);
        client.register::<Label>();
        client.open(true).unwrap();

        let mut label = Label {
            id: String::new(),
            name: "alpha".to_string(),
        };
        client.insert(&mut label).unwrap();
        client.close(false).unwrap();

        // Reopening without purge keeps the row.
        client.open(false).unwrap();
        assert_eq!(client.count::<Label>(None).unwrap(), 1);

        // Purging at open drops it.
        client.close(false).unwrap();
        client.open(true).unwrap();
        assert_eq!(client.count::<Label>(None).unwrap(), 0);
        client.close(true).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_writer_gate_blocks_until_released() {
        let gate = Arc::new(WriterGate::new());
        let entered = Arc::new(AtomicBool::new(false));

        gate.acquire();
        let handle = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                gate.acquire();
                entered.store(true, Ordering::SeqCst);
                gate.release();
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        gate.release();
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_writer_guard_releases_on_drop() {
        let gate = WriterGate::new();
        {
            let _guard = gate.guard();
            assert!(*gate.lock());
        }
        assert!(!*gate.lock());
    }
}
