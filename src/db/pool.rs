use rusqlite::Connection;
use std::sync::Mutex;

/// Connection pool for the control-plane catalog.
///
/// SQLite allows one writer at a time, so the pool keeps a single writer
/// connection behind a mutex and a small set of reader connections. Tenant
/// databases are NOT accessed through this pool — they are opened per
/// operation (see `tenant::database`), which keeps the privileged catalog
/// handle distinct from per-tenant connections.
pub struct CatalogPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
}

impl CatalogPool {
    pub fn open(path: &str, reader_count: usize) -> anyhow::Result<Self> {
        let writer = Connection::open(path)?;
        writer.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        let mut readers = Vec::with_capacity(reader_count);
        for _ in 0..reader_count {
            let r = Connection::open(path)?;
            r.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            readers.push(Mutex::new(r));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
        })
    }

    /// Run `f` on the writer connection. Serialised across the process.
    pub fn write<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("catalog writer lock poisoned"))?;
        f(&conn)
    }

    /// Run `f` on the first free reader connection, blocking on the first
    /// reader if all are busy.
    pub fn read<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T>,
    {
        for reader in &self.readers {
            if let Ok(conn) = reader.try_lock() {
                return f(&conn);
            }
        }
        let conn = self.readers[0]
            .lock()
            .map_err(|_| anyhow::anyhow!("catalog reader lock poisoned"))?;
        f(&conn)
    }
}
