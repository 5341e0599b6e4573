//! Local SQLite mirror of the sites and their power periods.

mod power;
mod site;
mod timestamp;

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use rusqlite::Connection;

use crate::{
    core::{
        period::PowerPeriod,
        site::{Site, SiteId, TimeLimits},
        source::{Source, single_site_id},
        time::Timestamp,
    },
    prelude::*,
};

#[must_use]
pub struct Db {
    path: PathBuf,

    /// Closed after the database got destroyed.
    connection: Option<Connection>,
}

impl Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Db({})", self.path.display())
    }
}

impl Db {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(&path)?;
        debug!("opened");
        Ok(Self { path, connection: Some(connection) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(Error::Closed)
    }

    /// Check whether the tables exist.
    pub fn is_present(&self) -> Result<bool> {
        let Some(connection) = &self.connection else {
            return Ok(false);
        };
        let n_tables: i64 = connection.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        Ok(n_tables != 0)
    }

    /// Create the tables, refusing to touch an existing database.
    ///
    /// The connection gets re-opened once if it has been closed by [`Db::destroy`].
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn create(&mut self) -> Result {
        match self.try_create() {
            Err(Error::Closed) => {
                info!("re-opening…");
                self.connection = Some(Connection::open(&self.path)?);
                self.try_create()
            }
            result => result,
        }
    }

    fn try_create(&self) -> Result {
        if self.is_present()? {
            return Err(Error::AlreadyPresent);
        }
        self.connection()?.execute_batch(
            "BEGIN;
            CREATE TABLE site (
                site_id         INTEGER NOT NULL PRIMARY KEY,
                name            TEXT NOT NULL,
                start_date      INTEGER NOT NULL,
                end_date        INTEGER NOT NULL,
                peak_power      REAL NOT NULL,
                lifetime_energy REAL,
                country         TEXT,
                timezone        TEXT
            );
            CREATE TABLE power (
                site_id         INTEGER NOT NULL,
                start_time      INTEGER NOT NULL,
                duration        INTEGER NOT NULL,
                consumed        REAL NOT NULL,
                exported        REAL NOT NULL,
                generated       REAL NOT NULL,
                imported        REAL NOT NULL,
                self_consumed   REAL NOT NULL,
                PRIMARY KEY (site_id, start_time)
            );
            COMMIT;",
        )?;
        info!("created");
        Ok(())
    }

    /// Close the connection and remove the database file.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn destroy(&mut self) -> Result {
        if !self.is_present()? {
            warn!("no database present");
            return Ok(());
        }
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(|(_, error)| error)?;
        }
        fs::remove_file(&self.path)?;
        info!("destroyed");
        Ok(())
    }
}

impl Source for Db {
    fn get_site_ids(&self) -> Result<Vec<SiteId>> {
        self.get_cached_site_ids()
    }

    fn get_site(&self, site_id: Option<SiteId>) -> Result<Site> {
        let site_id = match site_id {
            Some(site_id) => site_id,
            None => single_site_id(&self.get_cached_site_ids()?)?,
        };
        self.get_cached_site(site_id)
    }

    fn get_time_limits(&self, site_id: SiteId) -> Result<Option<TimeLimits>> {
        self.get_cached_time_limits(site_id)
    }

    fn get_power(
        &self,
        site_id: SiteId,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Vec<PowerPeriod>> {
        self.get_cached_power(site_id, start, end)
    }
}

#[cfg(test)]
pub mod tests {
    use tempfile::TempDir;

    use super::*;

    pub fn new_db() -> (TempDir, Db) {
        let directory = tempfile::tempdir().unwrap();
        let mut db = Db::open(directory.path().join("edgydata.db")).unwrap();
        db.create().unwrap();
        (directory, db)
    }

    #[test]
    fn test_lifecycle() -> Result {
        let directory = tempfile::tempdir()?;
        let mut db = Db::open(directory.path().join("nested").join("edgydata.db"))?;
        assert!(!db.is_present()?);

        db.create()?;
        assert!(db.is_present()?);
        assert!(matches!(db.create(), Err(Error::AlreadyPresent)));

        db.destroy()?;
        assert!(!db.is_present()?);
        assert!(!db.path().exists());

        // Re-opens the closed connection.
        db.create()?;
        assert!(db.is_present()?);
        Ok(())
    }

    #[test]
    fn test_destroy_missing() -> Result {
        let directory = tempfile::tempdir()?;
        let mut db = Db::open(directory.path().join("edgydata.db"))?;
        db.destroy()?;
        Ok(())
    }
}
