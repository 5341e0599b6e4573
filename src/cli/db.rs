use std::{env, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::{db::Db, prelude::*};

const DEFAULT_FILE_NAME: &str = "edgydata.db";

#[derive(Parser)]
pub struct DbPathArgs {
    /// SQLite database path, `$HOME/edgydata.db` by default.
    #[clap(long = "db-path", env = "EDGYDATA_DB")]
    path: Option<PathBuf>,
}

impl DbPathArgs {
    fn path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            env::var_os("HOME")
                .map_or_else(|| PathBuf::from(DEFAULT_FILE_NAME), |home| PathBuf::from(home).join(DEFAULT_FILE_NAME))
        })
    }

    pub fn open(&self) -> anyhow::Result<Db> {
        let path = self.path();
        Db::open(&path).with_context(|| format!("failed to open `{}`", path.display()))
    }

    pub fn open_or_create(&self) -> anyhow::Result<Db> {
        let mut db = self.open()?;
        if !db.is_present()? {
            info!(path = %db.path().display(), "creating the local database…");
            db.create()?;
        }
        Ok(db)
    }
}

#[derive(Parser)]
pub struct DbArgs {
    #[clap(flatten)]
    path: DbPathArgs,

    #[command(subcommand)]
    command: DbCommand,
}

#[derive(Subcommand)]
pub enum DbCommand {
    /// Tell whether the database exists.
    Status,

    /// Create the tables.
    Create,

    /// Delete the database file.
    Destroy,
}

impl DbArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> anyhow::Result<()> {
        let mut db = self.path.open()?;
        match self.command {
            DbCommand::Status => {
                let status = if db.is_present()? { "present" } else { "absent" };
                println!("{}: {status}", db.path().display());
            }
            DbCommand::Create => {
                db.create().context("failed to create the database")?;
            }
            DbCommand::Destroy => {
                db.destroy().context("failed to destroy the database")?;
            }
        }
        Ok(())
    }
}
