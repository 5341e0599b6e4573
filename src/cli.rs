mod db;
mod power;
mod site;
mod solaredge;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::cli::{
    db::DbArgs,
    power::{DailyArgs, PowerArgs},
    site::{SiteArgs, SitesArgs},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Maximum level of the log events.
    #[clap(long, env = "EDGYDATA_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List all the sites of the account.
    Sites(SitesArgs),

    /// Show the site details.
    Site(SiteArgs),

    /// Show the power periods, fetching what is not cached yet.
    Power(Box<PowerArgs>),

    /// Show the average power per calendar day.
    Daily(Box<DailyArgs>),

    /// Manage the local database.
    Db(DbArgs),
}

impl Command {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Sites(args) => args.run(),
            Self::Site(args) => args.run(),
            Self::Power(args) => (*args).run(),
            Self::Daily(args) => (*args).run(),
            Self::Db(args) => args.run(),
        }
    }
}
