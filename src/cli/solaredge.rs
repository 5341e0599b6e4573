use clap::Parser;

use crate::{
    api::{SolarEdge, solaredge::DEFAULT_URL},
    cli::db::DbPathArgs,
    core::cache::Hybrid,
};

#[derive(Parser)]
pub struct SolarEdgeArgs {
    /// SolarEdge monitoring API key.
    #[clap(long = "api-key", env = "SOLAREDGEAPI", hide_env_values = true)]
    api_key: String,

    #[clap(long = "api-url", env = "SOLAREDGE_API_URL", default_value = DEFAULT_URL)]
    api_url: String,
}

impl SolarEdgeArgs {
    pub fn new_client(&self) -> SolarEdge {
        SolarEdge::new(&self.api_key, &self.api_url)
    }
}

/// Everything needed to serve the data through the local cache.
#[derive(Parser)]
pub struct HybridArgs {
    #[clap(flatten)]
    solaredge: SolarEdgeArgs,

    #[clap(flatten)]
    db: DbPathArgs,
}

impl HybridArgs {
    pub fn open(&self) -> anyhow::Result<Hybrid<SolarEdge>> {
        let db = self.db.open_or_create()?;
        Ok(Hybrid::new(db, self.solaredge.new_client()))
    }
}
