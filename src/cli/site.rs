use clap::Parser;

use crate::{
    cli::solaredge::HybridArgs,
    core::{site::SiteId, source::Source},
    prelude::*,
    tables::build_sites_table,
};

#[derive(Parser)]
pub struct SitesArgs {
    #[clap(flatten)]
    source: HybridArgs,
}

impl SitesArgs {
    #[instrument(skip_all)]
    pub fn run(self) -> anyhow::Result<()> {
        let sites = self.source.open()?.get_sites()?;
        info!(n_sites = sites.len(), "fetched");
        println!("{}", build_sites_table(&sites));
        Ok(())
    }
}

#[derive(Parser)]
pub struct SiteSelectionArgs {
    /// Site identifier, may be omitted when the account has only one site.
    #[clap(long = "site-id", env = "EDGYDATA_SITE_ID")]
    pub site_id: Option<SiteId>,
}

#[derive(Parser)]
pub struct SiteArgs {
    #[clap(flatten)]
    source: HybridArgs,

    #[clap(flatten)]
    selection: SiteSelectionArgs,
}

impl SiteArgs {
    #[instrument(skip_all, fields(site_id = ?self.selection.site_id))]
    pub fn run(self) -> anyhow::Result<()> {
        let site = self.source.open()?.get_site(self.selection.site_id)?;
        println!("{}", build_sites_table(&[site]));
        Ok(())
    }
}
