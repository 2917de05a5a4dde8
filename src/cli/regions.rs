//! Regions command implementation

use crate::catalog::RegionCatalog;
use clap::Parser;

use super::CliError;

/// List the known region directory.
#[derive(Parser, Debug)]
pub struct RegionsCommand {}

impl RegionsCommand {
    /// Print every region the catalog knows.
    pub fn execute(&self) -> Result<(), CliError> {
        let catalog = RegionCatalog::builtin();
        println!("Known regions ({}):", catalog.regions().len());
        println!("  IBGE  CODE  NAME");
        for region in catalog.regions() {
            println!(
                "  {:<4}  {:<4}  {}",
                region.ibge_code, region.code, region.name
            );
        }
        Ok(())
    }
}
