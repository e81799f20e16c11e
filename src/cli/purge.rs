use colored::Colorize;

use crate::dates::DateRange;
use crate::error::{Result, SyncError};
use crate::settings::load_settings;
use crate::store::{RecordStore, RestStore};

pub fn run(from: &str, to: &str, yes: bool) -> Result<()> {
    let range = DateRange::parse(from, to)?;
    if !yes {
        return Err(SyncError::Other(format!(
            "Refusing to delete every record in {range} without --yes"
        )));
    }
    let store = RestStore::new(&load_settings()?)?;
    store.delete_range(&range)?;
    println!("{} {range}", "Deleted".green());
    Ok(())
}
