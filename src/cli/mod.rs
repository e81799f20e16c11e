pub mod extract;
pub mod init;
pub mod purge;
pub mod sync;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::error::Result;
#[cfg(not(feature = "xlsx"))]
use crate::error::SyncError;
use crate::extractor::{self, Extraction};
use crate::plan::{LayoutSpec, ResolvedPlan, Source, SourceSpec, SyncPlan};
use crate::uploader::{RetryPolicy, DEFAULT_BATCH_SIZE};

#[derive(Parser)]
#[command(name = "roomsync", about = "Sync reservation spreadsheets into the remote reservations table.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save the store URL and service key.
    Init {
        /// Base URL of the store, e.g. https://xyz.supabase.co
        #[arg(long)]
        url: String,
        /// Table holding reservations
        #[arg(long, default_value = "reservations")]
        table: String,
        /// Per-request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Read a sheet and show what would be uploaded, without touching the store.
    Extract {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Replace the store's records in each source's date range with the sheet rows.
    Sync {
        #[command(flatten)]
        run: RunArgs,
        /// Extract and report only; make no remote calls
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Delete every remote record in a date range.
    Purge {
        /// Start bound: YYYY, YYYY-MM or YYYY-MM-DD
        #[arg(long = "from")]
        from: String,
        /// End bound: YYYY, YYYY-MM or YYYY-MM-DD
        #[arg(long = "to")]
        to: String,
        /// Confirm the delete
        #[arg(long)]
        yes: bool,
    },
}

/// Either a plan file or the flags describing a single source.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON sync plan listing one or more sources
    #[arg(long, conflicts_with_all = ["file", "sheet", "from", "to"])]
    pub plan: Option<PathBuf>,
    /// Spreadsheet to read (xlsx, xls, ods)
    #[arg(required_unless_present = "plan")]
    pub file: Option<PathBuf>,
    /// Sheet name
    #[arg(long, required_unless_present = "plan")]
    pub sheet: Option<String>,
    /// Start bound: YYYY, YYYY-MM or YYYY-MM-DD
    #[arg(long = "from", required_unless_present = "plan")]
    pub from: Option<String>,
    /// End bound: YYYY, YYYY-MM or YYYY-MM-DD
    #[arg(long = "to", required_unless_present = "plan")]
    pub to: Option<String>,
    /// Column layout: full (with total column) or short
    #[arg(long, default_value = "full")]
    pub layout: String,
    /// Reject rows with an empty category even when a default is given
    #[arg(long = "strict-category")]
    pub strict_category: bool,
    /// Category used for empty (or disallowed) categories; without it empty categories reject the row
    #[arg(long = "category-default")]
    pub category_default: Option<String>,
    /// Restrict categories to this set (repeatable); others become the default
    #[arg(long = "allow-category", requires = "category_default")]
    pub allowed_categories: Vec<String>,
    /// People count used when the cell is empty or unreadable
    #[arg(long = "people-default", default_value = "0")]
    pub people_default: u64,
    /// Rows per insert request
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Attempts per batch (1 = no retry, at most 3)
    #[arg(long, default_value = "1")]
    pub attempts: u32,
}

impl RunArgs {
    /// Build and validate the plan. Fails before any sheet is read or remote call made.
    pub fn resolve(&self) -> Result<ResolvedPlan> {
        if let Some(path) = &self.plan {
            let plan = SyncPlan::load(path)?;
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            return plan.resolve(base);
        }
        let spec = SourceSpec {
            file: self.file.clone().unwrap_or_default(),
            sheet: self.sheet.clone().unwrap_or_default(),
            layout: LayoutSpec::Preset(self.layout.clone()),
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            category_default: self.category_default.clone(),
            strict_category: self.strict_category,
            allowed_categories: (!self.allowed_categories.is_empty()).then(|| self.allowed_categories.clone()),
            people_default: self.people_default,
            header_sentinels: Vec::new(),
        };
        let plan = SyncPlan {
            batch_size: self.batch_size,
            retry: RetryPolicy {
                max_attempts: self.attempts,
                ..RetryPolicy::default()
            },
            sources: vec![spec],
        };
        plan.resolve(Path::new(""))
    }
}

/// Read and extract every source, in plan order. Any unreadable workbook or
/// missing sheet fails the whole run here, before the store is contacted.
pub(crate) fn extract_sources(plan: &ResolvedPlan) -> Result<Vec<(Source, Extraction)>> {
    let mut out = Vec::with_capacity(plan.sources.len());
    for source in &plan.sources {
        let rows = read_rows(source)?;
        info!(file = %source.file.display(), sheet = %source.sheet, rows = rows.len(), "read sheet");
        let extraction = extractor::extract(rows, &source.config);
        out.push((source.clone(), extraction));
    }
    Ok(out)
}

#[cfg(feature = "xlsx")]
fn read_rows(source: &Source) -> Result<Vec<crate::models::RawRow>> {
    extractor::read_sheet(&source.file, &source.sheet)
}

#[cfg(not(feature = "xlsx"))]
fn read_rows(_source: &Source) -> Result<Vec<crate::models::RawRow>> {
    Err(SyncError::Workbook("built without spreadsheet support (enable the `xlsx` feature)".into()))
}
