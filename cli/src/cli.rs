use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use slotboard::slot::model::{SLOT_COUNT, SlotId};
use slotboard::{DraftStatus, MaintenanceOperation};

#[derive(Debug, Parser)]
#[clap(name = "slotboard", version)]
pub struct Cli {
    /// Database connection string (overrides DATABASE_URL)
    #[clap(long)]
    pub database_url: Option<String>,

    /// Identity recorded as the caller of every request
    #[clap(long, env = "SLOTBOARD_ACTOR", default_value = "admin")]
    pub actor: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the slot table and its fixed rows if missing
    Seed,

    /// Show current slot rows (all slots when no ids are given)
    Status {
        #[clap(value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Check which slots can take a new product
    Verify {
        #[clap(value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Put slots into maintenance or bring them back
    Maintenance {
        #[clap(value_enum)]
        mode: MaintenanceCli,
        #[clap(required = true, value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Remove products from slots
    Clear {
        #[clap(required = true, value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Hold slots until a point in time (RFC 3339)
    Reserve {
        #[clap(long)]
        until: DateTime<Utc>,
        #[clap(long)]
        by: String,
        #[clap(required = true, value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Release holds
    Cancel {
        #[clap(required = true, value_delimiter = ',')]
        ids: Vec<SlotId>,
    },

    /// Place a product in one slot
    Assign {
        slot_id: SlotId,
        product_id: String,
        #[clap(long)]
        start: Option<DateTime<Utc>>,
        #[clap(long)]
        end: Option<DateTime<Utc>>,
    },

    /// Move the draft workflow of slots
    Draft {
        #[clap(value_enum)]
        status: DraftCli,
        #[clap(required = true, value_delimiter = ',')]
        ids: Vec<SlotId>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MaintenanceCli {
    Enable,
    Disable,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DraftCli {
    Empty,
    Drafting,
    ReadyToPublish,
}

impl From<MaintenanceCli> for MaintenanceOperation {
    fn from(m: MaintenanceCli) -> Self {
        match m {
            MaintenanceCli::Enable => MaintenanceOperation::Enable,
            MaintenanceCli::Disable => MaintenanceOperation::Disable,
        }
    }
}

impl From<DraftCli> for DraftStatus {
    fn from(d: DraftCli) -> Self {
        match d {
            DraftCli::Empty => DraftStatus::Empty,
            DraftCli::Drafting => DraftStatus::Drafting,
            DraftCli::ReadyToPublish => DraftStatus::ReadyToPublish,
        }
    }
}

/// An empty selection means every slot.
pub(crate) fn ids_or_all(ids: Vec<SlotId>) -> Vec<SlotId> {
    if ids.is_empty() {
        (1..=SLOT_COUNT).collect()
    } else {
        ids
    }
}
