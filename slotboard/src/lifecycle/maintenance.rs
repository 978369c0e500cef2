use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::batch::executor::BatchExecutor;
use crate::batch::types::BatchOperationResult;
use crate::lifecycle::apply_to_each;
use crate::lifecycle::state_machine::Action;
use crate::slot::model::{Slot, SlotId};
use crate::slot::store::SlotStore;
use crate::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceOperation {
    Enable,
    Disable,
}

impl fmt::Display for MaintenanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaintenanceOperation::Enable => "enable",
            MaintenanceOperation::Disable => "disable",
        })
    }
}

impl FromStr for MaintenanceOperation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(MaintenanceOperation::Enable),
            "disable" => Ok(MaintenanceOperation::Disable),
            other => Err(anyhow::anyhow!("Invalid MaintenanceOperation value: {}", other)),
        }
    }
}

/// Moves slots into and out of maintenance.
///
/// Enabling never evicts an active reservation; such slots fail with
/// `RESERVATION_CONFLICT`. Disabling restores the status implied by `product_id`.
#[derive(Clone)]
pub struct MaintenanceController {
    store: Arc<SlotStore>,
    executor: BatchExecutor,
    clock: Arc<dyn Clock>,
}

impl MaintenanceController {
    pub fn new(store: Arc<SlotStore>, executor: BatchExecutor, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            executor,
            clock,
        }
    }

    pub async fn set(
        &self,
        slot_ids: &[SlotId],
        operation: MaintenanceOperation,
    ) -> BatchOperationResult<Slot> {
        let (name, action) = match operation {
            MaintenanceOperation::Enable => ("enable_maintenance", Action::EnableMaintenance),
            MaintenanceOperation::Disable => ("disable_maintenance", Action::DisableMaintenance),
        };
        let now = self.clock.now();

        apply_to_each(&self.executor, &self.store, name, slot_ids, action, now).await
    }
}
