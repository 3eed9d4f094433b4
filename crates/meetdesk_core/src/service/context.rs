//! Shared collaborators handed to every service.

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::events::bus::{ChangeBus, ChangeEvent};
use crate::model::kind::EntityKind;
use crate::model::workspace::WorkspaceId;
use std::sync::Arc;

/// Bus, clock and configuration shared by all services of one store.
///
/// Cheap to clone; clones share the same subscribers.
#[derive(Clone)]
pub struct ServiceContext {
    bus: ChangeBus,
    clock: Arc<dyn Clock>,
    config: Arc<StoreConfig>,
}

impl ServiceContext {
    pub fn new(bus: ChangeBus, clock: Arc<dyn Clock>, config: StoreConfig) -> Self {
        Self {
            bus,
            clock,
            config: Arc::new(config),
        }
    }

    /// Production wiring: fresh bus, system clock, default configuration.
    pub fn system() -> Self {
        Self::new(ChangeBus::new(), Arc::new(SystemClock), StoreConfig::default())
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn notify(&self, workspace: &WorkspaceId, kind: EntityKind) {
        self.bus.emit(ChangeEvent::new(workspace, kind));
    }
}
