//! Upserters for the infrastructure entity types
//!
//! Locations, nodes, allocations, nests and eggs. These all follow the
//! same shape: look up by panel id, refresh panel-owned fields on a hit,
//! create a fresh row on a miss. Child-scoped types (allocations, eggs)
//! carry their parent's panel id from the listing context.

use std::sync::Arc;

use chrono::Utc;

use panelsync_core::domain::merge;
use panelsync_core::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode,
};
use panelsync_core::domain::run::UpsertOutcome;
use panelsync_core::ports::mirror_repository::IMirrorRepository;

use super::skip;

/// Reconciles location records into the mirror
#[derive(Clone)]
pub struct LocationUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl LocationUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one location record
    pub async fn reconcile(&self, record: &PanelLocation) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_location_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load location", &e),
        };

        match existing {
            Some(mut location) => {
                merge::apply_panel_location(&mut location, record, now);
                match self.mirror.upsert_location(&location).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update location", &e),
                }
            }
            None => {
                let location = merge::new_location(record, now);
                match self.mirror.upsert_location(&location).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create location", &e),
                }
            }
        }
    }
}

/// Reconciles node records into the mirror
#[derive(Clone)]
pub struct NodeUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl NodeUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one node record
    pub async fn reconcile(&self, record: &PanelNode) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_node_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load node", &e),
        };

        match existing {
            Some(mut node) => {
                merge::apply_panel_node(&mut node, record, now);
                match self.mirror.upsert_node(&node).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update node", &e),
                }
            }
            None => {
                let node = merge::new_node(record, now);
                match self.mirror.upsert_node(&node).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create node", &e),
                }
            }
        }
    }
}

/// Reconciles allocation records into the mirror
#[derive(Clone)]
pub struct AllocationUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl AllocationUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one allocation of `node_panel_id`
    pub async fn reconcile(&self, record: &PanelAllocation, node_panel_id: i64) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_allocation_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load allocation", &e),
        };

        match existing {
            Some(mut allocation) => {
                merge::apply_panel_allocation(&mut allocation, record, node_panel_id, now);
                match self.mirror.upsert_allocation(&allocation).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update allocation", &e),
                }
            }
            None => {
                let allocation = merge::new_allocation(record, node_panel_id, now);
                match self.mirror.upsert_allocation(&allocation).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create allocation", &e),
                }
            }
        }
    }
}

/// Reconciles nest records into the mirror
#[derive(Clone)]
pub struct NestUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl NestUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one nest record
    pub async fn reconcile(&self, record: &PanelNest) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_nest_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load nest", &e),
        };

        match existing {
            Some(mut nest) => {
                merge::apply_panel_nest(&mut nest, record, now);
                match self.mirror.upsert_nest(&nest).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update nest", &e),
                }
            }
            None => {
                let nest = merge::new_nest(record, now);
                match self.mirror.upsert_nest(&nest).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create nest", &e),
                }
            }
        }
    }
}

/// Reconciles egg records into the mirror
#[derive(Clone)]
pub struct EggUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl EggUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one egg of `nest_panel_id`
    pub async fn reconcile(&self, record: &PanelEgg, nest_panel_id: i64) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_egg_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load egg", &e),
        };

        match existing {
            Some(mut egg) => {
                merge::apply_panel_egg(&mut egg, record, nest_panel_id, now);
                match self.mirror.upsert_egg(&egg).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update egg", &e),
                }
            }
            None => {
                let egg = merge::new_egg(record, nest_panel_id, now);
                match self.mirror.upsert_egg(&egg).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create egg", &e),
                }
            }
        }
    }
}
