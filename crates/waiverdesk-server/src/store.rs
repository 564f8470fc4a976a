//! Application storage behind an injectable trait.
//!
//! Handlers only see `Arc<dyn ApplicationStore>`. The in-memory
//! implementation is what the server runs with today; every read-modify-write
//! happens under a single write lock so concurrent PATCHes cannot interleave.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use waiverdesk_core::{
    AeoApplication, AeoApplicationPatch, ApplicationError, ApplicationStatus,
    DutyWaiverApplication, DutyWaiverPatch,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Invalid(#[from] ApplicationError),

    #[error("application store lock poisoned")]
    Poisoned,
}

/// Filters shared by both list views.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<ApplicationStatus>,
    pub tin: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub total: usize,
    pub by_status: BTreeMap<ApplicationStatus, usize>,
}

impl ModuleSummary {
    fn from_statuses(statuses: impl Iterator<Item = ApplicationStatus>) -> Self {
        let mut by_status: BTreeMap<ApplicationStatus, usize> =
            ApplicationStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut total = 0;
        for status in statuses {
            *by_status.entry(status).or_default() += 1;
            total += 1;
        }
        Self { total, by_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub duty_waiver: ModuleSummary,
    pub aeo: ModuleSummary,
}

pub trait ApplicationStore: Send + Sync {
    fn list_duty_waivers(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<DutyWaiverApplication>, StoreError>;
    fn get_duty_waiver(&self, id: Uuid) -> Result<Option<DutyWaiverApplication>, StoreError>;
    fn insert_duty_waiver(&self, app: DutyWaiverApplication) -> Result<(), StoreError>;
    fn update_duty_waiver(
        &self,
        id: Uuid,
        patch: &DutyWaiverPatch,
        now: DateTime<Utc>,
    ) -> Result<DutyWaiverApplication, StoreError>;
    fn delete_duty_waiver(&self, id: Uuid) -> Result<(), StoreError>;

    fn list_aeo_applications(&self, filter: &ListFilter)
        -> Result<Vec<AeoApplication>, StoreError>;
    fn get_aeo_application(&self, id: Uuid) -> Result<Option<AeoApplication>, StoreError>;
    /// Rejects a second open application for the same TIN.
    fn insert_aeo_application(&self, app: AeoApplication) -> Result<(), StoreError>;
    fn update_aeo_application(
        &self,
        id: Uuid,
        patch: &AeoApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<AeoApplication, StoreError>;
    fn delete_aeo_application(&self, id: Uuid) -> Result<(), StoreError>;

    fn summary(&self) -> Result<DashboardSummary, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    duty_waivers: RwLock<HashMap<Uuid, DutyWaiverApplication>>,
    aeo_applications: RwLock<HashMap<Uuid, AeoApplication>>,
}

impl InMemoryApplicationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with already-validated records.
    #[must_use]
    pub fn with_records(waivers: Vec<DutyWaiverApplication>, aeo: Vec<AeoApplication>) -> Self {
        Self {
            duty_waivers: RwLock::new(waivers.into_iter().map(|a| (a.id, a)).collect()),
            aeo_applications: RwLock::new(aeo.into_iter().map(|a| (a.id, a)).collect()),
        }
    }
}

/// Newest first, then by id for a stable order among equal timestamps.
fn newest_first<T>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (DateTime<Utc>, Uuid),
    limit: usize,
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items.truncate(limit);
    items
}

fn matches_filter(filter: &ListFilter, status: ApplicationStatus, tin: &str) -> bool {
    filter.status.is_none_or(|s| s == status) && filter.tin.as_deref().is_none_or(|t| t == tin)
}

impl ApplicationStore for InMemoryApplicationStore {
    fn list_duty_waivers(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<DutyWaiverApplication>, StoreError> {
        let map = self.duty_waivers.read().map_err(|_| StoreError::Poisoned)?;
        Ok(newest_first(
            map.values()
                .filter(|a| matches_filter(filter, a.status, a.tin.as_str()))
                .cloned(),
            |a| (a.created_at, a.id),
            filter.limit,
        ))
    }

    fn get_duty_waiver(&self, id: Uuid) -> Result<Option<DutyWaiverApplication>, StoreError> {
        let map = self.duty_waivers.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn insert_duty_waiver(&self, app: DutyWaiverApplication) -> Result<(), StoreError> {
        let mut map = self.duty_waivers.write().map_err(|_| StoreError::Poisoned)?;
        if map.contains_key(&app.id) {
            return Err(StoreError::Conflict(format!(
                "application {} already exists",
                app.id
            )));
        }
        map.insert(app.id, app);
        Ok(())
    }

    fn update_duty_waiver(
        &self,
        id: Uuid,
        patch: &DutyWaiverPatch,
        now: DateTime<Utc>,
    ) -> Result<DutyWaiverApplication, StoreError> {
        let mut map = self.duty_waivers.write().map_err(|_| StoreError::Poisoned)?;
        let app = map.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        app.apply_patch(patch, now)?;
        Ok(app.clone())
    }

    fn delete_duty_waiver(&self, id: Uuid) -> Result<(), StoreError> {
        let mut map = self.duty_waivers.write().map_err(|_| StoreError::Poisoned)?;
        map.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    fn list_aeo_applications(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<AeoApplication>, StoreError> {
        let map = self
            .aeo_applications
            .read()
            .map_err(|_| StoreError::Poisoned)?;
        Ok(newest_first(
            map.values()
                .filter(|a| matches_filter(filter, a.status, a.tin.as_str()))
                .cloned(),
            |a| (a.created_at, a.id),
            filter.limit,
        ))
    }

    fn get_aeo_application(&self, id: Uuid) -> Result<Option<AeoApplication>, StoreError> {
        let map = self
            .aeo_applications
            .read()
            .map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn insert_aeo_application(&self, app: AeoApplication) -> Result<(), StoreError> {
        let mut map = self
            .aeo_applications
            .write()
            .map_err(|_| StoreError::Poisoned)?;
        let open_for_tin = map
            .values()
            .any(|existing| existing.tin == app.tin && existing.status != ApplicationStatus::Rejected);
        if open_for_tin {
            return Err(StoreError::Conflict(format!(
                "an AEO application for TIN {} already exists",
                app.tin
            )));
        }
        map.insert(app.id, app);
        Ok(())
    }

    fn update_aeo_application(
        &self,
        id: Uuid,
        patch: &AeoApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<AeoApplication, StoreError> {
        let mut map = self
            .aeo_applications
            .write()
            .map_err(|_| StoreError::Poisoned)?;
        let app = map.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        app.apply_patch(patch, now)?;
        Ok(app.clone())
    }

    fn delete_aeo_application(&self, id: Uuid) -> Result<(), StoreError> {
        let mut map = self
            .aeo_applications
            .write()
            .map_err(|_| StoreError::Poisoned)?;
        map.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    fn summary(&self) -> Result<DashboardSummary, StoreError> {
        let waivers = self.duty_waivers.read().map_err(|_| StoreError::Poisoned)?;
        let aeo = self
            .aeo_applications
            .read()
            .map_err(|_| StoreError::Poisoned)?;
        Ok(DashboardSummary {
            duty_waiver: ModuleSummary::from_statuses(waivers.values().map(|a| a.status)),
            aeo: ModuleSummary::from_statuses(aeo.values().map(|a| a.status)),
        })
    }
}
