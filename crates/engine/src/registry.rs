//! Resource registry: hierarchical filtering and ERP master-data sync.

use std::collections::HashSet;

use tracing::info;

use planboard_core::ids::ResourceId;
use planboard_core::resource::{validate_level, Resource, ResourceKind, ResourceMaster};
use planboard_store::Store;

use crate::error::EngineError;
use crate::PlanningEngine;

/// Visibility restriction for the resource sidebar. Both axes must
/// agree for a resource to show; `None` on an axis means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Restrict to these departments (by ERP department id) and their
    /// machines and employees.
    pub department_erp_ids: Option<Vec<String>>,
    /// Show resources whose importance tier is at most this value.
    /// Departments are structural and always pass this axis.
    pub max_level: Option<u8>,
}

/// Outcome of one master-data sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSyncReport {
    pub created: usize,
    pub updated: usize,
    pub deactivated: usize,
}

/// Apply the filter to a resource list. Inactive resources never show.
pub fn visible_resources(resources: &[Resource], filter: &ResourceFilter) -> Vec<Resource> {
    resources
        .iter()
        .filter(|r| r.active)
        .filter(|r| {
            let Some(ref departments) = filter.department_erp_ids else {
                return true;
            };
            match r.kind {
                ResourceKind::Department => departments.contains(&r.erp_id),
                _ => r
                    .erp_department_id
                    .as_ref()
                    .is_some_and(|d| departments.contains(d)),
            }
        })
        .filter(|r| {
            filter
                .max_level
                .is_none_or(|tier| r.kind == ResourceKind::Department || r.level <= tier)
        })
        .cloned()
        .collect()
}

impl PlanningEngine {
    pub fn visible_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>, EngineError> {
        Ok(visible_resources(&self.store().all_resources()?, filter))
    }

    /// Reconcile the registry against an ERP master-data pull.
    ///
    /// Matching runs on `erp_id`: known resources are updated in place
    /// (keeping their id, so task assignments survive), unknown ones are
    /// created, and resources absent from the pull are deactivated
    /// rather than deleted.
    pub fn sync_resources(
        &mut self,
        master: &[ResourceMaster],
    ) -> Result<ResourceSyncReport, EngineError> {
        for row in master {
            validate_level(row.level)?;
        }

        let existing = self.store().all_resources()?;
        let seen: HashSet<&str> = master.iter().map(|m| m.erp_id.as_str()).collect();
        let mut report = ResourceSyncReport::default();

        self.exec_batch("BEGIN IMMEDIATE")?;
        let applied = (|| -> Result<(), EngineError> {
            for row in master {
                let known = existing.iter().find(|r| r.erp_id == row.erp_id);
                let resource = Resource {
                    resource_id: known.map_or_else(ResourceId::new, |r| r.resource_id),
                    kind: row.kind,
                    name: row.name.clone(),
                    erp_id: row.erp_id.clone(),
                    erp_department_id: row.erp_department_id.clone(),
                    level: row.level,
                    capabilities: row.capabilities.clone(),
                    active: true,
                };
                self.store_mut().upsert_resource(&resource)?;
                if known.is_some() {
                    report.updated += 1;
                } else {
                    report.created += 1;
                }
            }
            for resource in &existing {
                if resource.active && !seen.contains(resource.erp_id.as_str()) {
                    self.store_mut()
                        .set_resource_active(resource.resource_id, false)?;
                    report.deactivated += 1;
                }
            }
            Ok(())
        })();
        match applied {
            Ok(()) => self.exec_batch("COMMIT")?,
            Err(e) => {
                self.exec_batch("ROLLBACK")?;
                return Err(e);
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            deactivated = report.deactivated,
            "resource sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(kind: ResourceKind, erp_id: &str, dept: Option<&str>, level: u8) -> Resource {
        Resource {
            resource_id: ResourceId::new(),
            kind,
            name: erp_id.into(),
            erp_id: erp_id.into(),
            erp_department_id: dept.map(Into::into),
            level,
            capabilities: Vec::new(),
            active: true,
        }
    }

    fn fixture() -> Vec<Resource> {
        vec![
            resource(ResourceKind::Department, "D-100", None, 1),
            resource(ResourceKind::Department, "D-200", None, 1),
            resource(ResourceKind::Machine, "M-1", Some("D-100"), 1),
            resource(ResourceKind::Machine, "M-2", Some("D-100"), 3),
            resource(ResourceKind::Employee, "E-1", Some("D-200"), 2),
        ]
    }

    #[test]
    fn unfiltered_shows_all_active() {
        let mut resources = fixture();
        resources[3].active = false;
        let visible = visible_resources(&resources, &ResourceFilter::default());
        assert_eq!(visible.len(), 4);
        assert!(visible.iter().all(|r| r.erp_id != "M-2"));
    }

    #[test]
    fn department_filter_keeps_department_and_members() {
        let visible = visible_resources(
            &fixture(),
            &ResourceFilter {
                department_erp_ids: Some(vec!["D-100".into()]),
                max_level: None,
            },
        );
        let ids: Vec<&str> = visible.iter().map(|r| r.erp_id.as_str()).collect();
        assert_eq!(ids, vec!["D-100", "M-1", "M-2"]);
    }

    #[test]
    fn level_filter_exempts_departments() {
        let visible = visible_resources(
            &fixture(),
            &ResourceFilter {
                department_erp_ids: None,
                max_level: Some(1),
            },
        );
        let ids: Vec<&str> = visible.iter().map(|r| r.erp_id.as_str()).collect();
        assert_eq!(ids, vec!["D-100", "D-200", "M-1"]);
    }

    #[test]
    fn both_axes_intersect() {
        let visible = visible_resources(
            &fixture(),
            &ResourceFilter {
                department_erp_ids: Some(vec!["D-100".into()]),
                max_level: Some(2),
            },
        );
        let ids: Vec<&str> = visible.iter().map(|r| r.erp_id.as_str()).collect();
        assert_eq!(ids, vec!["D-100", "M-1"]);
    }
}
