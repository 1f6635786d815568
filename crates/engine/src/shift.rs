//! Bulk schedule shift.

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use planboard_core::ids::ResourceId;
use planboard_core::resource::ResourceKind;
use planboard_store::Store;

use crate::error::EngineError;
use crate::PlanningEngine;

/// A request to translate part of the schedule in time.
#[derive(Debug, Clone, Default)]
pub struct ShiftRequest {
    /// Restrict to one department's tasks. `None` shifts every task,
    /// unassigned ones included.
    pub department_id: Option<ResourceId>,
    /// Positive moves later, negative earlier.
    pub offset_minutes: i64,
    /// Only tasks starting at or after this instant move.
    pub date_from: Option<NaiveDateTime>,
}

impl PlanningEngine {
    /// Shift every matching task by a fixed offset.
    ///
    /// The shift is a pure translation. Durations, relative spacing and
    /// dependency slack are preserved, so a plan without dependency
    /// violations cannot gain any inside the shifted group. Conflicts
    /// against the outside world may appear; a check run surfaces them.
    pub fn shift_schedule(&mut self, request: &ShiftRequest) -> Result<usize, EngineError> {
        // Membership: the department itself plus resources pointing at it.
        let members: Option<Vec<ResourceId>> = match request.department_id {
            Some(department_id) => {
                let department = self
                    .store()
                    .get_resource(department_id)?
                    .ok_or_else(|| EngineError::ResourceNotFound(department_id.to_string()))?;
                if department.kind != ResourceKind::Department {
                    return Err(EngineError::NotADepartment(department.name));
                }
                Some(
                    self.store()
                        .all_resources()?
                        .iter()
                        .filter(|r| {
                            r.resource_id == department.resource_id
                                || r.erp_department_id.as_deref()
                                    == Some(department.erp_id.as_str())
                        })
                        .map(|r| r.resource_id)
                        .collect(),
                )
            }
            None => None,
        };
        if request.offset_minutes == 0 {
            return Ok(0);
        }

        let offset = Duration::minutes(request.offset_minutes);
        let moves: Vec<_> = self
            .store()
            .all_tasks()?
            .into_iter()
            .filter(|t| {
                members
                    .as_ref()
                    .is_none_or(|m| t.resource_id.is_some_and(|rid| m.contains(&rid)))
            })
            .filter(|t| {
                request
                    .date_from
                    .is_none_or(|from| t.planned_start >= from)
            })
            .map(|t| (t.task_id, t.planned_start + offset))
            .collect();

        if moves.is_empty() {
            return Ok(0);
        }

        self.exec_batch("BEGIN IMMEDIATE")?;
        let applied = (|| -> Result<(), EngineError> {
            let store = self.store_mut();
            for (task_id, start) in &moves {
                store.update_task_start(*task_id, *start)?;
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
            offset_minutes = request.offset_minutes,
            moved = moves.len(),
            "schedule shifted"
        );
        Ok(moves.len())
    }
}
