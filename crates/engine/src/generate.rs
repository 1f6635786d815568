//! Task generation from ERP order data.
//!
//! Turns an order's articles and workplan steps into a container task
//! per article with one operation per step, laid out sequentially along
//! the working calendar and chained with finish-to-start links. The
//! generated batch goes through the same atomic sync path as client
//! edits.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::info;

use planboard_core::delta::SyncDelta;
use planboard_core::ids::{OrderId, TaskId};
use planboard_core::link::DependencyLink;
use planboard_core::task::{Order, Task, TaskKind, TaskPriority, TaskStatus, DURATION_GRID_MINUTES};
use planboard_store::Store;

use crate::error::EngineError;
use crate::PlanningEngine;

/// One workplan step of an article, as pulled from the ERP.
#[derive(Debug, Clone)]
pub struct WorkplanStep {
    pub workplan_no: String,
    pub name: String,
    pub duration_minutes: i64,
    /// ERP id of the resource to assign; unassigned when absent.
    pub resource_erp_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArticleSpec {
    pub article_no: String,
    pub name: String,
    pub steps: Vec<WorkplanStep>,
}

#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub number: String,
    pub due_date: NaiveDate,
    pub articles: Vec<ArticleSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub order_id: OrderId,
    pub container_ids: Vec<TaskId>,
    pub task_count: usize,
    pub link_count: usize,
}

impl PlanningEngine {
    /// Generate the task structure for an order, earliest work at `start`.
    ///
    /// Each article becomes a container spanning its steps; steps are
    /// placed back to back, snapped forward to the next working window.
    /// Known orders are updated in place, so regeneration after an ERP
    /// change reuses the order row.
    pub fn generate_order(
        &mut self,
        spec: &OrderSpec,
        start: NaiveDateTime,
    ) -> Result<GenerateReport, EngineError> {
        let calendar = self.store().get_week_calendar()?;
        let order_id = match self.store().order_by_number(&spec.number)? {
            Some(existing) => existing.order_id,
            None => OrderId::new(),
        };
        let order = Order {
            order_id,
            number: spec.number.clone(),
            due_date: spec.due_date,
        };

        let mut delta = SyncDelta::default();
        let mut container_ids = Vec::with_capacity(spec.articles.len());
        for article in &spec.articles {
            let container_id =
                self.layout_article(article, &order, start, &calendar, &mut delta)?;
            container_ids.push(container_id);
        }

        // The order row lands only once the task batch is accepted, so a
        // rejected delta leaves no trace of the order either.
        self.apply_sync(&delta)?;
        self.store_mut().upsert_order(&order)?;
        info!(
            order = %spec.number,
            tasks = delta.created_tasks.len(),
            links = delta.created_links.len(),
            "order tasks generated"
        );
        Ok(GenerateReport {
            order_id,
            container_ids,
            task_count: delta.created_tasks.len(),
            link_count: delta.created_links.len(),
        })
    }

    fn layout_article(
        &self,
        article: &ArticleSpec,
        order: &Order,
        start: NaiveDateTime,
        calendar: &planboard_core::calendar::WeekCalendar,
        delta: &mut SyncDelta,
    ) -> Result<TaskId, EngineError> {
        let container_id = TaskId::new();
        let mut cursor = calendar.next_working_start(start).unwrap_or(start);
        let first_start = cursor;
        let mut previous: Option<TaskId> = None;
        let mut total_minutes = 0;

        for step in &article.steps {
            let resource_id = match &step.resource_erp_id {
                Some(erp_id) => Some(
                    self.store()
                        .resource_by_erp_id(erp_id)?
                        .ok_or_else(|| EngineError::ResourceNotFound(erp_id.clone()))?
                        .resource_id,
                ),
                None => None,
            };
            let task_id = TaskId::new();
            delta.created_tasks.push(Task {
                task_id,
                kind: TaskKind::Operation,
                title: step.name.clone(),
                planned_start: cursor,
                duration_minutes: step.duration_minutes,
                resource_id,
                parent_id: Some(container_id),
                status: TaskStatus::Planned,
                priority: TaskPriority::Normal,
                progress: 0,
                order_id: Some(order.order_id),
                erp_article_no: Some(article.article_no.clone()),
                erp_workplan_no: Some(step.workplan_no.clone()),
            });
            if let Some(pred) = previous {
                delta
                    .created_links
                    .push(DependencyLink::finish_to_start(pred, task_id));
            }
            previous = Some(task_id);
            total_minutes += step.duration_minutes;

            let end = cursor + Duration::minutes(step.duration_minutes);
            cursor = calendar.next_working_start(end).unwrap_or(end);
        }

        delta.created_tasks.push(Task {
            task_id: container_id,
            kind: TaskKind::ContainerArticle,
            title: article.name.clone(),
            planned_start: first_start,
            duration_minutes: total_minutes.max(DURATION_GRID_MINUTES),
            resource_id: None,
            parent_id: None,
            status: TaskStatus::Planned,
            priority: TaskPriority::Normal,
            progress: 0,
            order_id: Some(order.order_id),
            erp_article_no: Some(article.article_no.clone()),
            erp_workplan_no: None,
        });
        Ok(container_id)
    }
}
