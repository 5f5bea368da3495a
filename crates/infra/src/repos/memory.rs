//! In-memory repositories for tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crewforge_core::{EmployeeId, TaskId, TenantId};
use crewforge_scoring::PerformanceSample;
use crewforge_tasks::Task;

use super::{
    LedgerEntry, LedgerEntryRepository, PerformanceRepository, RepoResult, TaskFilter,
    TaskRepository,
};

#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &Task) -> RepoResult<()> {
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: TenantId, task_id: TaskId) -> RepoResult<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(&task_id)
            .filter(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    async fn list(&self, tenant_id: TenantId, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut out: Vec<Task> = tasks
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .filter(|t| filter.include_inactive || t.active)
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.assignee.is_none_or(|a| t.assignee == Some(a)))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }

    async fn update(&self, task: &Task) -> RepoResult<()> {
        self.tasks.lock().unwrap().insert(task.id, task.clone());
        Ok(())
    }

    async fn assigned_to(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<Task>> {
        let tasks = self.tasks.lock().unwrap();
        let mut out: Vec<Task> = tasks
            .values()
            .filter(|t| {
                t.tenant_id == tenant_id && t.active && t.assignee == Some(employee_id)
            })
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPerformanceRepository {
    samples: Mutex<Vec<PerformanceSample>>,
}

impl InMemoryPerformanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PerformanceRepository for InMemoryPerformanceRepository {
    async fn append(&self, sample: &PerformanceSample) -> RepoResult<()> {
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }

    async fn for_employee(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<PerformanceSample>> {
        let samples = self.samples.lock().unwrap();
        let mut out: Vec<PerformanceSample> = samples
            .iter()
            .filter(|s| s.tenant_id == tenant_id && s.employee_id == employee_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.created_at);
        Ok(out)
    }

    async fn latest(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<PerformanceSample>> {
        Ok(self
            .for_employee(tenant_id, employee_id)
            .await?
            .into_iter()
            .next_back())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerEntryRepository {
    entries: Mutex<HashMap<TaskId, LedgerEntry>>,
}

impl InMemoryLedgerEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerEntryRepository for InMemoryLedgerEntryRepository {
    async fn insert_once(&self, entry: &LedgerEntry) -> RepoResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&entry.task_id) {
            return Ok(false);
        }
        entries.insert(entry.task_id, entry.clone());
        Ok(true)
    }

    async fn for_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> RepoResult<Option<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&task_id)
            .filter(|e| e.tenant_id == tenant_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewforge_tasks::Complexity;

    fn task_for(tenant: TenantId) -> Task {
        Task::new(tenant, Complexity::new(2).unwrap())
    }

    #[tokio::test]
    async fn reads_are_tenant_scoped() {
        let repo = InMemoryTaskRepository::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        let task = task_for(tenant_a);
        repo.insert(&task).await.unwrap();

        assert!(repo.get(tenant_a, task.id).await.unwrap().is_some());
        assert!(repo.get(tenant_b, task.id).await.unwrap().is_none());
        assert!(repo.list(tenant_b, &TaskFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_hides_inactive_unless_asked() {
        let repo = InMemoryTaskRepository::new();
        let tenant = TenantId::new();

        let mut task = task_for(tenant);
        task.deactivate();
        repo.insert(&task).await.unwrap();

        assert!(repo.list(tenant, &TaskFilter::default()).await.unwrap().is_empty());

        let filter = TaskFilter {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(repo.list(tenant, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn assigned_to_filters_by_employee() {
        let repo = InMemoryTaskRepository::new();
        let tenant = TenantId::new();
        let employee = EmployeeId::new();

        repo.insert(&task_for(tenant).with_assignee(employee))
            .await
            .unwrap();
        repo.insert(&task_for(tenant).with_assignee(EmployeeId::new()))
            .await
            .unwrap();
        repo.insert(&task_for(tenant)).await.unwrap();

        assert_eq!(repo.assigned_to(tenant, employee).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ledger_entries_are_unique_per_task() {
        let repo = InMemoryLedgerEntryRepository::new();
        let tenant = TenantId::new();
        let task_id = TaskId::new();

        let first = LedgerEntry::new(tenant, task_id, Some("0xabc".into()));
        assert!(repo.insert_once(&first).await.unwrap());

        let second = LedgerEntry::new(tenant, task_id, Some("0xdef".into()));
        assert!(!repo.insert_once(&second).await.unwrap());

        let stored = repo.for_task(tenant, task_id).await.unwrap().unwrap();
        assert_eq!(stored.tx_ref.as_deref(), Some("0xabc"));
    }
}
