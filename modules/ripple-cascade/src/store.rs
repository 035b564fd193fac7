//! In-memory ContentStore.
//!
//! Backs the runner binary and the test suites. Persistence-worthy hosts
//! implement [`ContentStore`](crate::traits::ContentStore) over their own
//! database instead.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ripple_common::{Derivative, DerivativeStatus, Job, Source};

use crate::traits::ContentStore;

#[derive(Default)]
pub struct MemoryStore {
    sources: Mutex<HashMap<Uuid, Source>>,
    jobs: Mutex<HashMap<Uuid, Job>>,
    /// Vec rather than map: `derivatives_for_job` must preserve insertion
    /// order.
    derivatives: Mutex<Vec<Derivative>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a source. Sources are created by the host, not by the cascade.
    pub fn add_source(&self, source: Source) {
        self.sources
            .lock()
            .expect("sources lock poisoned")
            .insert(source.id, source);
    }

    pub fn derivative_count(&self) -> usize {
        self.derivatives.lock().expect("derivatives lock poisoned").len()
    }

    pub fn all_jobs(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .expect("jobs lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn all_derivatives(&self) -> Vec<Derivative> {
        self.derivatives
            .lock()
            .expect("derivatives lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>> {
        Ok(self
            .sources
            .lock()
            .expect("sources lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn update_source(&self, source: &Source) -> Result<()> {
        self.sources
            .lock()
            .expect("sources lock poisoned")
            .insert(source.id, source.clone());
        Ok(())
    }

    async fn create_job(&self, job: &Job) -> Result<()> {
        self.jobs
            .lock()
            .expect("jobs lock poisoned")
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .expect("jobs lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        self.jobs
            .lock()
            .expect("jobs lock poisoned")
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn insert_derivative(&self, derivative: &Derivative) -> Result<()> {
        self.derivatives
            .lock()
            .expect("derivatives lock poisoned")
            .push(derivative.clone());
        Ok(())
    }

    async fn update_derivative(&self, derivative: &Derivative) -> Result<()> {
        let mut derivatives = self.derivatives.lock().expect("derivatives lock poisoned");
        match derivatives.iter_mut().find(|d| d.id == derivative.id) {
            Some(existing) => {
                *existing = derivative.clone();
                Ok(())
            }
            None => anyhow::bail!("derivative {} does not exist", derivative.id),
        }
    }

    async fn get_derivative(&self, id: Uuid) -> Result<Option<Derivative>> {
        Ok(self
            .derivatives
            .lock()
            .expect("derivatives lock poisoned")
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    async fn derivatives_for_job(&self, job_id: Uuid) -> Result<Vec<Derivative>> {
        Ok(self
            .derivatives
            .lock()
            .expect("derivatives lock poisoned")
            .iter()
            .filter(|d| d.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn delete_unpublished_derivatives(&self, source_id: Uuid) -> Result<u64> {
        let mut derivatives = self.derivatives.lock().expect("derivatives lock poisoned");
        let before = derivatives.len();
        derivatives.retain(|d| {
            d.source_id != source_id
                || matches!(
                    d.status,
                    DerivativeStatus::Approved
                        | DerivativeStatus::Scheduled
                        | DerivativeStatus::Published
                )
        });
        Ok((before - derivatives.len()) as u64)
    }
}
