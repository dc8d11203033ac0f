use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{DbReport, StudyStore};
use crate::error::ServiceError;
use crate::studies::coordinate::Coordinate;
use crate::studies::data::{StudyMetadata, StudySet};
use crate::studies::plan::{Membership, QueryPlan};

/// In-memory tables evaluated with the same predicates the SQL composer emits.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub annotations: Vec<(i64, &'static str, f64)>,
    pub coordinates: Vec<(i64, Coordinate)>,
    pub metadata: Vec<StudyMetadata>,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl MemoryStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn members(&self, membership: &Membership) -> BTreeSet<i64> {
        match membership {
            Membership::Term { term, min_weight } => self
                .annotations
                .iter()
                .filter(|(_, t, w)| t.to_lowercase() == term.as_str() && w > min_weight)
                .map(|(id, _, _)| *id)
                .collect(),
            Membership::Title { term } => self
                .metadata
                .iter()
                .filter(|m| {
                    m.title
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(term.as_str()))
                })
                .map(|m| m.study_id)
                .collect(),
            Membership::Location { point, radius } => self
                .coordinates
                .iter()
                .filter(|(_, c)| distance_squared(c, point) <= radius * radius)
                .map(|(id, _)| *id)
                .collect(),
        }
    }
}

pub(crate) fn distance_squared(a: &Coordinate, b: &Coordinate) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)
}

#[async_trait]
impl StudyStore for MemoryStore {
    fn dialect(&self) -> &'static str {
        "memory"
    }

    async fn studies(&self, plan: &QueryPlan, sample_size: u32) -> Result<StudySet, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.fail_with {
            return Err(ServiceError::DataAccess(error.clone()));
        }

        let mut ids = self.members(&plan.include);
        if let Some(exclude) = &plan.exclude {
            let excluded = self.members(exclude);
            ids.retain(|id| !excluded.contains(id));
        }
        let study_ids: Vec<i64> = ids.into_iter().take(plan.limit as usize).collect();

        let sampled: BTreeSet<i64> = study_ids.iter().take(sample_size as usize).copied().collect();
        let mut sample_metadata: Vec<StudyMetadata> = self
            .metadata
            .iter()
            .filter(|m| sampled.contains(&m.study_id))
            .cloned()
            .collect();
        sample_metadata.sort_by_key(|m| m.study_id);

        Ok(StudySet {
            study_ids,
            sample_metadata,
        })
    }

    async fn diagnostics(&self, report: &mut DbReport) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        report.version = Some("memory".to_string());
        if let Some(error) = &self.fail_with {
            return Err(ServiceError::DataAccess(error.clone()));
        }
        report.coordinates_count = Some(self.coordinates.len() as i64);
        report.metadata_count = Some(self.metadata.len() as i64);
        report.annotations_terms_count = Some(self.annotations.len() as i64);
        Ok(())
    }
}
