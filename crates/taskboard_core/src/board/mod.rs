//! Kanban board state: four ordered bucket arrays.
//!
//! # Responsibility
//! - Partition a task list into buckets via `classify`.
//! - Provide index-level removal/insertion used by drag handling.
//!
//! # Invariants
//! - A task id appears in at most one bucket, at most once.
//! - Order inside a bucket is ephemeral UI order; it is never persisted.

use chrono::NaiveDate;
use log::warn;
use serde::Serialize;
use std::collections::HashSet;

use crate::model::bucket::{classify, BucketKey};
use crate::model::task::{Task, TaskId};

pub mod sync;

/// Ordered bucket contents of one board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    buckets: [Vec<Task>; 4],
}

impl Board {
    /// Builds a board by classifying every task against `today`.
    ///
    /// Input order is kept inside each bucket. Repeated ids keep the first
    /// occurrence only.
    pub fn classify_all(tasks: impl IntoIterator<Item = Task>, today: NaiveDate) -> Self {
        let mut board = Self::default();
        let mut seen = HashSet::new();

        for task in tasks {
            if !seen.insert(task.id.clone()) {
                warn!(
                    "event=board_classify module=board status=warn reason=duplicate_id task_id={}",
                    task.id
                );
                continue;
            }
            let key = classify(&task, today);
            board.buckets[key.index()].push(task);
        }

        board
    }

    pub fn bucket(&self, key: BucketKey) -> &[Task] {
        &self.buckets[key.index()]
    }

    /// Ids of one bucket in display order.
    pub fn ids(&self, key: BucketKey) -> Vec<TaskId> {
        self.bucket(key).iter().map(|task| task.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Finds the bucket and index currently holding `id`.
    pub fn locate(&self, id: &TaskId) -> Option<(BucketKey, usize)> {
        BucketKey::ALL.into_iter().find_map(|key| {
            self.bucket(key)
                .iter()
                .position(|task| &task.id == id)
                .map(|index| (key, index))
        })
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.locate(id)
            .map(|(key, index)| &self.buckets[key.index()][index])
    }

    pub(crate) fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        let (key, index) = self.locate(id)?;
        self.buckets[key.index()].get_mut(index)
    }

    pub(crate) fn take(&mut self, key: BucketKey, index: usize) -> Option<Task> {
        let bucket = &mut self.buckets[key.index()];
        (index < bucket.len()).then(|| bucket.remove(index))
    }

    /// Inserts at `index`, clamped to the bucket end. Returns the final index.
    pub(crate) fn insert(&mut self, key: BucketKey, index: usize, task: Task) -> usize {
        let bucket = &mut self.buckets[key.index()];
        let index = index.min(bucket.len());
        bucket.insert(index, task);
        index
    }

    pub(crate) fn push(&mut self, key: BucketKey, task: Task) -> usize {
        let bucket = &mut self.buckets[key.index()];
        bucket.push(task);
        bucket.len() - 1
    }
}

/// Serializable column view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketView {
    pub key: BucketKey,
    pub label: &'static str,
    pub count: usize,
    pub tasks: Vec<Task>,
}

impl Board {
    pub fn views(&self) -> Vec<BucketView> {
        BucketKey::ALL
            .into_iter()
            .map(|key| BucketView {
                key,
                label: key.label(),
                count: self.bucket(key).len(),
                tasks: self.bucket(key).to_vec(),
            })
            .collect()
    }
}
