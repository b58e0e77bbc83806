//! Chunked-artifact reassembly.
//!
//! Peers may deliver one logical artifact as an ordered run of chunk events
//! sharing an `index`. The reassembler buffers open runs per (task id, index)
//! and moves the completed artifact onto the task when the last chunk lands.

use a2a_types::{Artifact, Task, TaskArtifactUpdateEvent};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ArtifactReassembler {
    // open chunk runs keyed by (task id, artifact index)
    pending: HashMap<(String, u32), Artifact>,
}

impl ArtifactReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one artifact event into the task.
    ///
    /// Whole artifacts (no `append`, `lastChunk` unset or true) land on the
    /// task immediately. A first chunk (`lastChunk: false`) opens a buffer;
    /// `append: true` chunks extend it in arrival order and `lastChunk: true`
    /// closes it onto the task. An append chunk whose buffer is missing, the
    /// opener having been dropped or reordered away, starts a fresh buffer
    /// from that chunk instead of being discarded.
    pub fn ingest(&mut self, task: &mut Task, event: &TaskArtifactUpdateEvent) {
        let artifact = &event.artifact;
        let key = (event.id.clone(), artifact.index);

        if artifact.append == Some(true) {
            match self.pending.get_mut(&key) {
                Some(buffer) => buffer.parts.extend(artifact.parts.iter().cloned()),
                None => {
                    tracing::warn!(
                        task_id = %event.id,
                        index = artifact.index,
                        "append chunk without an open buffer; treating it as the first chunk"
                    );
                    self.pending.insert(key.clone(), artifact.clone());
                }
            }
            if artifact.last_chunk == Some(true) {
                if let Some(complete) = self.pending.remove(&key) {
                    push_artifact(task, complete);
                }
            }
        } else if artifact.last_chunk == Some(false) {
            self.pending.insert(key, artifact.clone());
        } else {
            push_artifact(task, artifact.clone());
        }
    }

    /// Drop any open buffers for a task. Called when the task reaches a
    /// terminal state so no buffer outlives its task.
    pub fn evict_task(&mut self, task_id: &str) {
        self.pending.retain(|(id, _), _| id != task_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn push_artifact(task: &mut Task, artifact: Artifact) {
    task.artifacts.get_or_insert_with(Vec::new).push(artifact);
}
