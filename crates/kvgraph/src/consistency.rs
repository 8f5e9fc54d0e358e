//! Detection of forward/backward index gaps.
//!
//! Edge writes touch two keys without a transaction (see
//! [`crate::relation_index`]), so a crash or a failed second write, or two
//! writers racing on the same edge, can leave the indices disagreeing.
//! The checks here only report such gaps; they never repair them.

use std::collections::HashMap;

use kvgraph_core::{decode_forward_fields, keys, NodeId};
use kvgraph_storage::KeyValueStore;

use crate::error::GraphError;
use crate::graph::KvGraph;

/// One disagreement between the two indices.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Inconsistency {
    /// `host`'s forward hash declares `target`, but `target`'s backward set
    /// lacks `host`.
    MissingBackward { host: NodeId, target: NodeId },
    /// `target`'s backward set holds `host`, but `host`'s forward hash does
    /// not declare `target`.
    MissingForward { host: NodeId, target: NodeId },
    /// Metadata fields for `target` in `host`'s forward hash with no
    /// membership field.
    OrphanMetadata {
        host: NodeId,
        target: NodeId,
        keys: Vec<String>,
    },
}

/// Result of a consistency check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Forward edges examined.
    pub edges_checked: usize,
    pub issues: Vec<Inconsistency>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }

    fn finish(mut self) -> Self {
        self.issues.sort();
        self.issues.dedup();
        for issue in &self.issues {
            tracing::warn!("index inconsistency: {:?}", issue);
        }
        self
    }
}

/// Backward sets read during one check, so each is fetched once.
#[derive(Default)]
struct BackwardCache(HashMap<String, Vec<String>>);

impl<S: KeyValueStore + ?Sized> KvGraph<S> {
    /// Checks every edge that starts or ends at `id`.
    pub fn check_node(&self, id: &NodeId) -> Result<ConsistencyReport, GraphError> {
        let mut report = ConsistencyReport::default();
        let mut cache = BackwardCache::default();
        self.check_forward(id.as_str(), &mut cache, &mut report)?;
        self.check_backward(id.as_str(), &mut report)?;
        Ok(report.finish())
    }

    /// Checks the whole keyspace.
    ///
    /// Needs the backend's `scan_prefix` capability; backends without it
    /// fail with [`GraphError::Unimplemented`].
    pub fn check_all(&self) -> Result<ConsistencyReport, GraphError> {
        let mut report = ConsistencyReport::default();
        let mut cache = BackwardCache::default();

        for key in self.store.scan_prefix(keys::FORWARD_PREFIX)? {
            self.check_forward(keys::host_from_forward_key(&key), &mut cache, &mut report)?;
        }
        for key in self.store.scan_prefix(keys::BACKWARD_PREFIX)? {
            self.check_backward(keys::target_from_backward_key(&key), &mut report)?;
        }

        Ok(report.finish())
    }

    fn check_forward(
        &self,
        host: &str,
        cache: &mut BackwardCache,
        report: &mut ConsistencyReport,
    ) -> Result<(), GraphError> {
        let raw = self.store.hash_get_all(&keys::forward_key(host))?;
        let fields = decode_forward_fields(&raw);

        for (target, _) in fields.edges() {
            report.edges_checked += 1;
            if !cache.0.contains_key(target) {
                let members = self.store.set_members(&keys::backward_key(target))?;
                cache.0.insert(target.to_string(), members);
            }
            if !cache.0[target].iter().any(|member| member == host) {
                report.issues.push(Inconsistency::MissingBackward {
                    host: NodeId::from_canonical(host),
                    target: NodeId::from_canonical(target),
                });
            }
        }

        for (target, metadata) in fields.orphans() {
            report.issues.push(Inconsistency::OrphanMetadata {
                host: NodeId::from_canonical(host),
                target: NodeId::from_canonical(target),
                keys: metadata.keys().cloned().collect(),
            });
        }
        Ok(())
    }

    fn check_backward(&self, target: &str, report: &mut ConsistencyReport) -> Result<(), GraphError> {
        for host in self.store.set_members(&keys::backward_key(target))? {
            let declared = self
                .store
                .hash_exists_field(&keys::forward_key(&host), &keys::target_field(target))?;
            if !declared {
                report.issues.push(Inconsistency::MissingForward {
                    host: NodeId::from_canonical(host),
                    target: NodeId::from_canonical(target),
                });
            }
        }
        Ok(())
    }
}
