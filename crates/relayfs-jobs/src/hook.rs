//! Post-upload mirror rules.
//!
//! When an upload completes, the first rule whose glob matches the path
//! enqueues a replication job.

use crate::error::{JobError, JobResult};
use crate::job::{JobSnapshot, JobSpec};
use crate::manager::JobManager;
use relayfs_select::glob::GlobPattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// One `[[mirror]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRule {
    /// Glob over virtual paths.
    pub pattern: String,
    /// Job priority.
    #[serde(default)]
    pub priority: i32,
    /// Replica target.
    pub replicas: usize,
    /// Destination nodes; empty means every available node.
    #[serde(default)]
    pub destinations: BTreeSet<String>,
    /// Count only reachable destinations towards `replicas`.
    #[serde(default)]
    pub online_only: bool,
}

/// Compiled mirror rules, first match wins.
#[derive(Debug, Clone, Default)]
pub struct MirrorRules {
    rules: Vec<(GlobPattern, MirrorRule)>,
}

impl MirrorRules {
    /// Compile `rules`.
    pub fn new(rules: Vec<MirrorRule>) -> JobResult<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let glob = GlobPattern::new(&rule.pattern).map_err(JobError::from)?;
                if rule.replicas == 0 {
                    return Err(JobError::InvalidJob {
                        reason: format!("mirror rule '{}' has zero replicas", rule.pattern),
                    });
                }
                Ok((glob, rule))
            })
            .collect::<JobResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True without rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule applying to `path`, if any.
    pub fn rule_for(&self, path: &str) -> Option<&MirrorRule> {
        self.rules
            .iter()
            .find(|(glob, _)| glob.matches(path))
            .map(|(_, rule)| rule)
    }

    /// Enqueue a job for a freshly uploaded file. Duplicates and
    /// already-satisfied files are logged and yield `None`.
    pub async fn upload_complete(&self, manager: &JobManager, path: &str) -> Option<JobSnapshot> {
        let rule = self.rule_for(path)?;
        let spec = JobSpec {
            path: path.to_string(),
            destinations: rule.destinations.clone(),
            priority: rule.priority,
            replicas: rule.replicas,
            online_only: rule.online_only,
        };
        match manager.add_job(spec).await {
            Ok(job) if job.state.is_terminal() => {
                debug!(path, "mirror target already met");
                None
            }
            Ok(job) => {
                info!(job = job.index, path, pattern = %rule.pattern, "mirror job queued");
                Some(job)
            }
            Err(e @ JobError::DuplicateJob { .. }) => {
                debug!(path, error = %e, "mirror job already queued");
                None
            }
            Err(e) => {
                warn!(path, error = %e, "cannot queue mirror job");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use crate::memory::MemoryCluster;
    use crate::queue::JobQueue;
    use crate::scheduler::JobScheduler;
    use crate::settings::JobSettings;
    use relayfs_select::{NodeChains, NodeSelection};
    use std::sync::Arc;

    fn rule(pattern: &str, dests: &[&str], replicas: usize) -> MirrorRule {
        MirrorRule {
            pattern: pattern.into(),
            priority: 3,
            replicas,
            destinations: dests.iter().map(|d| d.to_string()).collect(),
            online_only: false,
        }
    }

    fn manager(cluster: &Arc<MemoryCluster>) -> JobManager {
        JobManager::new(Arc::new(JobScheduler::new(
            Arc::new(JobQueue::new()),
            Arc::new(NodeSelection::with_chains(NodeChains::empty())),
            cluster.clone(),
            cluster.clone(),
            cluster.clone(),
            JobSettings::default(),
        )))
    }

    #[test]
    fn test_first_match_wins() {
        let rules = MirrorRules::new(vec![
            rule("/mp3/*", &["a"], 1),
            rule("*", &["b"], 1),
        ])
        .unwrap();
        assert_eq!(rules.rule_for("/mp3/x.mp3").unwrap().pattern, "/mp3/*");
        assert_eq!(rules.rule_for("/iso/x.iso").unwrap().pattern, "*");
    }

    #[test]
    fn test_zero_replicas_rejected() {
        assert!(MirrorRules::new(vec![rule("*", &["a"], 0)]).is_err());
    }

    #[tokio::test]
    async fn test_upload_complete_enqueues_once() {
        let c = Arc::new(MemoryCluster::new());
        c.add_node("n1", 1 << 20);
        c.add_node("n2", 1 << 20);
        c.add_file("/mp3/x.mp3", 10, &["n1"]);
        let m = manager(&c);
        let rules = MirrorRules::new(vec![rule("/mp3/*", &["n2"], 1)]).unwrap();

        let job = rules.upload_complete(&m, "/mp3/x.mp3").await.unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.priority, 3);
        assert!(rules.upload_complete(&m, "/mp3/x.mp3").await.is_none());
        assert!(rules.upload_complete(&m, "/other").await.is_none());
        assert_eq!(m.list_jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_online_only_carried_into_job() {
        let c = Arc::new(MemoryCluster::new());
        for n in ["n1", "n2", "n3"] {
            c.add_node(n, 1 << 20);
        }
        c.add_file("/iso/a.iso", 10, &["n1", "n2"]);
        c.set_reachable("n2", false);
        let m = manager(&c);

        // n2 holds a copy but is offline, so the rule still wants a leg.
        let rules = MirrorRules::new(vec![MirrorRule {
            online_only: true,
            ..rule("/iso/*", &["n2", "n3"], 1)
        }])
        .unwrap();
        let job = rules.upload_complete(&m, "/iso/a.iso").await.unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert!(m.scheduler().queue().pending()[0].spec.online_only);

        // Without the flag the offline copy already counts.
        let c2 = Arc::new(MemoryCluster::new());
        for n in ["n1", "n2", "n3"] {
            c2.add_node(n, 1 << 20);
        }
        c2.add_file("/iso/a.iso", 10, &["n1", "n2"]);
        c2.set_reachable("n2", false);
        let rules = MirrorRules::new(vec![rule("/iso/*", &["n2", "n3"], 1)]).unwrap();
        assert!(rules.upload_complete(&manager(&c2), "/iso/a.iso").await.is_none());
    }
}
