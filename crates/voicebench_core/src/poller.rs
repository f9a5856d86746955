//! Registry of entity IDs whose background job is still running.
//!
//! The poller owns no timer. The caller drives it with timestamps taken from
//! its own clock (offsets from any fixed origin), which keeps tick, dedupe
//! and timeout behaviour testable without waiting on a wall clock.
use std::collections::BTreeMap;
use std::time::Duration;

use voicebench_logging::{vb_debug, vb_warn};

use crate::{EntityId, JobStatus, PollPolicy, StatusReport};

pub const TIMEOUT_MESSAGE: &str = "Timed out waiting for the job to finish";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRegistration<S> {
    pub started_at: Duration,
    pub last_polled_at: Option<Duration>,
    last_report: Option<StatusReport<S>>,
}

/// A status change worth delivering to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollUpdate<S> {
    pub id: EntityId,
    pub report: StatusReport<S>,
    /// Produced locally by the timeout policy rather than by the server.
    pub synthesized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusPoller<S> {
    policy: PollPolicy,
    registrations: BTreeMap<EntityId, PollRegistration<S>>,
}

impl<S: JobStatus> JobStatusPoller<S> {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            registrations: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Returns `false` when the ID was already being polled.
    pub fn register(&mut self, id: EntityId, now: Duration) -> bool {
        if self.registrations.contains_key(&id) {
            return false;
        }
        vb_debug!("poll register id={} at={:?}", id, now);
        self.registrations.insert(
            id,
            PollRegistration {
                started_at: now,
                last_polled_at: None,
                last_report: None,
            },
        );
        true
    }

    pub fn unregister(&mut self, id: &EntityId) -> bool {
        self.registrations.remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn is_registered(&self, id: &EntityId) -> bool {
        self.registrations.contains_key(id)
    }

    pub fn registration(&self, id: &EntityId) -> Option<&PollRegistration<S>> {
        self.registrations.get(id)
    }

    pub fn registered_ids(&self) -> Vec<EntityId> {
        self.registrations.keys().cloned().collect()
    }

    /// IDs to fetch on this tick; each is stamped as polled at `now`.
    ///
    /// An ID is due once per interval, so calling this twice for the same
    /// tick never schedules a second fetch.
    pub fn due(&mut self, now: Duration) -> Vec<EntityId> {
        let interval = self.policy.interval;
        let mut due = Vec::new();
        for (id, registration) in self.registrations.iter_mut() {
            let is_due = match registration.last_polled_at {
                None => true,
                Some(last) => now.saturating_sub(last) >= interval,
            };
            if is_due {
                registration.last_polled_at = Some(now);
                due.push(id.clone());
            }
        }
        due
    }

    /// Applies one fetch result.
    ///
    /// Failed fetches keep the registration so the ID is retried next tick.
    /// Unchanged payloads produce nothing. A terminal status is delivered
    /// once and ends the registration.
    pub fn record(
        &mut self,
        id: &EntityId,
        result: Result<StatusReport<S>, String>,
    ) -> Option<PollUpdate<S>> {
        let registration = self.registrations.get_mut(id)?;
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                vb_warn!("status fetch failed id={} err={}", id, err);
                return None;
            }
        };

        if report.status.is_terminal() {
            self.registrations.remove(id);
            vb_debug!("poll finished id={} status={}", id, report.status.as_str());
            return Some(PollUpdate {
                id: id.clone(),
                report,
                synthesized: false,
            });
        }

        if registration.last_report.as_ref() == Some(&report) {
            return None;
        }
        registration.last_report = Some(report.clone());
        Some(PollUpdate {
            id: id.clone(),
            report,
            synthesized: false,
        })
    }

    /// Gives up on registrations older than the policy timeout.
    pub fn expire(&mut self, now: Duration) -> Vec<PollUpdate<S>> {
        let Some(timeout) = self.policy.timeout else {
            return Vec::new();
        };
        let expired: Vec<EntityId> = self
            .registrations
            .iter()
            .filter(|(_, reg)| now.saturating_sub(reg.started_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .map(|id| {
                self.registrations.remove(&id);
                vb_warn!("poll timed out id={} after={:?}", id, timeout);
                PollUpdate {
                    id,
                    report: StatusReport::new(S::timed_out()).with_error(TIMEOUT_MESSAGE),
                    synthesized: true,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioPreviewStatus, EntityKind, GenerationStatus};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn suite_poller() -> JobStatusPoller<GenerationStatus> {
        JobStatusPoller::new(EntityKind::TestSuite.poll_policy())
    }

    #[test]
    fn register_is_idempotent() {
        let mut poller = suite_poller();
        assert!(poller.register("a".into(), ms(0)));
        assert!(!poller.register("a".into(), ms(500)));
        assert_eq!(poller.registration(&"a".into()).unwrap().started_at, ms(0));
        assert!(poller.unregister(&"a".into()));
        assert!(!poller.unregister(&"a".into()));
        assert!(poller.is_idle());
    }

    #[test]
    fn late_results_for_unregistered_ids_are_dropped() {
        let mut poller = suite_poller();
        let update = poller.record(&"gone".into(), Ok(StatusReport::new(GenerationStatus::Ready)));
        assert_eq!(update, None);
    }

    #[test]
    fn no_timeout_for_unbounded_policies() {
        let mut poller = suite_poller();
        poller.register("a".into(), ms(0));
        assert!(poller.expire(ms(3_600_000)).is_empty());
        assert!(poller.is_registered(&"a".into()));
    }

    #[test]
    fn expire_before_deadline_keeps_registration() {
        let mut poller =
            JobStatusPoller::<AudioPreviewStatus>::new(EntityKind::Persona.poll_policy());
        poller.register("p".into(), ms(1_000));
        assert!(poller.expire(ms(60_999)).is_empty());
        assert_eq!(poller.expire(ms(61_000)).len(), 1);
    }
}
