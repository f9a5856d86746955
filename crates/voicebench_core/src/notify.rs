use crate::{EntityId, EntityKind, JobStatus, Outcome};

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Success,
    Error,
    Info,
}

/// One-shot, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub entity_id: Option<EntityId>,
    pub variant: Variant,
    pub title: String,
    pub message: String,
}

/// Announces a status transition.
///
/// Depends on both ends of the transition: a terminal status that was
/// already current produces nothing, so repeated poll results for the same
/// terminal state are announced once.
pub fn notify_transition<S: JobStatus>(
    kind: EntityKind,
    id: &EntityId,
    label: &str,
    previous: S,
    current: S,
    error: Option<&str>,
) -> Option<Notification> {
    if previous == current {
        return None;
    }
    let (variant, title, message) = match current.outcome()? {
        Outcome::Success => (
            Variant::Success,
            kind.success_title(),
            success_message(kind, label),
        ),
        Outcome::Failure => {
            if previous.outcome() == Some(Outcome::Failure) {
                return None;
            }
            let reason = error
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .unwrap_or(GENERIC_FAILURE);
            (
                Variant::Error,
                kind.failure_title(),
                format!("{} \"{}\": {}", kind.noun(), label, reason),
            )
        }
    };
    Some(Notification {
        entity_id: Some(id.clone()),
        variant,
        title: title.to_string(),
        message,
    })
}

fn success_message(kind: EntityKind, label: &str) -> String {
    match kind {
        EntityKind::TestSuite => format!("Scenarios for \"{label}\" are ready."),
        EntityKind::Agent => format!("\"{label}\" is connected and verified."),
        EntityKind::Persona => format!("Preview audio for \"{label}\" is ready."),
    }
}

/// A create, update, toggle or delete call was rejected.
pub fn mutation_failed(
    kind: EntityKind,
    id: Option<&EntityId>,
    action: &str,
    reason: &str,
) -> Notification {
    let reason = if reason.trim().is_empty() {
        GENERIC_FAILURE
    } else {
        reason
    };
    Notification {
        entity_id: id.cloned(),
        variant: Variant::Error,
        title: format!("Failed to {action} {}", kind.noun().to_lowercase()),
        message: reason.to_string(),
    }
}

pub fn load_failed(kind: EntityKind, reason: &str) -> Notification {
    Notification {
        entity_id: None,
        variant: Variant::Error,
        title: format!("Failed to load {}s", kind.noun().to_lowercase()),
        message: reason.to_string(),
    }
}

pub fn deleted(kind: EntityKind, id: &EntityId, label: &str) -> Notification {
    Notification {
        entity_id: Some(id.clone()),
        variant: Variant::Info,
        title: format!("{} deleted", kind.noun()),
        message: format!("\"{label}\" was removed."),
    }
}
