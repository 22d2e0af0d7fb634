//! Pod health extraction

use k8s_openapi::api::core::v1::Pod;

use crate::models::PodHealth;

/// Waiting reasons that mark a pod as stuck
pub const STUCK_WAITING_REASONS: [&str; 3] = ["CrashLoopBackOff", "ErrImagePull", "ImagePullBackOff"];

pub fn is_stuck_reason(reason: &str) -> bool {
    STUCK_WAITING_REASONS.contains(&reason)
}

/// Reduce a pod object to the fields a sweep acts on.
///
/// A pod is ready when every container reports ready; a pod without
/// container statuses counts as ready. The waiting reason prefers a stuck
/// reason over any other container's reason.
pub fn pod_health(pod: &Pod) -> PodHealth {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();

    let reasons: Vec<&str> = statuses
        .iter()
        .filter_map(|c| c.state.as_ref()?.waiting.as_ref()?.reason.as_deref())
        .collect();

    let waiting_reason = reasons
        .iter()
        .find(|r| is_stuck_reason(r))
        .or_else(|| reasons.first())
        .map(|r| r.to_string());

    PodHealth {
        name: pod.metadata.name.clone().unwrap_or_default(),
        waiting_reason,
        ready: statuses.iter().all(|c| c.ready),
    }
}
