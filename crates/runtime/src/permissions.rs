//! External permission-check collaborator.
//!
//! The policy engine itself lives outside this system; callers gate
//! commands through this trait before they reach a runtime.

use async_trait::async_trait;

/// Relationship-based permission check, consumed rather than implemented
/// here.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Returns true when `subject` holds `permission` on the resource.
    async fn check(
        &self,
        resource_type: &str,
        resource_id: &str,
        permission: &str,
        subject_type: &str,
        subject_id: &str,
    ) -> bool;
}

/// Permissive checker for tests and single-tenant deployments.
pub struct AllowAll;

#[async_trait]
impl PermissionChecker for AllowAll {
    async fn check(&self, _: &str, _: &str, _: &str, _: &str, _: &str) -> bool {
        true
    }
}
