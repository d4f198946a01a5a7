//! Tenant scoping shared by every operation that touches company-owned data.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{CompanyId, UserId, UserMetadata};
use crate::error::ServiceError;
use crate::identity::{Principal, Role};
use crate::repository::UserMetadataRepository;

/// Rejects callers whose tier is below `tier`.
pub fn require_tier(caller: &Principal, tier: Role) -> Result<(), ServiceError> {
    if caller.meets(tier) {
        Ok(())
    } else {
        Err(ServiceError::unauthorized(format!(
            "requires {} role or higher",
            tier.label()
        )))
    }
}

/// Answers "may this caller act within company T?".
///
/// Super admins act everywhere. Everyone else acts only inside the company recorded in their
/// user metadata.
#[derive(Clone)]
pub struct TenantGuard {
    users: Arc<dyn UserMetadataRepository>,
}

impl TenantGuard {
    pub fn new(users: Arc<dyn UserMetadataRepository>) -> Self {
        Self { users }
    }

    /// Metadata for the caller; a caller without metadata belongs to no company.
    pub fn membership(&self, caller: &Principal) -> Result<UserMetadata, ServiceError> {
        self.users
            .fetch(&caller.subject)?
            .ok_or_else(|| ServiceError::not_found("user metadata"))
    }

    pub fn authorize(&self, caller: &Principal, company: &CompanyId) -> Result<(), ServiceError> {
        if caller.is_super_admin() {
            return Ok(());
        }
        let membership = self.membership(caller)?;
        if &membership.company_id != company {
            warn!(caller = %caller.subject, company = %company, "cross-tenant access denied");
            return Err(ServiceError::unauthorized(
                "resource belongs to a different company",
            ));
        }
        Ok(())
    }

    /// Authorizes the caller for `company` and checks every target user belongs to it.
    pub fn authorize_members(
        &self,
        caller: &Principal,
        company: &CompanyId,
        targets: &[UserId],
    ) -> Result<(), ServiceError> {
        if caller.is_super_admin() {
            return Ok(());
        }
        self.authorize(caller, company)?;
        for target in targets {
            let metadata = self
                .users
                .fetch(target)?
                .ok_or_else(|| ServiceError::not_found("user metadata"))?;
            if &metadata.company_id != company {
                warn!(caller = %caller.subject, target = %target, "target outside caller company");
                return Err(ServiceError::unauthorized(format!(
                    "cannot act on user {target} outside your company"
                )));
            }
        }
        Ok(())
    }
}
