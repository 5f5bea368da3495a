//! Per-request context extracted by middleware.

use crewforge_core::TenantId;

/// The tenant every downstream read and write is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
