//! Engine tunables.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineProperty {
    /// Nested calls allowed before a call fails with a stack overflow.
    MaxCallDepth,
    /// Contexts allowed to queue on one class guard.
    MaxLockWaiters,
    /// Non-zero when free calls also consider public functions.
    ResolvePublicCalls,
}

impl EngineProperty {
    pub fn default_value(&self) -> usize {
        match self {
            EngineProperty::MaxCallDepth => 128,
            EngineProperty::MaxLockWaiters => 5,
            EngineProperty::ResolvePublicCalls => 1,
        }
    }
}
