use crate::wire::HealthRes;

/// Simple health service shared by the HTTP surface and any future transport.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as alive.
    ///
    /// This is a liveness check only; it does not touch the store or the dispatcher.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Patient service is alive".into(),
        }
    }
}
