use crate::dto::HealthRes;

/// Simple health service used by the REST API.
///
/// This service provides a standardised way to check the health status of the
/// SLM system.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "SLM is alive".into(),
        }
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_reports_alive() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert_eq!(res.message, "SLM is alive");
    }
}
