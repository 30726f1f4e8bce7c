use std::time::Duration;

/// Tunable protocol constants. `spec.md` fixes `bucket_size` (k) at 20 and
/// `alpha` at 3 as protocol-level constants; they are exposed here as
/// configuration, the way the teacher exposes its (differently-valued)
/// `RoutingConfig::bucket_size`, so tests can run at a smaller scale.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RoutingConfig {
    /// Maximum entries per k-bucket; also the maximum size of a lookup
    /// result. Called `k` in the original paper.
    pub bucket_size: usize,

    /// Degree of parallelism of an iterative lookup round. Called `alpha` in
    /// the original paper.
    pub alpha: usize,

    /// Per-RPC timeout before a probe is considered failed.
    pub rpc_timeout: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            bucket_size: 20,
            alpha: 3,
            rpc_timeout: Duration::from_secs(2),
        }
    }
}
