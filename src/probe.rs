//! The probe capability: one call that fetches a resource's current state.

use std::fmt;
use std::future::Future;

use crate::error::ProbeError;
use crate::types::Observation;

/// Fetches the current observable state of a remote resource.
///
/// Implementations close over whatever identifies the resource (project,
/// service, name) and perform one network call per invocation. The waiter
/// never runs two probes of the same wait concurrently.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_waiter::{async_trait, Observation, Probe, ProbeError};
///
/// struct ServiceProbe {
///     client: ApiClient,
///     project: String,
///     service: String,
/// }
///
/// #[async_trait]
/// impl Probe for ServiceProbe {
///     type Snapshot = Service;
///
///     async fn probe(&self) -> Result<Observation<Service>, ProbeError> {
///         let service = self
///             .client
///             .get_service(&self.project, &self.service)
///             .await
///             .map_err(ProbeError::from_error)?;
///         let state = service.state.clone();
///         Ok(Observation::new(service, state))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// The resource snapshot returned on success.
    type Snapshot: fmt::Debug + Send + 'static;

    /// Fetch the resource and its state label.
    async fn probe(&self) -> Result<Observation<Self::Snapshot>, ProbeError>;
}

/// A [`Probe`] backed by a closure. Build one with [`probe_fn`].
pub struct FnProbe<F> {
    f: F,
}

/// Turn a closure returning a future into a [`Probe`].
///
/// # Example
///
/// ```
/// use hemmer_provider_waiter::{probe_fn, Observation, ProbeError};
///
/// let probe = probe_fn(|| async { Ok::<_, ProbeError>(Observation::new((), "ACTIVE")) });
/// # let _ = probe;
/// ```
pub fn probe_fn<F, Fut, T>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Observation<T>, ProbeError>> + Send + 'static,
    T: fmt::Debug + Send + 'static,
{
    FnProbe { f }
}

#[async_trait::async_trait]
impl<F, Fut, T> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Observation<T>, ProbeError>> + Send + 'static,
    T: fmt::Debug + Send + 'static,
{
    type Snapshot = T;

    async fn probe(&self) -> Result<Observation<T>, ProbeError> {
        (self.f)().await
    }
}
