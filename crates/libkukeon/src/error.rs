/// LibkukeonError aggregates the per-module error types so callers that do
/// not care which collaborator failed can hold a single error.
#[derive(Debug, thiserror::Error)]
pub enum LibkukeonError {
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
    #[error(transparent)]
    Cgroup(#[from] crate::cgroup::CgroupError),
    #[error(transparent)]
    Runtime(#[from] crate::runtime::RuntimeError),
    #[error(transparent)]
    Network(#[from] crate::network::NetworkError),
    #[error(transparent)]
    Scheme(#[from] crate::scheme::SchemeError),
    #[error(transparent)]
    Controller(#[from] crate::controller::ControllerError),
    #[error(transparent)]
    Apply(#[from] crate::apply::ApplyError),
}
