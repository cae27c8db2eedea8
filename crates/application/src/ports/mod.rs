//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod debug_service;
mod environment_service;
mod interface_catalog;
mod sinks;

pub use clock::Clock;
pub use debug_service::{
    DEBUG_SUCCESS_CODE, DebugJobId, DebugResult, DebugService, PlanContext, PollResponse,
};
pub use environment_service::EnvironmentService;
pub use interface_catalog::InterfaceCatalogService;
pub use sinks::{ConfirmationGate, ConnectionSink, ExecutionRecorder, NoopNotifier};
