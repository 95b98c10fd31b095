pub mod client;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod orientation;
pub mod snapshot;

pub use client::{CreatedSession, HttpSessionClient, SessionApi, DEFAULT_REQUEST_TIMEOUT};
pub use controller::{
    ControllerEvent, ControllerSettings, ControllerView, LifecycleState, SessionController,
};
pub use error::ClientError;
pub use metrics::{Metrics, TerminationRule};
pub use orientation::{rotation_between, AgentPose, OrientationMemory, Rotation};
pub use snapshot::Snapshot;
