// ABOUTME: Container runtime abstraction for running job images
// ABOUTME: Defines the ContainerRuntime trait and its Docker implementation

pub mod docker;
pub mod runtime;

pub use docker::DockerRuntime;
pub use runtime::{ContainerConfig, ContainerRuntime, ContainerStatus, RuntimeError, VolumeMount};
