/// Native module contains implementations of core traits
/// on top of the host's own processes and filesystem, using
/// syscalls directly instead of a container runtime.
pub mod limits;
pub mod runner;
pub mod workspace;
