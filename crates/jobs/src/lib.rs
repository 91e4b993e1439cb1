//! Job lifecycle domain module.
//!
//! Business rules for jobs and the participants attached to them, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Every
//! transition returns the next state of a job as a new value; persisting it
//! atomically is the infrastructure layer's concern.

pub mod job;
pub mod location;
pub mod user;

pub use job::{Job, JobStatus, NewJob, Transition};
pub use location::{AcceptAllVerifier, GeoPoint, LocationVerdict, LocationVerifier};
pub use user::{Role, User};
