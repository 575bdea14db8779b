//! Artifact Module
//!
//! Read-once transient artifacts built on the keyed cache and the dispatcher.

mod manager;
mod record;

pub use manager::{
    with_artifact_namespaces, ArtifactStore, CLAIM_NAMESPACE, CLAIM_OPERATION, LOCATION_NAMESPACE,
    PAYLOAD_EXPIRY_GRACE, PAYLOAD_NAMESPACE, RETRIEVE_OPERATION,
};
pub use record::{ArtifactHandle, ArtifactLocation, RetrievedPayload};
