// External collaborator seams
// Traits for the protocol library, durable storage and the host router,
// plus the coordinator logic layered directly on top of them

pub mod navigation;
pub mod protocol;
pub mod storage;
