// Application context
// One explicit state-manager object constructed at launch and passed by
// reference; no global signals

pub mod app_context;
