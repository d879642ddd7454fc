// Stateful application stores
// Each store owns one slice of mutable state; all of them are constructed
// once by the AppContext and shared by Arc, never by implicit globals

pub mod deep_link;
pub mod operations;
pub mod session;
