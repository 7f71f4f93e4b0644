/// event_sync actor module
pub mod event_sync;
