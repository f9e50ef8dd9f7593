//! Command implementations

pub mod create;
pub mod delete;
pub mod init;
pub mod ls;
pub mod recover;
pub mod refs;
pub mod show;
pub mod status;
pub mod update;
