pub mod categories;
pub mod chat;
pub mod classify;
pub mod init;
pub mod serve;
