pub mod init_db;
pub mod purge_expired;
pub mod serve;
