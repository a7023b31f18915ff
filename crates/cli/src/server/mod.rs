pub mod admin;

pub use admin::start_admin_server;
