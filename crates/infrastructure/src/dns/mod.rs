pub mod system_resolver;

pub use system_resolver::{order_by_family, SystemDnsResolver};
