pub mod local;
pub mod truncate;

pub use local::LocalDomainResolver;
pub use truncate::Truncator;
