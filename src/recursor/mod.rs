pub mod exchange;
pub mod pool;

pub use exchange::ExchangeClient;
pub use pool::RecursorPool;
