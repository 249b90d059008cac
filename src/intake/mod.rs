mod poller;
mod seen;

pub use poller::Poller;
pub use seen::{InMemorySeen, SeenStore};
