//! Change-notification bus: turns store-write signals into numbered,
//! ordered server-sent-event frames.

pub mod bus;
pub mod frame;

pub use bus::{NotificationBus, StoreWriteSink};
pub use frame::{Frame, StoreWrite};
