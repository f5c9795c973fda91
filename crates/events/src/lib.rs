//! Engine events and their distribution.
//!
//! The allocation engine never reaches for a global notification hook; every
//! listener is handed to it explicitly as an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
