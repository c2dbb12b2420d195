//! Event channels.
//!
//! A small generic publish/subscribe primitive. Input events are published into
//! deferred channels from native callbacks and delivered later from the loop's
//! own stack, so user listeners never run inside a platform callback.

mod channel;

pub use channel::{Delivery, EventChannel, Subscription};
