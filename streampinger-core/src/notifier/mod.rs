//! Discord-side consumers of activity transitions and member joins.

pub mod hub;
pub mod render;
pub mod welcome;

pub use hub::{DestinationBinding, NotificationHub};
pub use welcome::WelcomeTemplate;
