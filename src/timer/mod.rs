pub mod controller;
pub mod countdown;
pub mod state;
pub mod view;

pub use controller::SessionController;
pub use state::{SessionConfig, SessionRecord, SessionStatus};
pub use view::SessionView;
