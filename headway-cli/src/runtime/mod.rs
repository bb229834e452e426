mod actions;
mod event_loop;

pub use actions::dispatch;
pub use event_loop::run_session;
