// Session-scoped storage used to suppress overlay replays.

pub mod session_flag;
