//! User-facing contracts: the program, its extensions, and the contexts the
//! loop hands them.

mod app;
mod ctx;

pub use app::{AppHandle, Extension, Program};
pub use ctx::{FrameCtx, ProgramCtx, Transforms};

pub(crate) use ctx::{
    clipboard_or_empty, run_draw_pipeline, set_clipboard_logged, set_window_position,
    window_position,
};
