pub mod command_overlay;

pub use command_overlay::draw_command_overlay;
