pub mod header;
pub mod utils;

pub use header::draw_header;
pub use utils::{format_number, hex_color, status_color, truncate};
