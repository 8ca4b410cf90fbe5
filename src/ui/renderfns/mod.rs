pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{display_host, draw_header};
pub use utils::{relative_date, status_color, status_label, truncate};
