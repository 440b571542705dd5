mod check;
mod fmt_html;

pub use check::run_check;
pub use fmt_html::run_fmt_html;
