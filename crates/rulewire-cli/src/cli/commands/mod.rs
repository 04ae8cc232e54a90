mod check;
mod fetch;
mod ship;

pub use check::run_check;
pub use fetch::run_fetch;
pub use ship::run_ship;
