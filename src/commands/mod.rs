pub mod add_import;
pub mod consolidate;
pub mod dedupe;
pub mod migrate;
pub mod verify;
pub mod widgets;

pub use add_import::add_import;
pub use consolidate::consolidate;
pub use dedupe::dedupe;
pub use migrate::migrate;
pub use verify::{OutputFormat, verify};
pub use widgets::widgets;
