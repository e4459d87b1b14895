//! Built-in step handlers and command-backed external steps.

mod command;
mod fetch;
mod media;
mod persist;
mod resolve;

pub use command::{CommandSink, CommandStep};
pub use fetch::FetchStep;
pub use media::{ExtractMediaStep, BANNER_OUTPUT};
pub use persist::{PersistRecordStep, RecordSink};
pub use resolve::{ResolveEntityStep, INSIGHT_FILE};
