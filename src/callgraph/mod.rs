mod expansion;
mod forest;
mod parse;
mod record;

pub use expansion::ExpansionSet;
pub use forest::{CallForest, ForestNode, NodeIndex, root_positions};
pub use parse::{DatasetError, load_records_file, parse_records};
pub use record::{CallRef, FunctionKey, FunctionRecord};
