// reserved default names
pub const DEFAULT_SCOPE_NAME: &str = "_default";
pub const DEFAULT_COLLECTION_NAME: &str = "_default";

// naming constants
pub const MAX_NAME_LENGTH: usize = 251;

// storage constants
// The separator cannot appear in any valid scope/collection name, so the
// composed tree name is unambiguous.
pub const TREE_NAME_SEPARATOR: &str = "|";

// event constants
pub const COLLECTION_CHANGE_TOPIC: &str = "strata_collection_change";

// mutation constants
// Upper bound on read-handler-write cycles in a conflict-handler save; a
// race that persists past this many observed revisions is surfaced as
// ErrorKind::ConflictExhausted rather than looping forever.
pub const MAX_CONFLICT_RETRIES: usize = 10;
