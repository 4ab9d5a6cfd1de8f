// Synthetic book engine
pub mod types;  // levels, snapshots, snapshot-sets
pub mod book;   // level synthesis + quantity smoothing
