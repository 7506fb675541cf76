// Screening engine: normalize → vectorize → score → rank → shortlist.
// Everything below `handlers` is synchronous and free of I/O; handlers run the
// pipeline inside spawn_blocking.

pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod ranking;
pub mod similarity;
pub mod token_set;
pub mod vectorizer;
