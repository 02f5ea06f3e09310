use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Passthrough for IO errors (open/read).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A required box was not found at the expected nesting level.
    ///
    /// Fatal for the whole extraction: without a timescale or sample table
    /// there is no reliable timeline to build.
    #[error("box not found: {name}")]
    BoxNotFound { name: String },

    /// A box header or fixed-layout box payload could not be fully read
    /// before the end of its containing range.
    #[error("truncated container data at offset {offset} while reading {context}")]
    Truncated { context: String, offset: usize },
}
