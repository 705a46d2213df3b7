mod batch;
mod traits;
mod truncate;

pub use batch::{BatchedPublisher, TOO_LARGE_FALLBACK_OUTPUT};
pub use traits::{ErrorReporter, TextSink};
pub use truncate::{encoded_len, CappedText, TRUNCATION_MARKER};
