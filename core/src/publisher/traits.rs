use async_trait::async_trait;

/// Accepts filtered task output.
#[async_trait]
pub trait TextSink: Send {
    async fn write_text(&mut self, text: &str);
}

/// Accepts error and diagnostic text. Implementations must not route it back
/// through a [`TextSink`].
#[async_trait]
pub trait ErrorReporter: Send {
    async fn report_error(&mut self, text: &str);
}
