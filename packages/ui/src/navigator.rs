/// Hands a URL to whatever owns the browser location.
///
/// Navigating away ends the current flow; the controller learns the result
/// only when the embedding frontend calls `resume` after returning.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}
