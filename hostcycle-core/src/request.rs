use std::fmt;

/// Callback run once a refresh cycle completed successfully.
///
/// An error (or a panic) raised here is logged and swallowed: it never turns
/// the cycle into a failure.
pub type OnComplete = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// One refresh request: what a caller of `refresh()` asked for.
pub struct RefreshRequest {
    pub retrieve_business_objects: bool,
    pub on_complete: Option<OnComplete>,
    pub immediate: bool,
}

impl RefreshRequest {
    pub fn new(retrieve_business_objects: bool) -> Self {
        Self {
            retrieve_business_objects,
            on_complete: None,
            immediate: false,
        }
    }

    pub fn with_on_complete<F>(mut self, on_complete: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("retrieve_business_objects", &self.retrieve_business_objects)
            .field("has_on_complete", &self.on_complete.is_some())
            .field("immediate", &self.immediate)
            .finish()
    }
}
