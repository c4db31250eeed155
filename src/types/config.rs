/// # Config
/// Settings for a [`crate::RelyingParty`] instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path prefix the middleware intercepts, e.g. `/auth/o8`. Requests are
    /// expected at `<uri_prefix>/<provider>`.
    pub uri_prefix: String,
    /// Log per-request flow errors through `tracing`.
    pub verbose: bool,
}

impl Config {
    /// Creates a config with the given prefix and logging disabled.
    pub fn new(uri_prefix: impl Into<String>) -> Self {
        Config {
            uri_prefix: uri_prefix.into(),
            verbose: false,
        }
    }

    /// Enables per-request error logging.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}
