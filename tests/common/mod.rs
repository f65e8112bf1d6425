//! Common test utilities

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use windrose::error::{FetchError, ProviderError};
use windrose::models::Coordinate;
use windrose::provider::Provider;

/// What a scripted provider answers on every call.
pub enum Script {
    /// One candidate, always.
    Answer(Coordinate),
    /// Success with zero candidates.
    Empty,
    /// Transport-level failure.
    Fail,
}

/// In-process provider stub with a fixed script, a call counter and
/// an optional per-call hook (called with the 1-based call ordinal).
pub struct ScriptedProvider {
    tag: String,
    script: Script,
    calls: Arc<AtomicUsize>,
    hook: Option<Box<dyn Fn(usize) + Send + Sync>>,
}

impl ScriptedProvider {
    pub fn new(tag: &str, script: Script) -> Self {
        Self {
            tag: tag.to_string(),
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            hook: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_hook(tag: &str, script: Script, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::new(tag, script)
        }
    }

    /// Shared handle onto the call counter, usable after the
    /// provider has been boxed away.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn resolve(&self, _address: &str) -> Result<Vec<Coordinate>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = &self.hook {
            hook(call);
        }

        match &self.script {
            Script::Answer(coordinate) => Ok(vec![*coordinate]),
            Script::Empty => Ok(Vec::new()),
            Script::Fail => Err(ProviderError::Fetch(FetchError::ServerError(500))),
        }
    }
}
