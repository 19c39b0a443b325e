//! Application state shared by the pipeline stages and handlers.

use std::sync::Arc;

use bizkit_lib::{EnglishTranslator, TenantStrategy, Translator};

use crate::health::{DependencyProbe, Readiness};
use crate::logger::{LogSink, LoggerConfig, TracingSink};
use crate::trace::TracePropagator;

/// Shared application state for every stage and handler.
///
/// Cheap to clone (everything sits behind one `Arc`) and shared through
/// axum's `State` extractor. Stages receive their collaborators from here
/// instead of from process-wide globals.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use bizkit_service_shared::{AppState, TenantStrategy};
///
/// let state = AppState::new(Arc::new(my_probe))
///     .with_tenant_strategy(TenantStrategy::FullHost);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Clone)]
struct AppStateInner {
    translator: Arc<dyn Translator>,
    propagator: Arc<TracePropagator>,
    log_sink: Arc<dyn LogSink>,
    logger_config: Arc<LoggerConfig>,
    tenant_strategy: TenantStrategy,
    readiness: Readiness,
}

impl AppState {
    /// State with English messages, a tracing log sink, and default logger settings.
    pub fn new(probe: Arc<dyn DependencyProbe>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                translator: Arc::new(EnglishTranslator::new()),
                propagator: Arc::new(TracePropagator::new()),
                log_sink: Arc::new(TracingSink::default()),
                logger_config: Arc::new(LoggerConfig::default()),
                tenant_strategy: TenantStrategy::default(),
                readiness: Readiness::new(probe),
            }),
        }
    }

    fn map(self, update: impl FnOnce(&mut AppStateInner)) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.inner);
        update(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn with_translator(self, translator: Arc<dyn Translator>) -> Self {
        self.map(|inner| inner.translator = translator)
    }

    pub fn with_log_sink(self, sink: Arc<dyn LogSink>) -> Self {
        self.map(|inner| inner.log_sink = sink)
    }

    pub fn with_logger_config(self, config: LoggerConfig) -> Self {
        self.map(|inner| inner.logger_config = Arc::new(config))
    }

    pub fn with_tenant_strategy(self, strategy: TenantStrategy) -> Self {
        self.map(|inner| inner.tenant_strategy = strategy)
    }

    pub fn translator(&self) -> &dyn Translator {
        self.inner.translator.as_ref()
    }

    pub fn propagator(&self) -> &TracePropagator {
        &self.inner.propagator
    }

    pub fn log_sink(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.inner.log_sink)
    }

    pub fn logger_config(&self) -> &LoggerConfig {
        &self.inner.logger_config
    }

    pub fn tenant_strategy(&self) -> TenantStrategy {
        self.inner.tenant_strategy
    }

    pub fn readiness(&self) -> &Readiness {
        &self.inner.readiness
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("locale", &self.inner.translator.locale())
            .field("tenant_strategy", &self.inner.tenant_strategy)
            .field("logger_config", &self.inner.logger_config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StaticProbe;

    #[test]
    fn test_defaults() {
        let state = AppState::new(Arc::new(StaticProbe::healthy()));
        assert_eq!(state.translator().locale(), "en");
        assert_eq!(state.tenant_strategy(), TenantStrategy::FirstLabel);
        assert_eq!(state.logger_config(), &LoggerConfig::default());
    }

    #[test]
    fn test_builders_do_not_affect_existing_clones() {
        let original = AppState::new(Arc::new(StaticProbe::healthy()));
        let updated = original
            .clone()
            .with_tenant_strategy(TenantStrategy::FullHost);

        assert_eq!(original.tenant_strategy(), TenantStrategy::FirstLabel);
        assert_eq!(updated.tenant_strategy(), TenantStrategy::FullHost);
    }
}
