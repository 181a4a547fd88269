//! Tracing setup shared by the CLI and every adapter: a dual-mode
//! subscriber (compact for a terminal, JSON for a log collector) plus a
//! panic hook that routes abrupt thread deaths through tracing instead
//! of stderr so a crashed adapter still leaves a trace behind.

use std::panic;

use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output shape for the tracing subscriber. `Auto` picks `Json` in
/// release builds and `Compact` otherwise, matching what an operator
/// running the CLI by hand versus under a process supervisor expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
    Auto,
}

impl LogFormat {
    fn resolve(self) -> bool {
        match self {
            LogFormat::Json => true,
            LogFormat::Compact => false,
            LogFormat::Auto => !cfg!(debug_assertions),
        }
    }
}

/// Installs the global tracing subscriber and panic hook. Panics if a
/// subscriber is already installed; call this once, at process start.
pub fn init_tracing(service_name: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={level},reqwest=warn,hyper=warn").into()
    });

    if format.resolve() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    }

    install_panic_hook(service_name);
}

fn install_panic_hook(service_name: &str) {
    let service_name = service_name.to_string();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");

        error!(
            target: "panic",
            service = %service_name,
            location = %location,
            "thread panicked: {}",
            payload
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_to_a_fixed_choice_per_build() {
        let resolved = LogFormat::Auto.resolve();
        assert_eq!(resolved, !cfg!(debug_assertions));
    }

    #[test]
    fn explicit_formats_do_not_depend_on_build_profile() {
        assert!(LogFormat::Json.resolve());
        assert!(!LogFormat::Compact.resolve());
    }
}
