//! Consentry core: consent lifecycle and data-exchange orchestration for a
//! federated dataspace.

pub mod consent;
pub mod transport;

#[cfg(test)]
mod tests;

/// Tracing initialization for the consentry services.
///
/// Enabled through the `consentry_tracing` feature; reads the filter from
/// `RUST_LOG` and stays silent when the variable is unset.
#[cfg(feature = "consentry_tracing")]
pub mod consentry_tracing {
    use std::sync::Once;

    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    pub fn init() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("off")),
                )
                .compact()
                .init();
        });
    }
}
