//! Bookshelf application library
//!
//! Wires the book store, the application modules and the HTTP server together.

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::{BookStore, FileBookStore, MemoryBookStore};
use bookshelf_kernel::{
    settings::{Settings, StorageBackend, StorageSettings},
    InitCtx, ModuleRegistry,
};

/// Re-export commonly used types
pub use modules::*;

/// Open the configured book store
pub async fn open_store(settings: &StorageSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    let store: Arc<dyn BookStore> = match settings.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory book store; data is lost on shutdown");
            Arc::new(MemoryBookStore::new())
        }
        StorageBackend::File => Arc::new(
            FileBookStore::open(&settings.path)
                .await
                .with_context(|| {
                    format!("failed to open book store at {}", settings.path.display())
                })?,
        ),
    };
    Ok(store)
}

/// Build a registry holding every application module over `store`
pub fn build_registry(store: Arc<dyn BookStore>) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store);
    registry
}

/// Run the server until Ctrl-C or SIGTERM
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let store = open_store(&settings.storage).await?;
    let registry = build_registry(store);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_modules().await?;
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
