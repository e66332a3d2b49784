//! Console logging for the browser build.

use tracing::Level;

/// Console verbosity: debug builds log history and overlay decisions,
/// release builds only warnings and up.
pub fn console_level() -> Level {
    if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

/// Install the panic hook and a `tracing` subscriber writing to the
/// browser console. Safe to call more than once.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn init_logging() {
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    console_error_panic_hook::set_once();

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level())
            .build(),
    );
    let reg = Registry::default().with(wasm_layer);

    // A second init keeps the first subscriber.
    let _ = set_global_default(reg);
}

/// No-op on non-WASM targets.
#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
pub fn init_logging() {}
