pub mod install;
pub mod join;
pub mod version;

use tokio_util::sync::CancellationToken;

/// Token cancelled on the first Ctrl-C.
///
/// Running child processes are left alone; the current step finishes and
/// nothing after it starts.
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            child.cancel();
        }
    });
    token
}
