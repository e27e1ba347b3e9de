use std::future::Future;
use std::io;

use distill_engine::CancellationToken;
use distill_logging::{distill_info, distill_warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Exit status after a forced interrupt: 128 + SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// Ctrl-C listener that cancels `token`. A second Ctrl-C quits the process.
///
/// Once tokio installs its handler, Ctrl-C no longer terminates the process by
/// itself, so dropping the listener leaves a task behind that exits on the
/// next interrupt.
pub struct CancelListener {
    task: JoinHandle<()>,
}

#[derive(Debug, PartialEq, Eq)]
enum Watch {
    Released,
    ForceExit,
}

impl CancelListener {
    pub fn spawn(token: CancellationToken) -> Self {
        let task = tokio::spawn(async move {
            if watch(&token, tokio::signal::ctrl_c).await == Watch::ForceExit {
                std::process::exit(INTERRUPTED_EXIT);
            }
        });
        Self { task }
    }
}

impl Drop for CancelListener {
    fn drop(&mut self) {
        self.task.abort();
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(INTERRUPTED_EXIT);
                }
            });
        }
    }
}

async fn watch<I, F>(token: &CancellationToken, mut interrupt: I) -> Watch
where
    I: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        signal = interrupt() => {
            if let Err(err) = signal {
                distill_warn!("Could not listen for Ctrl-C: {}", err);
                return Watch::Released;
            }
        }
        _ = token.cancelled() => return Watch::Released,
    }
    distill_info!("Interrupt received; cancelling (press Ctrl-C again to quit)");
    token.cancel();
    match interrupt().await {
        Ok(()) => Watch::ForceExit,
        Err(_) => Watch::Released,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;

    fn interrupts(notify: &Arc<Notify>) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = io::Result<()>> + Send>> {
        let notify = Arc::clone(notify);
        move || {
            let notify = Arc::clone(&notify);
            Box::pin(async move {
                notify.notified().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn first_interrupt_cancels_and_second_forces_exit() {
        let token = CancellationToken::new();
        let notify = Arc::new(Notify::new());
        let watcher = tokio::spawn({
            let token = token.clone();
            let source = interrupts(&notify);
            async move { watch(&token, source).await }
        });

        notify.notify_one();
        token.cancelled().await;
        notify.notify_one();
        assert_eq!(watcher.await.unwrap(), Watch::ForceExit);
    }

    #[tokio::test]
    async fn finishing_first_releases_without_waiting_for_interrupts() {
        let token = CancellationToken::new();
        let notify = Arc::new(Notify::new());
        token.cancel();
        assert_eq!(watch(&token, interrupts(&notify)).await, Watch::Released);
    }
}
