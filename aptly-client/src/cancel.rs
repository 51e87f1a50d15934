// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Cooperative cancellation.

A [CancelToken] is cloned into every concurrent operation; the matching
[CancelHandle] broadcasts cancellation (typically wired to SIGINT). Workers
observe the token between requests and abort in-flight work by racing
against [CancelToken::cancelled].
*/

use tokio::sync::watch;

/// Broadcasts cancellation to every token cloned from [cancel_pair].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to all tokens.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observer side of a cancellation signal.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never be cancelled.
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();

        loop {
            if *rx.borrow() {
                return;
            }

            // A dropped handle means cancellation can no longer happen.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);

    (CancelHandle { tx }, CancelToken { rx })
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn observes_cancellation() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn never_token_pends() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            token.cancelled(),
        )
        .await;
        assert!(pending.is_err());
    }
}
