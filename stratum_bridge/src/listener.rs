use std::{sync::Arc, time::Duration};

use log::{error, trace, warn};
use tokio::{
    select,
    sync::mpsc,
    time::{interval_at, sleep, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RECONNECT_RETRY_INTERVAL,
    node::{wait_for_sync, NodeConnector, NodeSession, NotificationHandler},
};

// Invoked each time a new block template may be available.
// It carries no payload: the receiver should fetch a fresh template if it wants one.
// Invocations are never deduplicated, the receiver must be idempotent.
pub type BlockReadyCallback = Arc<dyn Fn() + Send + Sync>;

// Signals new block template availability to the upstream consumer.
//
// Push notifications from the node are forwarded through a single slot
// channel: a notification arriving while the slot is full is dropped, and
// the fallback timer is what guarantees the callback runs at least once per
// block wait time. A push notification resets that timer.
pub struct BlockTemplateListener<C: NodeConnector> {
    session: Arc<NodeSession<C>>,
    block_wait_time: Duration,
    on_block_ready: BlockReadyCallback,
    shutdown: CancellationToken,
}

impl<C: NodeConnector> BlockTemplateListener<C> {
    pub fn new(
        session: Arc<NodeSession<C>>,
        block_wait_time: Duration,
        on_block_ready: BlockReadyCallback,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session,
            block_wait_time,
            on_block_ready,
            shutdown,
        }
    }

    // Runs until the shutdown token is cancelled
    pub async fn run(self) {
        let (block_ready_sender, mut block_ready_receiver) = mpsc::channel::<()>(1);
        let handler: NotificationHandler = Arc::new(move || {
            if let Err(e) = block_ready_sender.try_send(()) {
                trace!("block template notification dropped: {}", e);
            }
        });

        // Not fatal: the fallback timer still covers us at reduced responsiveness
        if let Err(e) = self
            .session
            .register_for_new_block_template_notifications(handler)
            .await
        {
            if log::log_enabled!(log::Level::Error) {
                error!(
                    "[node {}] failed to register for block notifications from node: {:#}",
                    self.session.address(),
                    e
                );
            }
        }

        let mut ticker = interval_at(
            Instant::now() + self.block_wait_time,
            self.block_wait_time,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match wait_for_sync(&self.session, false, &self.shutdown).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    if log::log_enabled!(log::Level::Error) {
                        error!(
                            "[node {}] error checking node sync state, attempting reconnect: {:#}",
                            self.session.address(),
                            e
                        );
                    }

                    if let Err(e) = self.session.reconnect().await {
                        if log::log_enabled!(log::Level::Error) {
                            error!(
                                "[node {}] error reconnecting to node, waiting before retry: {:#}",
                                self.session.address(),
                                e
                            );
                        }

                        // still wait for the next signal below, the fallback keeps firing
                        select! {
                            biased;
                            _ = self.shutdown.cancelled() => break,
                            _ = sleep(RECONNECT_RETRY_INTERVAL) => {}
                        }
                    }
                }
            }

            select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(()) = block_ready_receiver.recv() => {
                    trace!("new block template notification");
                    (self.on_block_ready)();
                    // next fallback is computed from now
                    ticker.reset();
                },
                _ = ticker.tick() => {
                    // timeout, manually check for new blocks
                    trace!("block wait time elapsed");
                    (self.on_block_ready)();
                }
            }
        }

        if log::log_enabled!(log::Level::Warn) {
            warn!(
                "[node {}] shutdown requested, stopping block template listener",
                self.session.address()
            );
        }
    }
}
