//! Chain-head polling loop that hands newly available block numbers to the
//! processor, one at a time.

use std::{ops::Range, sync::Arc, time::Duration};

use ledger_watch_domain::model::BlockNumber;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{rpc::LedgerSource, worker::MonitorError};

pub struct BlockDiscovery<S: ?Sized> {
    source: Arc<S>,
    poll_interval: Duration,
    /// First number not yet handed off. `None` until seeded.
    high_water_mark: Option<BlockNumber>,
    blocks_tx: mpsc::Sender<BlockNumber>,
    cancel: CancellationToken,
}

impl<S> BlockDiscovery<S>
where
    S: LedgerSource + ?Sized,
{
    /// A non-zero `start_block` seeds the mark; zero defers seeding to the
    /// first observed head.
    pub fn new(
        source: Arc<S>,
        poll_interval: Duration,
        start_block: BlockNumber,
        blocks_tx: mpsc::Sender<BlockNumber>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            poll_interval,
            high_water_mark: (start_block != 0).then_some(start_block),
            blocks_tx,
            cancel,
        }
    }

    pub fn high_water_mark(&self) -> Option<BlockNumber> {
        self.high_water_mark
    }

    /// Polls once per `poll_interval`, measured from the start of each tick.
    /// A tick that overruns delays the next one instead of bursting.
    pub async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("block discovery cancelled");
                    break;
                }

                _ = ticker.tick() => {}
            }

            if let Err(err) = self.tick().await {
                match err {
                    MonitorError::ChannelClosed => {
                        warn!("block relay closed, stopping discovery");
                        break;
                    }
                    other => {
                        counter!("monitor_head_poll_failures_total", 1);
                        warn!(error = %other, "failed to fetch chain head, skipping tick");
                    }
                }
            }

            if self.cancel.is_cancelled() {
                info!("block discovery cancelled");
                break;
            }
        }
        info!(mark = ?self.high_water_mark, "block discovery stopped");
    }

    /// One poll: fetch the head and emit whatever became available.
    pub async fn tick(&mut self) -> Result<(), MonitorError> {
        let head = self.source.current_block_number().await?;
        let Some(range) = self.advance(head) else {
            return Ok(());
        };

        debug!(from = range.start, to = range.end, "emitting new blocks");
        for number in range {
            tokio::select! {
                biased;

                // dropped mid-range; the mark has already moved past it
                _ = self.cancel.cancelled() => return Ok(()),

                sent = self.blocks_tx.send(number) => {
                    sent.map_err(|_| MonitorError::ChannelClosed)?;
                }
            }
        }
        Ok(())
    }

    /// Moves the mark to `head` and returns the numbers that became
    /// available, if any. Never moves the mark backwards.
    fn advance(&mut self, head: BlockNumber) -> Option<Range<BlockNumber>> {
        let Some(mark) = self.high_water_mark else {
            info!(head, "seeding discovery from current chain head");
            self.high_water_mark = Some(head);
            return None;
        };

        if head == mark {
            debug!(head, "no new blocks");
            return None;
        }
        if head < mark {
            warn!(head, mark, "chain head is behind the discovery mark, waiting");
            return None;
        }

        self.high_water_mark = Some(head);
        Some(mark..head)
    }
}
