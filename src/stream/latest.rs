//! Latest-wins rate limiting

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to rate limit any Stream
pub trait LatestExt: Stream {
    /// Emit at most once per `period`, keeping only the newest item
    ///
    /// The first item goes out immediately. Items that arrive while waiting
    /// for the next slot replace each other. When the inner stream ends, a
    /// held item is flushed right away.
    fn latest_every(self, period: Duration) -> Latest<Self>
    where
        Self: Sized,
    {
        Latest::new(self, period)
    }
}

impl<T: Stream> LatestExt for T {}

pin_project! {
    /// Stream returned by [`LatestExt::latest_every`]
    pub struct Latest<S: Stream> {
        #[pin]
        stream: S,
        slots: Interval,
        held: Option<S::Item>,
        finished: bool,
    }
}

impl<S: Stream> Latest<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut slots = interval(period);
        slots.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, slots, held: None, finished: false }
    }
}

impl<S: Stream> Stream for Latest<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.finished {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.held = Some(item),
                Poll::Ready(None) => *this.finished = true,
                Poll::Pending => break,
            }
        }

        if this.held.is_none() {
            return if *this.finished { Poll::Ready(None) } else { Poll::Pending };
        }

        if !*this.finished {
            ready!(this.slots.poll_tick(cx));
        }

        Poll::Ready(this.held.take())
    }
}
