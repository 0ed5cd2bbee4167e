//! Streaming observation: execution as a lazy event sequence.

use crate::executor::FlowExecutor;
use cascade_eventbus::{ExecutionEvent, ExecutionObserver};
use cascade_flow::Flow;
use cascade_value::Object;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// A forward-only sequence of execution events. Dropping the stream
/// cancels the underlying run at its next suspension point.
pub type EventStream = UnboundedReceiverStream<ExecutionEvent>;

/// Bridges the observer bus into a channel, converting a dropped
/// receiver into cooperative cancellation.
struct ChannelObserver {
    sender: mpsc::UnboundedSender<ExecutionEvent>,
    cancellation: CancellationToken,
}

impl ExecutionObserver for ChannelObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        if self.sender.send(event.clone()).is_err() {
            // Consumer is gone; stop the run instead of computing
            // results nobody will read.
            self.cancellation.cancel();
        }
    }
}

impl FlowExecutor {
    /// Run a flow, yielding its events as a stream:
    /// `ExecutionStarted`, component enter/exit pairs, and exactly one
    /// terminal event.
    ///
    /// The run executes on a spawned task. Dropping the returned
    /// stream cancels it cooperatively.
    #[must_use]
    pub fn run_streamed(&self, flow: Arc<Flow>, initial_variables: Object) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancellation = CancellationToken::new();

        // Per-run observer set: everything already registered, plus
        // the channel bridge.
        let mut observers = (*self.engine.observers).clone();
        observers.register(Arc::new(ChannelObserver {
            sender,
            cancellation: cancellation.clone(),
        }));

        let mut engine = self.engine.clone();
        engine.observers = Arc::new(observers);
        let executor = FlowExecutor {
            engine,
            config: self.config.clone(),
        };

        tokio::spawn(async move {
            let _ = executor
                .execute_with_cancellation(&flow, initial_variables, cancellation)
                .await;
        });

        UnboundedReceiverStream::new(receiver)
    }
}
