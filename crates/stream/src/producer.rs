use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::StreamError;
use crate::queue::{BlockingQueue, ThreadSafeQueue};
use crate::transport::{ConnectionState, Transport};

/// Element type of the inbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// A payload exactly as received from the transport.
    Text(String),
    /// Injected with priority by [`StreamProducer::close`] so a consumer
    /// blocked on the queue wakes up. Never produced by the wire.
    Closed,
}

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Upper bound on a single transport poll.
    pub poll_timeout: Duration,
    /// Pause before the loop exits after the connection is found closed.
    pub closed_grace: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            closed_grace: Duration::from_millis(100),
        }
    }
}

/// Pumps messages from a [`Transport`] into an inbound queue on a dedicated
/// thread.
///
/// The producer is the only owner of its transport: the transport moves into
/// the polling thread on [`start`](Self::start) and is closed there when the
/// loop ends. A producer runs at most one session.
pub struct StreamProducer {
    transport: Option<Box<dyn Transport>>,
    inbound: Arc<dyn BlockingQueue<StreamMessage>>,
    outbound: Arc<dyn BlockingQueue<String>>,
    running: Arc<AtomicBool>,
    polling: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    config: ProducerConfig,
}

impl StreamProducer {
    pub fn new(transport: Box<dyn Transport>, config: ProducerConfig) -> Self {
        Self::with_queues(
            transport,
            Arc::new(ThreadSafeQueue::new()),
            Arc::new(ThreadSafeQueue::new()),
            config,
        )
    }

    pub fn with_queues(
        transport: Box<dyn Transport>,
        inbound: Arc<dyn BlockingQueue<StreamMessage>>,
        outbound: Arc<dyn BlockingQueue<String>>,
        config: ProducerConfig,
    ) -> Self {
        Self {
            transport: Some(transport),
            inbound,
            outbound,
            running: Arc::new(AtomicBool::new(false)),
            polling: Arc::new(AtomicBool::new(false)),
            handle: None,
            config,
        }
    }

    pub fn start(&mut self) -> Result<(), StreamError> {
        if self.is_running() {
            return Err(StreamError::AlreadyStarted);
        }
        let transport = self.transport.take().ok_or(StreamError::TransportConsumed)?;

        self.running.store(true, Ordering::SeqCst);
        self.polling.store(true, Ordering::SeqCst);
        let worker = PollLoop {
            transport,
            inbound: self.inbound.clone(),
            outbound: self.outbound.clone(),
            running: self.running.clone(),
            polling: self.polling.clone(),
            config: self.config.clone(),
        };
        let spawned = thread::Builder::new()
            .name("telegauge-producer".into())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!("Stream producer started");
                Ok(())
            }
            Err(source) => {
                // The transport went down with the closure; this producer is spent.
                self.running.store(false, Ordering::SeqCst);
                self.polling.store(false, Ordering::SeqCst);
                Err(StreamError::Spawn { name: "producer", source })
            }
        }
    }

    /// Queues `message` for the polling thread to write to the transport.
    pub fn send(&self, message: impl Into<String>) {
        self.outbound.put(message.into());
    }

    /// Blocks until the next inbound message. Returns [`StreamMessage::Closed`]
    /// once the producer has been closed.
    pub fn recv(&self) -> StreamMessage {
        self.inbound.wait_and_pop()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<StreamMessage> {
        self.inbound.wait_and_pop_for(timeout)
    }

    /// Shared handle on the inbound queue for whoever drains it.
    pub fn inbound(&self) -> Arc<dyn BlockingQueue<StreamMessage>> {
        self.inbound.clone()
    }

    /// True between a successful [`start`](Self::start) and
    /// [`close`](Self::close), i.e. while close still owes the inbound queue
    /// its [`StreamMessage::Closed`]. Stays true after a remote hang-up; see
    /// [`is_polling`](Self::is_polling).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True while the polling thread is still reading from the transport.
    /// Cleared when the loop exits for any reason, including a hang-up or a
    /// failed poll.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Stops the polling thread and wakes any thread blocked on the inbound
    /// queue. A no-op when not running.
    pub fn close(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inbound.put_prioritized(StreamMessage::Closed);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Stream producer thread panicked");
            }
        }
        info!("Stream producer closed");
    }
}

impl Drop for StreamProducer {
    fn drop(&mut self) {
        self.close();
    }
}

struct PollLoop {
    transport: Box<dyn Transport>,
    inbound: Arc<dyn BlockingQueue<StreamMessage>>,
    outbound: Arc<dyn BlockingQueue<String>>,
    running: Arc<AtomicBool>,
    polling: Arc<AtomicBool>,
    config: ProducerConfig,
}

impl PollLoop {
    fn run(mut self) {
        while self.running.load(Ordering::SeqCst) {
            if self.transport.state() == ConnectionState::Closed {
                info!("Remote closed the connection");
                thread::sleep(self.config.closed_grace);
                break;
            }

            self.flush_outbound();

            // Bounded on purpose: a silent peer must not hide the running flag.
            if let Err(e) = self.transport.poll(self.config.poll_timeout) {
                error!(error = ?e, "Transport poll failed; stopping producer");
                break;
            }
            let inbound = &self.inbound;
            self.transport
                .dispatch(&mut |message| inbound.put(StreamMessage::Text(message)));
        }

        self.transport.close();
        self.polling.store(false, Ordering::SeqCst);
        debug!("Producer loop exited");
    }

    fn flush_outbound(&mut self) {
        while let Some(message) = self.outbound.try_pop() {
            if let Err(e) = self.transport.send(&message) {
                warn!(error = ?e, "Dropping outbound message");
            }
        }
    }
}
