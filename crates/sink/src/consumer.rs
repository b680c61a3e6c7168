use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use telegauge_stream::{BlockingQueue, StreamMessage, StreamProducer};
use tracing::{debug, error, info};

use crate::error::ConsumerError;
use crate::processor::{SampleProcessor, SessionStats};

/// Drains the producer's inbound queue on its own thread and runs every
/// message through a [`SampleProcessor`].
///
/// The consumer is the orchestration root of a session: starting it starts
/// the producer, stopping it closes the producer first so the blocked
/// consumer thread is woken by the close sentinel, then joins.
pub struct SampleConsumer {
    producer: StreamProducer,
    processor: Option<SampleProcessor>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<SessionStats>>,
}

impl SampleConsumer {
    pub fn new(producer: StreamProducer, processor: SampleProcessor) -> Self {
        Self {
            producer,
            processor: Some(processor),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn start(&mut self) -> Result<(), ConsumerError> {
        if self.is_running() {
            return Err(ConsumerError::AlreadyStarted);
        }
        let processor = self.processor.take().ok_or(ConsumerError::Spent)?;
        let inbound = self.producer.inbound();

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let queue = inbound.clone();
        let handle = thread::Builder::new()
            .name("telegauge-consumer".into())
            .spawn(move || consume(queue, running, processor))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ConsumerError::Spawn(e)
            })?;
        self.handle = Some(handle);

        if let Err(e) = self.producer.start() {
            error!(error = %e, "Stream producer failed to start");
            // The producer never ran, so its close won't wake us.
            self.running.store(false, Ordering::SeqCst);
            inbound.put_prioritized(StreamMessage::Closed);
            self.join();
            return Err(e.into());
        }
        info!("Sample consumer started");
        Ok(())
    }

    /// Ends the session and returns its counters. A no-op returning `None`
    /// when not running.
    pub fn stop(&mut self) -> Option<SessionStats> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return None;
        }
        self.producer.close();

        let stats = self.join()?;
        info!(
            messages = stats.messages,
            persisted = stats.persisted,
            skipped = stats.skipped,
            discarded = stats.discarded,
            write_failures = stats.write_failures,
            "Sample consumer stopped"
        );
        Some(stats)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the producer is still reading from the remote source. Goes
    /// false on a hang-up while the session itself keeps running until
    /// [`stop`](Self::stop).
    pub fn is_streaming(&self) -> bool {
        self.producer.is_polling()
    }

    /// Queues a message for the remote source.
    pub fn send(&self, message: impl Into<String>) {
        self.producer.send(message);
    }

    fn join(&mut self) -> Option<SessionStats> {
        match self.handle.take()?.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                error!("Sample consumer thread panicked");
                None
            }
        }
    }
}

impl Drop for SampleConsumer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn consume(
    inbound: Arc<dyn BlockingQueue<StreamMessage>>,
    running: Arc<AtomicBool>,
    mut processor: SampleProcessor,
) -> SessionStats {
    // The flag is only re-read after a wake; the last wait is satisfied by
    // the sentinel the producer pushes on close.
    while running.load(Ordering::SeqCst) {
        match inbound.wait_and_pop() {
            StreamMessage::Text(message) => processor.handle(&message),
            StreamMessage::Closed => debug!("Consumer woken by close sentinel"),
        }
    }
    processor.stats()
}
