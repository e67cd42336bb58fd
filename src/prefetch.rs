//! Background cache warming
//!
//! After a location is shown, the locations next to it in the progression are
//! fetched in the background so stepping forward or back hits the cache.
//! Outcomes arrive on a tokio channel; failures are logged and reported but
//! never surface as errors.

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::data::{GameLocation, GeminiClient};

/// Messages sent from prefetch tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchMessage {
    /// Details for the location are now cached
    Warmed { location_id: String },
    /// Fetching the location failed
    Failed { location_id: String, error: String },
}

/// Handle for receiving prefetch outcomes
pub struct PrefetchHandle {
    /// Channel for receiving prefetch messages
    pub receiver: mpsc::Receiver<PrefetchMessage>,
    /// Number of tasks spawned
    expected: usize,
}

impl PrefetchHandle {
    /// Spawns one fetch per location
    ///
    /// # Arguments
    /// * `client` - Client whose cache should be warmed
    /// * `locations` - Locations to fetch, usually the neighbours of the current one
    ///
    /// # Returns
    /// A PrefetchHandle that receives one message per location. Dropping the
    /// handle does not cancel the tasks.
    pub fn spawn(client: GeminiClient, locations: Vec<&'static GameLocation>) -> Self {
        let (tx, rx) = mpsc::channel(locations.len().max(1));
        let expected = locations.len();

        for location in locations {
            let client = client.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let message = match client.fetch_location_details(location.name).await {
                    Ok(_) => {
                        debug!("Prefetched location {}", location.id);
                        PrefetchMessage::Warmed {
                            location_id: location.id.to_string(),
                        }
                    }
                    Err(e) => {
                        warn!("Prefetch failed for {}: {}", location.name, e);
                        PrefetchMessage::Failed {
                            location_id: location.id.to_string(),
                            error: e.to_string(),
                        }
                    }
                };
                // The receiver may be gone; the cache is warm either way
                let _ = tx.send(message).await;
            });
        }

        Self {
            receiver: rx,
            expected,
        }
    }

    /// Number of locations being prefetched
    pub fn len(&self) -> usize {
        self.expected
    }

    pub fn is_empty(&self) -> bool {
        self.expected == 0
    }
}

/// Checks for a pending prefetch message without blocking
pub fn try_recv(handle: &mut PrefetchHandle) -> Option<PrefetchMessage> {
    handle.receiver.try_recv().ok()
}

/// Waits for every spawned prefetch and returns the outcomes
pub async fn wait(mut handle: PrefetchHandle) -> Vec<PrefetchMessage> {
    let mut outcomes = Vec::with_capacity(handle.expected);
    while outcomes.len() < handle.expected {
        match handle.receiver.recv().await {
            Some(message) => outcomes.push(message),
            None => break,
        }
    }
    outcomes
}
