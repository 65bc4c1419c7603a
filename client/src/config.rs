use shared::Record;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Capacity of the inbound record channel.
    pub record_buffer: usize,
    /// Capacity of the engine control channel.
    pub command_buffer: usize,
    /// Ask the server to re-send the seek list after one of the user's games
    /// ends, since it stops reporting seek removals during play.
    pub refresh_seeks_after_game: bool,
}

impl ClientConfig {
    /// Builds the inbound record channel with `record_buffer` slots, at
    /// least one.
    pub fn record_channel(&self) -> (mpsc::Sender<Record>, mpsc::Receiver<Record>) {
        mpsc::channel(self.record_buffer.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            record_buffer: 1000,
            command_buffer: 64,
            refresh_seeks_after_game: true,
        }
    }
}
