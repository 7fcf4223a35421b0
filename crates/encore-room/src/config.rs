//! Game configuration.

use std::time::Duration;

use encore_protocol::MAX_ROUNDS_LIMIT;
use encore_tick::TimerConfig;
use serde::{Deserialize, Serialize};

/// Tunables shared by every room on a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Length of one round's countdown, in seconds.
    pub round_time_secs: u32,

    /// Rounds per game until the host changes it.
    pub default_max_rounds: u32,

    /// Upper bound the host may pick. Never above the protocol's limit.
    pub max_rounds_limit: u32,

    /// Options per round: the correct answer plus distractors.
    pub option_count: usize,

    /// Pause between a round's results and the next round.
    pub inter_round_pause: Duration,

    /// How long a disconnected player's seat is held for a rejoin.
    pub reconnect_grace: Duration,

    /// Delay between successive content provider calls at game start.
    pub content_spacing: Duration,

    /// Capacity of each room actor's command channel.
    pub command_channel_size: usize,

    #[serde(skip)]
    pub timer: TimerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_time_secs: 15,
            default_max_rounds: 3,
            max_rounds_limit: MAX_ROUNDS_LIMIT,
            option_count: 4,
            inter_round_pause: Duration::from_secs(5),
            reconnect_grace: Duration::from_secs(120),
            content_spacing: Duration::from_millis(1000),
            command_channel_size: 64,
            timer: TimerConfig::default(),
        }
    }
}

impl GameConfig {
    /// Clamps out-of-range values to something a room can run with.
    pub fn validated(mut self) -> Self {
        if self.round_time_secs == 0 {
            tracing::warn!("round_time_secs is 0, using 1");
            self.round_time_secs = 1;
        }
        self.max_rounds_limit = self.max_rounds_limit.clamp(1, MAX_ROUNDS_LIMIT);
        self.default_max_rounds = self.default_max_rounds.clamp(1, self.max_rounds_limit);
        if self.option_count < 2 {
            tracing::warn!(option_count = self.option_count, "option_count below 2, using 2");
            self.option_count = 2;
        }
        self.command_channel_size = self.command_channel_size.max(1);
        self.timer = self.timer.validated();
        self
    }

    /// Brings a requested round count into `1..=max_rounds_limit`.
    pub fn clamp_rounds(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_rounds_limit)
    }
}
