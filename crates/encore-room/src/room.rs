//! Room actor: an isolated Tokio task that owns one trivia game.
//!
//! Each room runs in its own task and is reached only through its command
//! channel. The round timer, the game-start content fetch, and reconnect
//! grace expiries are all branches of the same `select!` loop, so nothing
//! touches a room's state concurrently and a tick can never race a
//! player's last answer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use encore_content::{ContentError, RoundContent, RoundContentProvider, prefetch_rounds};
use encore_protocol::{Phase, Player, PlayerId, Recipient, RoomCode, ServerEvent};
use encore_session::PlayerSender;
use encore_tick::{RoundTimer, TimerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

use crate::registry::{RoomTable, lock_table};
use crate::{GameConfig, Room, RoomError};

/// Sent to the whole room when game-start content can't be assembled.
pub const CONTENT_FAILURE_MESSAGE: &str = "Failed to fetch all rounds. Please try again later.";

/// Counter for telling apart successive actors under the same code.
static NEXT_ROOM_INSTANCE: AtomicU64 = AtomicU64::new(1);

type PrefetchTask = JoinHandle<Result<Vec<RoundContent>, ContentError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        outbox: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Rejoin {
        player_id: PlayerId,
        prior: PlayerId,
        outbox: PlayerSender,
        reply: oneshot::Sender<Result<RejoinOutcome, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Disconnect {
        player_id: PlayerId,
    },
    StartGame {
        player_id: PlayerId,
        max_rounds: Option<u32>,
    },
    SetMaxRounds {
        player_id: PlayerId,
        max_rounds: u32,
    },
    SubmitAnswer {
        player_id: PlayerId,
        answer: String,
    },
    PlayAgain {
        player_id: PlayerId,
    },
    RefreshAvatar {
        player_id: PlayerId,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    /// Tear the room down, unconditionally or only if nobody is in it.
    Close {
        force: bool,
        reply: oneshot::Sender<bool>,
    },
    /// Posted by the room to itself when a reconnect window runs out.
    GraceExpired {
        player_id: PlayerId,
        stamp: u64,
    },
}

/// How a rejoin request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejoinOutcome {
    /// The prior seat was found and handed to the new connection.
    Restored,
    /// No seat was held for the prior id; the caller joined as new.
    JoinedFresh,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    /// Content for a game start is being fetched.
    pub starting: bool,
    pub player_count: usize,
    pub disconnected_count: usize,
    pub current_round: u32,
    pub max_rounds: u32,
    pub time_left: u32,
    pub host: Option<PlayerId>,
    pub players: Vec<Player>,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room; callers clone it out
/// and talk to the room without holding the registry lock.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// The room has torn down and accepts no more commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn closed(&self) -> RoomError {
        RoomError::Closed(self.code.clone())
    }

    async fn post(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.closed())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| self.closed())
    }

    /// Adds a player. Joining a room you are already in re-sends the
    /// snapshot.
    pub async fn join(&self, player_id: PlayerId, outbox: PlayerSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            outbox,
            reply,
        })
        .await?
    }

    /// Reclaims `prior`'s seat for `player_id`, or joins fresh if none is
    /// held.
    pub async fn rejoin(
        &self,
        player_id: PlayerId,
        prior: PlayerId,
        outbox: PlayerSender,
    ) -> Result<RejoinOutcome, RoomError> {
        self.request(|reply| RoomCommand::Rejoin {
            player_id,
            prior,
            outbox,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Reports a dropped connection (fire-and-forget).
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.post(RoomCommand::Disconnect { player_id }).await
    }

    pub async fn start_game(&self, player_id: PlayerId, max_rounds: Option<u32>) -> Result<(), RoomError> {
        self.post(RoomCommand::StartGame {
            player_id,
            max_rounds,
        })
        .await
    }

    pub async fn set_max_rounds(&self, player_id: PlayerId, max_rounds: u32) -> Result<(), RoomError> {
        self.post(RoomCommand::SetMaxRounds {
            player_id,
            max_rounds,
        })
        .await
    }

    pub async fn submit_answer(&self, player_id: PlayerId, answer: String) -> Result<(), RoomError> {
        self.post(RoomCommand::SubmitAnswer { player_id, answer })
            .await
    }

    pub async fn play_again(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.post(RoomCommand::PlayAgain { player_id }).await
    }

    pub async fn refresh_avatar(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.post(RoomCommand::RefreshAvatar { player_id }).await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tears the room down if it is vacant (or always, with `force`).
    /// Returns whether it closed.
    pub async fn close(&self, force: bool) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Close { force, reply })
            .await
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<P> {
    room: Room,
    instance: u64,
    provider: Arc<P>,
    table: RoomTable,
    timer: RoundTimer,
    prefetch: Option<PrefetchTask>,
    /// Pending grace-expiry sleepers, one per buffered seat.
    grace: HashMap<PlayerId, JoinHandle<()>>,
    next_stamp: u64,
    receiver: mpsc::Receiver<RoomCommand>,
    mailbox: mpsc::WeakSender<RoomCommand>,
    closed: bool,
}

impl<P: RoundContentProvider> RoomActor<P> {
    /// Runs the actor loop until the room tears down.
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        while !self.closed {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                event = self.timer.wait() => self.on_timer(event),
                fetched = join_prefetch(&mut self.prefetch) => self.on_prefetch(fetched),
            }
        }

        self.abort_background();
        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                outbox,
                reply,
            } => {
                self.join(player_id, outbox);
                let _ = reply.send(Ok(()));
            }
            RoomCommand::Rejoin {
                player_id,
                prior,
                outbox,
                reply,
            } => {
                let outcome = self.rejoin(player_id, prior, outbox);
                let _ = reply.send(Ok(outcome));
            }
            RoomCommand::Leave { player_id, reply } => {
                let _ = reply.send(self.leave(player_id));
            }
            RoomCommand::Disconnect { player_id } => self.disconnect(player_id),
            RoomCommand::StartGame {
                player_id,
                max_rounds,
            } => self.start_game(player_id, max_rounds),
            RoomCommand::SetMaxRounds {
                player_id,
                max_rounds,
            } => self.set_max_rounds(player_id, max_rounds),
            RoomCommand::SubmitAnswer { player_id, answer } => {
                self.submit_answer(player_id, &answer)
            }
            RoomCommand::PlayAgain { player_id } => self.play_again(player_id),
            RoomCommand::RefreshAvatar { player_id } => {
                if let Some(out) = self.room.refresh_avatar(player_id) {
                    self.room.dispatch(out);
                }
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Close { force, reply } => {
                let close = force || self.room.is_vacant();
                if close {
                    self.teardown("closed on request");
                }
                let _ = reply.send(close);
            }
            RoomCommand::GraceExpired { player_id, stamp } => self.grace_expired(player_id, stamp),
        }
    }

    // -- Membership -------------------------------------------------------

    fn join(&mut self, player_id: PlayerId, outbox: PlayerSender) {
        let out = self.room.join(player_id, outbox, self.timer.remaining());
        self.room.dispatch(out);
        tracing::info!(
            room = %self.room.code(),
            %player_id,
            players = self.room.len(),
            "player joined"
        );
    }

    fn rejoin(&mut self, player_id: PlayerId, prior: PlayerId, outbox: PlayerSender) -> RejoinOutcome {
        let time_left = self.timer.remaining();
        match self.room.rejoin(player_id, prior, outbox.clone(), time_left) {
            Some(out) => {
                if let Some(sleeper) = self.grace.remove(&prior) {
                    sleeper.abort();
                }
                self.room.dispatch(out);
                tracing::info!(room = %self.room.code(), %prior, %player_id, "player rejoined");
                RejoinOutcome::Restored
            }
            None => {
                tracing::debug!(room = %self.room.code(), %prior, "no seat held, joining fresh");
                self.join(player_id, outbox);
                RejoinOutcome::JoinedFresh
            }
        }
    }

    fn leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let Some(out) = self.room.leave(player_id) else {
            return Err(RoomError::NotInRoom(player_id, self.room.code().clone()));
        };
        self.room.dispatch(out);
        tracing::info!(
            room = %self.room.code(),
            %player_id,
            players = self.room.len(),
            "player left"
        );
        self.after_departure();
        Ok(())
    }

    fn disconnect(&mut self, player_id: PlayerId) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        let Some(out) = self.room.disconnect(player_id, stamp) else {
            tracing::debug!(room = %self.room.code(), %player_id, "disconnect for non-member");
            return;
        };
        self.room.dispatch(out);
        tracing::info!(
            room = %self.room.code(),
            %player_id,
            players = self.room.len(),
            "player disconnected, holding seat"
        );

        let mailbox = self.mailbox.clone();
        let grace = self.room.config().reconnect_grace;
        let sleeper = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(RoomCommand::GraceExpired { player_id, stamp }).await;
            }
        });
        if let Some(previous) = self.grace.insert(player_id, sleeper) {
            previous.abort();
        }
    }

    fn grace_expired(&mut self, player_id: PlayerId, stamp: u64) {
        if !self.room.expire(player_id, stamp) {
            return;
        }
        self.grace.remove(&player_id);
        tracing::info!(room = %self.room.code(), %player_id, "reconnect window elapsed, seat released");
        self.after_departure();
    }

    /// Post-conditions of a permanent departure.
    fn after_departure(&mut self) {
        if self.room.is_vacant() {
            self.teardown("room empty");
            return;
        }
        if self.room.phase() != Phase::Playing {
            return;
        }
        if self.room.len() == 1 {
            tracing::info!(room = %self.room.code(), "one player left, ending game");
            self.end_game();
        } else if self.timer.is_counting() && self.room.all_answered() {
            self.end_round();
        }
    }

    /// Moves players whose connection is gone into the reconnect buffer.
    fn drop_dead_connections(&mut self) {
        for player_id in self.room.reconcile() {
            tracing::warn!(room = %self.room.code(), %player_id, "connection gone, dropping from roster");
            self.disconnect(player_id);
        }
    }

    // -- Game flow --------------------------------------------------------

    fn start_game(&mut self, player_id: PlayerId, max_rounds: Option<u32>) {
        if self.prefetch.is_some() {
            tracing::debug!(room = %self.room.code(), "start ignored, already starting");
            return;
        }
        if let Err(e) = self.room.authorize_host(player_id) {
            tracing::info!(room = %self.room.code(), %player_id, reason = %e, "start rejected");
            return;
        }
        if let Some(requested) = max_rounds {
            self.room.apply_max_rounds(requested);
        }

        let rounds = self.room.max_rounds() as usize;
        let option_count = self.room.config().option_count;
        let spacing = self.room.config().content_spacing;
        let provider = Arc::clone(&self.provider);
        tracing::info!(room = %self.room.code(), rounds, "fetching round content");

        self.prefetch = Some(tokio::spawn(async move {
            prefetch_rounds(provider.as_ref(), rounds, option_count, spacing).await
        }));
    }

    fn on_prefetch(&mut self, fetched: Result<Result<Vec<RoundContent>, ContentError>, JoinError>) {
        let rounds = match fetched {
            Ok(Ok(rounds)) => rounds,
            Ok(Err(e)) => {
                tracing::warn!(room = %self.room.code(), error = %e, "game start aborted");
                self.abort_start();
                return;
            }
            Err(e) => {
                tracing::warn!(room = %self.room.code(), error = %e, "content fetch task failed");
                self.abort_start();
                return;
            }
        };

        self.drop_dead_connections();
        if self.room.is_empty() {
            self.teardown("no connected players at game start");
            return;
        }

        let out = self.room.begin_game(rounds);
        self.room.dispatch(out);
        tracing::info!(
            room = %self.room.code(),
            players = self.room.len(),
            max_rounds = self.room.max_rounds(),
            "game started"
        );
        self.start_next_round();
    }

    fn abort_start(&mut self) {
        self.room.dispatch(vec![(
            Recipient::All,
            ServerEvent::error(CONTENT_FAILURE_MESSAGE),
        )]);
        if self.room.is_vacant() {
            self.teardown("room empty after failed start");
        }
    }

    fn start_next_round(&mut self) {
        self.drop_dead_connections();
        if self.room.is_empty() {
            self.teardown("no connected players at round start");
            return;
        }

        match self.room.begin_round() {
            Some(out) => {
                self.room.dispatch(out);
                self.timer.start_countdown(self.room.config().round_time_secs);
                tracing::info!(
                    room = %self.room.code(),
                    round = self.room.current_round(),
                    "round started"
                );
            }
            None => self.end_game(),
        }
    }

    fn submit_answer(&mut self, player_id: PlayerId, answer: &str) {
        if !self.timer.is_counting() {
            tracing::debug!(room = %self.room.code(), %player_id, "answer outside a running round");
            return;
        }
        let Some(out) = self
            .room
            .record_answer(player_id, answer, self.timer.remaining())
        else {
            tracing::debug!(room = %self.room.code(), %player_id, "answer ignored");
            return;
        };
        self.room.dispatch(out);

        self.drop_dead_connections();
        if self.room.all_answered() {
            tracing::debug!(room = %self.room.code(), "all players answered");
            self.end_round();
        }
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { remaining } => {
                if self.room.phase() != Phase::Playing {
                    return;
                }
                self.room.dispatch(vec![(
                    Recipient::All,
                    ServerEvent::TimeUpdate {
                        time_left: remaining,
                    },
                )]);
                if remaining == 0 {
                    self.end_round();
                }
            }
            TimerEvent::SettleElapsed => self.start_next_round(),
        }
    }

    fn end_round(&mut self) {
        self.timer.cancel();
        self.drop_dead_connections();
        if self.room.is_empty() {
            self.teardown("no connected players at round end");
            return;
        }

        let out = self.room.finish_round();
        self.room.dispatch(out);
        tracing::info!(
            room = %self.room.code(),
            round = self.room.current_round(),
            "round ended"
        );

        if self.room.is_final_round() {
            self.end_game();
        } else {
            self.timer.start_settling(self.room.config().inter_round_pause);
        }
    }

    fn end_game(&mut self) {
        self.timer.cancel();
        let out = self.room.finish_game();
        self.room.dispatch(out);
        let winner = self
            .room
            .final_standings()
            .and_then(|s| s.first())
            .map(|s| s.player.id);
        tracing::info!(room = %self.room.code(), ?winner, "game over");
    }

    fn play_again(&mut self, player_id: PlayerId) {
        if !self.room.contains(player_id) {
            return;
        }
        if let Some(out) = self.room.reset() {
            self.room.dispatch(out);
            tracing::info!(room = %self.room.code(), %player_id, "room reset to lobby");
        }
    }

    fn set_max_rounds(&mut self, player_id: PlayerId, max_rounds: u32) {
        if self.prefetch.is_some() {
            return;
        }
        match self.room.set_max_rounds(player_id, max_rounds) {
            Ok(out) => self.room.dispatch(out),
            Err(e) => {
                tracing::info!(room = %self.room.code(), %player_id, reason = %e, "settings change rejected")
            }
        }
    }

    // -- Lifecycle --------------------------------------------------------

    /// Deregisters the room and closes its mailbox, both under the
    /// registry lock, then refuses whatever was still queued.
    fn teardown(&mut self, reason: &str) {
        self.timer.cancel();
        self.abort_background();
        {
            let mut table = lock_table(&self.table);
            if table
                .get(self.room.code())
                .is_some_and(|h| h.instance() == self.instance)
            {
                table.remove(self.room.code());
            }
            self.receiver.close();
        }
        while let Ok(cmd) = self.receiver.try_recv() {
            self.refuse(cmd);
        }
        self.closed = true;
        tracing::info!(room = %self.room.code(), reason, "room torn down");
    }

    fn refuse(&self, cmd: RoomCommand) {
        let closed = || RoomError::Closed(self.room.code().clone());
        match cmd {
            RoomCommand::Join { reply, .. } | RoomCommand::Leave { reply, .. } => {
                let _ = reply.send(Err(closed()));
            }
            RoomCommand::Rejoin { reply, .. } => {
                let _ = reply.send(Err(closed()));
            }
            RoomCommand::Close { reply, .. } => {
                let _ = reply.send(true);
            }
            _ => {}
        }
    }

    fn abort_background(&mut self) {
        if let Some(task) = self.prefetch.take() {
            task.abort();
        }
        for (_, sleeper) in self.grace.drain() {
            sleeper.abort();
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            starting: self.prefetch.is_some(),
            player_count: self.room.len(),
            disconnected_count: self.room.disconnected_count(),
            current_round: self.room.current_round(),
            max_rounds: self.room.max_rounds(),
            time_left: self.timer.remaining(),
            host: self.room.host(),
            players: self.room.players(),
        }
    }
}

/// Resolves when the game-start fetch finishes; pends while none runs.
async fn join_prefetch(slot: &mut Option<PrefetchTask>) -> Result<Result<Vec<RoundContent>, ContentError>, JoinError> {
    match slot {
        Some(task) => {
            let result = task.await;
            *slot = None;
            result
        }
        None => std::future::pending().await,
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room<P: RoundContentProvider>(
    code: RoomCode,
    config: &GameConfig,
    provider: Arc<P>,
    table: RoomTable,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_channel_size);
    let instance = NEXT_ROOM_INSTANCE.fetch_add(1, Ordering::Relaxed);

    let actor = RoomActor {
        room: Room::new(code.clone(), config.clone()),
        instance,
        provider,
        table,
        timer: RoundTimer::new(config.timer.clone()),
        prefetch: None,
        grace: HashMap::new(),
        next_stamp: 0,
        receiver: rx,
        mailbox: tx.downgrade(),
        closed: false,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        instance,
        sender: tx,
    }
}
