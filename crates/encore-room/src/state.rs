//! A room's game state and rules, with no I/O and no clock.
//!
//! Every mutation returns the events it produced as a list of
//! `(Recipient, ServerEvent)` pairs. The actor in [`crate::room`] decides
//! when to call what (timers, content fetches) and hands the output to
//! [`Room::dispatch`]. Keeping the rules synchronous means they can be
//! tested without a runtime.

use std::collections::{HashMap, VecDeque};

use encore_content::RoundContent;
use encore_protocol::{
    AnswerRecord, GameSnapshot, Phase, Player, PlayerId, Recipient, RoomCode, Scores, ServerEvent,
    Standing,
};
use encore_session::PlayerSender;
use rand::Rng;

use crate::{GameConfig, RoomError};

/// Events produced by one mutation, in send order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

/// Avatar image URL for a seed.
pub fn avatar_url(seed: &str) -> String {
    format!("{AVATAR_BASE_URL}{seed}")
}

/// Points for a correct answer with `remaining` of `round_time` seconds
/// left: `1000 + floor(remaining / round_time * 500)`.
pub fn points_for(remaining: u32, round_time: u32) -> u32 {
    let round_time = u64::from(round_time.max(1));
    let remaining = u64::from(remaining).min(round_time);
    1000 + (remaining * 500 / round_time) as u32
}

// ---------------------------------------------------------------------------
// Roster entries
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Member {
    player: Player,
    /// Position in join order; survives a disconnect/rejoin.
    join_seq: u64,
    outbox: PlayerSender,
}

#[derive(Debug, Clone)]
struct PendingAnswer {
    answer: String,
    elapsed_seconds: u32,
}

/// A disconnected player's seat, held for the reconnect grace window.
#[derive(Debug)]
struct Departed {
    player: Player,
    join_seq: u64,
    /// Identifies the disconnect this seat came from, so a stale grace
    /// expiry can't evict a player who rejoined and dropped again.
    stamp: u64,
    /// `(round, answer)` if they had answered the round in progress.
    answer: Option<(u32, PendingAnswer)>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One trivia game: roster, phase, rounds, scores, reconnect buffer.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    config: GameConfig,
    phase: Phase,
    /// Connected players in join order.
    members: Vec<Member>,
    next_join_seq: u64,
    max_rounds: u32,
    current_round: u32,
    upcoming: VecDeque<RoundContent>,
    current: Option<RoundContent>,
    /// This round's answers in submission order.
    answers: Vec<(PlayerId, PendingAnswer)>,
    final_standings: Option<Vec<Standing>>,
    departed: HashMap<PlayerId, Departed>,
}

impl Room {
    pub fn new(code: RoomCode, config: GameConfig) -> Self {
        Self {
            code,
            max_rounds: config.default_max_rounds,
            config,
            phase: Phase::Lobby,
            members: Vec::new(),
            next_join_seq: 0,
            current_round: 0,
            upcoming: VecDeque::new(),
            current: None,
            answers: Vec::new(),
            final_standings: None,
            departed: HashMap::new(),
        }
    }

    // -- Queries ----------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Connected players.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Players held in the reconnect buffer.
    pub fn disconnected_count(&self) -> usize {
        self.departed.len()
    }

    /// No one connected and no one waiting to rejoin.
    pub fn is_vacant(&self) -> bool {
        self.members.is_empty() && self.departed.is_empty()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.position(player_id).is_some()
    }

    pub fn is_departed(&self, player_id: PlayerId) -> bool {
        self.departed.contains_key(&player_id)
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.members
            .iter()
            .find(|m| m.player.is_host)
            .map(|m| m.player.id)
    }

    /// Connected players in join order.
    pub fn players(&self) -> Vec<Player> {
        self.members.iter().map(|m| m.player.clone()).collect()
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.position(player_id).map(|i| &self.members[i].player)
    }

    /// The score ledger. Always has an entry for every connected player.
    pub fn scores(&self) -> Scores {
        self.members
            .iter()
            .map(|m| (m.player.id, m.player.score))
            .collect()
    }

    /// Answers recorded for the round in progress.
    pub fn pending_count(&self) -> usize {
        self.answers.len()
    }

    pub fn has_answered(&self, player_id: PlayerId) -> bool {
        self.answers.iter().any(|(id, _)| *id == player_id)
    }

    pub fn current_content(&self) -> Option<&RoundContent> {
        self.current.as_ref()
    }

    pub fn final_standings(&self) -> Option<&[Standing]> {
        self.final_standings.as_deref()
    }

    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.max_rounds
    }

    /// What a joining connection needs to render the room.
    pub fn snapshot(&self, time_left: u32) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            current_round: self.current_round,
            max_rounds: self.max_rounds,
            time_left,
            scores: self.scores(),
            final_standings: self.final_standings.clone(),
        }
    }

    /// Players whose connection has gone away without a disconnect having
    /// reached the room yet.
    pub fn reconcile(&self) -> Vec<PlayerId> {
        self.members
            .iter()
            .filter(|m| m.outbox.is_closed())
            .map(|m| m.player.id)
            .collect()
    }

    // -- Membership -------------------------------------------------------

    /// Adds a new player, or re-sends the snapshot if they're already here.
    pub fn join(&mut self, player_id: PlayerId, outbox: PlayerSender, time_left: u32) -> Outbound {
        if let Some(i) = self.position(player_id) {
            self.members[i].outbox = outbox;
            let player = self.members[i].player.clone();
            let mut out = vec![(
                Recipient::Player(player_id),
                ServerEvent::RoomJoined {
                    room_code: self.code.clone(),
                    player,
                    players: self.players(),
                    game: self.snapshot(time_left),
                },
            )];
            self.push_catch_up(&mut out, player_id, time_left);
            return out;
        }

        let player = Player {
            id: player_id,
            name: format!("Player {}", self.members.len() + 1),
            avatar: avatar_url(&player_id.0.to_string()),
            is_host: self.members.is_empty(),
            score: 0,
        };
        let join_seq = self.next_join_seq;
        self.next_join_seq += 1;
        self.members.push(Member {
            player: player.clone(),
            join_seq,
            outbox,
        });

        let players = self.players();
        let mut out = vec![(
            Recipient::Player(player_id),
            ServerEvent::RoomJoined {
                room_code: self.code.clone(),
                player: player.clone(),
                players: players.clone(),
                game: self.snapshot(time_left),
            },
        )];
        self.push_catch_up(&mut out, player_id, time_left);
        out.push((
            Recipient::AllExcept(player_id),
            ServerEvent::UserJoined { player, players },
        ));
        out
    }

    /// Restores `prior`'s seat under the new id `player_id`.
    ///
    /// `prior` may be in the reconnect buffer or, if its disconnect hasn't
    /// arrived yet, still in the roster with a closed outbox. A seat whose
    /// connection is still live is never taken over. Score, join position
    /// and host role carry over, as does an answer already given this
    /// round. Returns `None` if there is no such seat.
    pub fn rejoin(
        &mut self,
        player_id: PlayerId,
        prior: PlayerId,
        outbox: PlayerSender,
        time_left: u32,
    ) -> Option<Outbound> {
        let (mut player, join_seq, answer) = if let Some(seat) = self.departed.remove(&prior) {
            (seat.player, seat.join_seq, seat.answer)
        } else {
            let i = self.position(prior)?;
            if !self.members[i].outbox.is_closed() {
                tracing::debug!(room = %self.code, %prior, %player_id, "rejoin refused, seat still connected");
                return None;
            }
            let answer = self.take_answer(prior);
            let member = self.members.remove(i);
            (member.player, member.join_seq, answer)
        };

        let was_host = player.is_host;
        player.id = player_id;
        player.is_host = false;
        let at = self.members.partition_point(|m| m.join_seq < join_seq);
        self.members.insert(
            at,
            Member {
                player,
                join_seq,
                outbox,
            },
        );
        if was_host || self.host().is_none() {
            self.make_host(player_id);
        }

        if let Some((round, pending)) = answer
            && self.phase == Phase::Playing
            && self.current.is_some()
            && round == self.current_round
        {
            self.answers.push((player_id, pending));
        }

        tracing::debug!(room = %self.code, %prior, %player_id, was_host, "seat restored");

        let player = self.members[at].player.clone();
        let players = self.players();
        let mut out = vec![(
            Recipient::Player(player_id),
            ServerEvent::RoomRejoined {
                room_code: self.code.clone(),
                player: player.clone(),
                players: players.clone(),
                game: self.snapshot(time_left),
            },
        )];
        self.push_catch_up(&mut out, player_id, time_left);
        out.push((
            Recipient::AllExcept(player_id),
            ServerEvent::UserRejoined { player, players },
        ));
        Some(out)
    }

    /// Removes a player for good. Returns `None` if they aren't connected.
    pub fn leave(&mut self, player_id: PlayerId) -> Option<Outbound> {
        let i = self.position(player_id)?;
        self.members.remove(i);
        self.answers.retain(|(id, _)| *id != player_id);
        self.ensure_host();
        Some(self.user_left(player_id))
    }

    /// Moves a player from the roster into the reconnect buffer.
    pub fn disconnect(&mut self, player_id: PlayerId, stamp: u64) -> Option<Outbound> {
        let i = self.position(player_id)?;
        let answer = self.take_answer(player_id);
        let member = self.members.remove(i);
        self.departed.insert(
            player_id,
            Departed {
                player: member.player,
                join_seq: member.join_seq,
                stamp,
                answer,
            },
        );
        self.ensure_host();
        Some(self.user_left(player_id))
    }

    /// Drops a buffered seat whose grace window ran out. Returns `false`
    /// if the seat is gone or belongs to a later disconnect.
    pub fn expire(&mut self, player_id: PlayerId, stamp: u64) -> bool {
        match self.departed.get(&player_id) {
            Some(seat) if seat.stamp == stamp => {
                self.departed.remove(&player_id);
                true
            }
            _ => false,
        }
    }

    /// New avatar seed for a player.
    pub fn refresh_avatar(&mut self, player_id: PlayerId) -> Option<Outbound> {
        let i = self.position(player_id)?;
        let nonce: u32 = rand::rng().random();
        self.members[i].player.avatar = avatar_url(&format!("{}-{nonce:08x}", player_id.0));
        let player = self.members[i].player.clone();
        Some(vec![(
            Recipient::All,
            ServerEvent::PlayerUpdated {
                player,
                players: self.players(),
            },
        )])
    }

    // -- Host actions -----------------------------------------------------

    /// Checks that `player_id` may configure or start a game right now.
    pub fn authorize_host(&self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.phase != Phase::Lobby {
            return Err(RoomError::InvalidState(format!(
                "room {} is in phase {}",
                self.code, self.phase
            )));
        }
        if self.host() != Some(player_id) {
            return Err(RoomError::Unauthorized(player_id));
        }
        Ok(())
    }

    /// Host-only, Lobby-only round-count change.
    pub fn set_max_rounds(&mut self, player_id: PlayerId, requested: u32) -> Result<Outbound, RoomError> {
        self.authorize_host(player_id)?;
        let max_rounds = self.apply_max_rounds(requested);
        Ok(vec![(Recipient::All, ServerEvent::SettingsUpdated { max_rounds })])
    }

    /// Sets the round count, clamped. Caller has already authorized.
    pub fn apply_max_rounds(&mut self, requested: u32) -> u32 {
        self.max_rounds = self.config.clamp_rounds(requested);
        self.max_rounds
    }

    // -- Game flow --------------------------------------------------------

    /// Enters `Playing` with a full set of prefetched rounds.
    pub fn begin_game(&mut self, rounds: Vec<RoundContent>) -> Outbound {
        self.transition(Phase::Playing);
        self.current_round = 0;
        self.zero_scores();
        self.final_standings = None;
        self.answers.clear();
        self.current = None;
        self.upcoming = rounds.into();
        vec![(
            Recipient::All,
            ServerEvent::GameStart {
                max_rounds: self.max_rounds,
            },
        )]
    }

    /// Advances to the next round. `None` means there is no next round
    /// and the game should end.
    pub fn begin_round(&mut self) -> Option<Outbound> {
        if self.phase != Phase::Playing || self.current_round >= self.max_rounds {
            return None;
        }
        let content = self.upcoming.pop_front()?;
        self.current_round += 1;
        self.answers.clear();

        let event = ServerEvent::NewRound {
            round_number: self.current_round,
            max_rounds: self.max_rounds,
            content: content.view(),
            time_left: self.config.round_time_secs,
        };
        self.current = Some(content);
        Some(vec![(Recipient::All, event)])
    }

    /// Scores one answer. `None` if it doesn't count: wrong phase, no
    /// round running, unknown player, or a second answer this round.
    pub fn record_answer(&mut self, player_id: PlayerId, answer: &str, remaining: u32) -> Option<Outbound> {
        if self.phase != Phase::Playing || self.has_answered(player_id) {
            return None;
        }
        let content = self.current.as_ref()?;
        let i = self.position(player_id)?;

        let round_time = self.config.round_time_secs;
        let remaining = remaining.min(round_time);
        let correct = content.is_correct(answer);
        let points = if correct {
            points_for(remaining, round_time)
        } else {
            0
        };
        let correct_answer = content.correct_answer().to_owned();

        self.members[i].player.score += points;
        self.answers.push((
            player_id,
            PendingAnswer {
                answer: answer.trim().to_owned(),
                elapsed_seconds: round_time - remaining,
            },
        ));

        Some(vec![
            (
                Recipient::Player(player_id),
                ServerEvent::AnswerResult {
                    correct,
                    points,
                    correct_answer,
                },
            ),
            (
                Recipient::All,
                ServerEvent::ScoreUpdate {
                    scores: self.scores(),
                    players: self.players(),
                },
            ),
        ])
    }

    /// Every connected player has answered the round in progress.
    pub fn all_answered(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| self.has_answered(m.player.id))
    }

    /// Closes the round in progress and reports results.
    pub fn finish_round(&mut self) -> Outbound {
        let correct_answer = self
            .current
            .take()
            .map(|c| c.correct_answer().to_owned())
            .unwrap_or_default();

        let answers = std::mem::take(&mut self.answers)
            .into_iter()
            .map(|(id, pending)| AnswerRecord {
                player_id: id,
                player: self.player(id).map(|p| p.name.clone()).unwrap_or_default(),
                answer: pending.answer,
                elapsed_seconds: pending.elapsed_seconds,
            })
            .collect();

        vec![(
            Recipient::All,
            ServerEvent::RoundEnd {
                round_number: self.current_round,
                correct_answer,
                scores: self.scores(),
                answers,
                players: self.players(),
            },
        )]
    }

    /// Ranks the roster and enters `GameOver`.
    ///
    /// Standings are by score, highest first; ties keep join order.
    pub fn finish_game(&mut self) -> Outbound {
        let mut standings: Vec<Standing> = self
            .members
            .iter()
            .map(|m| Standing {
                player: m.player.clone(),
                final_score: m.player.score,
            })
            .collect();
        // `sort_by` is stable and members are in join order.
        standings.sort_by(|a, b| b.final_score.cmp(&a.final_score));

        self.transition(Phase::GameOver);
        self.current = None;
        self.upcoming.clear();
        self.answers.clear();
        self.final_standings = Some(standings.clone());

        let winner = standings.first().cloned();
        vec![(Recipient::All, ServerEvent::GameOver { standings, winner })]
    }

    /// Play-again: back to `Lobby` with a clean slate. `None` unless the
    /// game is over.
    pub fn reset(&mut self) -> Option<Outbound> {
        if self.phase != Phase::GameOver {
            return None;
        }
        self.transition(Phase::Lobby);
        self.current_round = 0;
        self.zero_scores();
        self.final_standings = None;
        self.current = None;
        self.upcoming.clear();
        self.answers.clear();
        Some(vec![(
            Recipient::All,
            ServerEvent::GameReset {
                phase: self.phase,
                players: self.players(),
            },
        )])
    }

    /// Delivers events to connected players. Sends to closed outboxes are
    /// dropped; reconciliation picks those players up later.
    pub fn dispatch(&self, out: Outbound) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for m in &self.members {
                        let _ = m.outbox.send(event.clone());
                    }
                }
                Recipient::Player(id) => {
                    if let Some(i) = self.position(id) {
                        let _ = self.members[i].outbox.send(event);
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for m in self.members.iter().filter(|m| m.player.id != excluded) {
                        let _ = m.outbox.send(event.clone());
                    }
                }
            }
        }
    }

    // -- Internals --------------------------------------------------------

    fn position(&self, player_id: PlayerId) -> Option<usize> {
        self.members.iter().position(|m| m.player.id == player_id)
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase change {} -> {next}",
            self.phase
        );
        tracing::debug!(room = %self.code, from = %self.phase, to = %next, "phase change");
        self.phase = next;
    }

    fn make_host(&mut self, player_id: PlayerId) {
        for m in &mut self.members {
            m.player.is_host = m.player.id == player_id;
        }
    }

    /// Promotes the earliest-joined player if nobody is host.
    fn ensure_host(&mut self) {
        if self.host().is_none()
            && let Some(first) = self.members.first_mut()
        {
            first.player.is_host = true;
            tracing::info!(room = %self.code, player_id = %first.player.id, "host reassigned");
        }
    }

    fn take_answer(&mut self, player_id: PlayerId) -> Option<(u32, PendingAnswer)> {
        let i = self.answers.iter().position(|(id, _)| *id == player_id)?;
        let (_, pending) = self.answers.remove(i);
        Some((self.current_round, pending))
    }

    fn zero_scores(&mut self) {
        for m in &mut self.members {
            m.player.score = 0;
        }
        for seat in self.departed.values_mut() {
            seat.player.score = 0;
        }
    }

    fn push_catch_up(&self, out: &mut Outbound, player_id: PlayerId, time_left: u32) {
        if self.phase != Phase::Playing {
            return;
        }
        let Some(content) = &self.current else {
            return;
        };
        out.push((
            Recipient::Player(player_id),
            ServerEvent::NewRound {
                round_number: self.current_round,
                max_rounds: self.max_rounds,
                content: content.view(),
                time_left,
            },
        ));
        out.push((
            Recipient::Player(player_id),
            ServerEvent::TimeUpdate { time_left },
        ));
    }

    fn user_left(&self, player_id: PlayerId) -> Outbound {
        vec![(
            Recipient::All,
            ServerEvent::UserLeft {
                player_id,
                players: self.players(),
            },
        )]
    }
}
