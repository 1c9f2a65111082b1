//! エンティティ
//!
//! `Room` が 1 ルーム分の状態（参加者・チャット履歴・モデレーション状態）を所有し、
//! 状態遷移はすべて `Room` のメソッドを通して行います。
//! ロックやメッセージ送信は扱わず、純粋な状態遷移だけを表現します。

use std::collections::{HashMap, VecDeque};

use super::{
    error::ModerationError,
    value_object::{ChatText, ConnectionId, EventId, MessageId, Timestamp, UserId, UserName},
};

/// 認証済みユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub user_name: UserName,
}

impl Identity {
    pub fn new(user_id: UserId, user_name: UserName) -> Self {
        Self { user_id, user_name }
    }
}

/// 1 接続ぶんのセッション
///
/// 接続タスクだけが所有し、他の接続から参照されることはありません。
/// `current_room` はキックや重複参加による退出後も残ることがありますが、
/// ルーム側の参加者マップに存在しない限り操作は無視されます。
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub current_room: Option<EventId>,
}

impl ConnectionSession {
    pub fn new(connection_id: ConnectionId, identity: Identity) -> Self {
        Self {
            connection_id,
            identity,
            current_room: None,
        }
    }
}

/// 参加者ごとのミュート状態
///
/// `HostMuted` からは本人の操作だけで抜け出せません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteState {
    Unmuted,
    SelfMuted,
    HostMuted,
}

/// ルーム参加者（1 接続につき 1 件）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub user_name: UserName,
    pub mute: MuteState,
    pub is_speaking: bool,
    pub joined_at: Timestamp,
}

impl Participant {
    /// 参加直後はミュート状態
    pub fn new(
        connection_id: ConnectionId,
        identity: &Identity,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            user_id: identity.user_id,
            user_name: identity.user_name.clone(),
            mute: MuteState::SelfMuted,
            is_speaking: false,
            joined_at,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.mute != MuteState::Unmuted
    }

    pub fn is_host_muted(&self) -> bool {
        self.mute == MuteState::HostMuted
    }

    fn mute_by_host(&mut self) {
        self.mute = MuteState::HostMuted;
        self.is_speaking = false;
    }
}

/// チャットメッセージ（作成後は不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub user_name: UserName,
    pub text: String,
    pub timestamp: Timestamp,
    pub is_system: bool,
}

impl ChatMessage {
    pub fn from_user(identity: &Identity, text: ChatText, timestamp: Timestamp) -> Self {
        Self {
            id: MessageId::generate(),
            user_id: identity.user_id,
            user_name: identity.user_name.clone(),
            text: text.into_string(),
            timestamp,
            is_system: false,
        }
    }

    pub fn system(text: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: MessageId::generate(),
            user_id: UserId::SYSTEM,
            user_name: UserName::system(),
            text: text.into(),
            timestamp,
            is_system: true,
        }
    }
}

/// 本人によるミュート切り替えの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfMuteOutcome {
    Updated(Participant),
    /// ホストにミュートされているため解除できない
    RejectedByHostMute,
    NotInRoom,
}

/// 発話状態の更新結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakingOutcome {
    Changed(Participant),
    Unchanged,
    NotInRoom,
}

/// ホストによるミュート / ミュート解除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMuteOutcome {
    Applied(Participant),
    /// 対象がすでに目的の状態にある
    Unchanged,
    TargetNotFound,
}

/// ルームのスナップショット（参加直後の本人に返す）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub participants: Vec<ParticipantView>,
    pub chat_history: Vec<ChatMessage>,
    pub host_user_id: Option<UserId>,
    pub my_user_id: UserId,
}

/// `isHost` を付与した参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    pub participant: Participant,
    pub is_host: bool,
}

/// 1 イベントぶんのウォッチパーティルーム
#[derive(Debug, Clone)]
pub struct Room {
    pub event_id: EventId,
    pub created_at: Timestamp,
    host_user_id: Option<UserId>,
    participants: HashMap<ConnectionId, Participant>,
    chat_history: VecDeque<ChatMessage>,
    /// レジストリから外された後に true になる
    closed: bool,
}

impl Room {
    /// 保持するチャット履歴の上限
    pub const HISTORY_CAPACITY: usize = 200;
    /// 参加時のスナップショットに含める履歴の件数
    pub const SNAPSHOT_HISTORY_LEN: usize = 100;

    pub fn new(event_id: EventId, created_at: Timestamp) -> Self {
        Self {
            event_id,
            created_at,
            host_user_id: None,
            participants: HashMap::new(),
            chat_history: VecDeque::new(),
            closed: false,
        }
    }

    pub fn host_user_id(&self) -> Option<UserId> {
        self.host_user_id
    }

    /// ホストを設定する。最初に解決できた値が優先され、以後は上書きしない。
    ///
    /// # Returns
    ///
    /// 今回の呼び出しで設定された場合は `true`
    pub fn set_host_if_unset(&mut self, host_user_id: UserId) -> bool {
        if self.host_user_id.is_some() {
            return false;
        }
        self.host_user_id = Some(host_user_id);
        true
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host_user_id == Some(user_id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(connection_id)
    }

    pub fn find_by_user(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.values().find(|p| p.user_id == user_id)
    }

    /// 参加日時順（同時刻なら接続 ID 順）に並べた参加者
    pub fn participants(&self) -> Vec<&Participant> {
        let mut participants: Vec<&Participant> = self.participants.values().collect();
        participants.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        participants
    }

    pub fn view(&self, participant: &Participant) -> ParticipantView {
        ParticipantView {
            participant: participant.clone(),
            is_host: self.is_host(participant.user_id),
        }
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.participants.keys().cloned().collect()
    }

    pub fn connection_ids_except(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.participants
            .keys()
            .filter(|id| *id != exclude)
            .cloned()
            .collect()
    }

    /// 参加者を追加する
    ///
    /// 同じユーザーが別の接続で参加済みの場合、その古い参加者を取り除いてから追加する。
    ///
    /// # Returns
    ///
    /// 取り除かれた古い参加者（いれば）
    pub fn admit(&mut self, participant: Participant) -> Option<Participant> {
        let stale = self
            .participants
            .values()
            .find(|p| p.user_id == participant.user_id && p.connection_id != participant.connection_id)
            .map(|p| p.connection_id.clone());
        let evicted = stale.and_then(|id| self.participants.remove(&id));

        self.participants
            .insert(participant.connection_id.clone(), participant);
        evicted
    }

    pub fn remove_participant(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.remove(connection_id)
    }

    /// 履歴に追加し、上限を超えた古いメッセージを捨てる
    pub fn append_message(&mut self, message: ChatMessage) {
        self.chat_history.push_back(message);
        while self.chat_history.len() > Self::HISTORY_CAPACITY {
            self.chat_history.pop_front();
        }
    }

    pub fn message_count(&self) -> usize {
        self.chat_history.len()
    }

    /// 直近 `limit` 件のメッセージ（古い順）
    pub fn recent_messages(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.chat_history.len().saturating_sub(limit);
        self.chat_history.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot_for(&self, my_user_id: UserId) -> RoomSnapshot {
        RoomSnapshot {
            participants: self
                .participants()
                .into_iter()
                .map(|p| self.view(p))
                .collect(),
            chat_history: self.recent_messages(Self::SNAPSHOT_HISTORY_LEN),
            host_user_id: self.host_user_id,
            my_user_id,
        }
    }

    /// 本人によるミュート切り替え
    pub fn apply_self_mute(
        &mut self,
        connection_id: &ConnectionId,
        is_muted: bool,
    ) -> SelfMuteOutcome {
        let Some(participant) = self.participants.get_mut(connection_id) else {
            return SelfMuteOutcome::NotInRoom;
        };

        match (participant.mute, is_muted) {
            (MuteState::HostMuted, false) => return SelfMuteOutcome::RejectedByHostMute,
            (MuteState::HostMuted, true) => {}
            (_, true) => participant.mute = MuteState::SelfMuted,
            (_, false) => participant.mute = MuteState::Unmuted,
        }
        if is_muted {
            participant.is_speaking = false;
        }
        SelfMuteOutcome::Updated(participant.clone())
    }

    pub fn set_speaking(&mut self, connection_id: &ConnectionId, is_speaking: bool) -> SpeakingOutcome {
        let Some(participant) = self.participants.get_mut(connection_id) else {
            return SpeakingOutcome::NotInRoom;
        };
        if participant.is_speaking == is_speaking {
            return SpeakingOutcome::Unchanged;
        }
        participant.is_speaking = is_speaking;
        SpeakingOutcome::Changed(participant.clone())
    }

    fn authorize(&self, requester: UserId, target: Option<UserId>) -> Result<(), ModerationError> {
        if !self.is_host(requester) {
            return Err(ModerationError::NotHost);
        }
        if target == Some(requester) {
            return Err(ModerationError::SelfTarget);
        }
        Ok(())
    }

    fn connection_of(&self, user_id: UserId) -> Option<ConnectionId> {
        self.find_by_user(user_id).map(|p| p.connection_id.clone())
    }

    /// ホストが対象ユーザーをミュートする
    pub fn host_mute(
        &mut self,
        requester: UserId,
        target: UserId,
    ) -> Result<HostMuteOutcome, ModerationError> {
        self.authorize(requester, Some(target))?;
        let Some(connection_id) = self.connection_of(target) else {
            return Ok(HostMuteOutcome::TargetNotFound);
        };
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return Ok(HostMuteOutcome::TargetNotFound);
        };
        if participant.is_host_muted() {
            return Ok(HostMuteOutcome::Unchanged);
        }
        participant.mute_by_host();
        Ok(HostMuteOutcome::Applied(participant.clone()))
    }

    /// ホストによるミュートを解除する。本人のミュート状態は維持される。
    pub fn host_unmute(
        &mut self,
        requester: UserId,
        target: UserId,
    ) -> Result<HostMuteOutcome, ModerationError> {
        self.authorize(requester, Some(target))?;
        let Some(connection_id) = self.connection_of(target) else {
            return Ok(HostMuteOutcome::TargetNotFound);
        };
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return Ok(HostMuteOutcome::TargetNotFound);
        };
        if !participant.is_host_muted() {
            return Ok(HostMuteOutcome::Unchanged);
        }
        participant.mute = MuteState::SelfMuted;
        Ok(HostMuteOutcome::Applied(participant.clone()))
    }

    /// ホスト以外の全員をホストミュートする
    ///
    /// # Returns
    ///
    /// 対象になった参加者（更新後）
    pub fn host_mute_all(&mut self, requester: UserId) -> Result<Vec<Participant>, ModerationError> {
        self.authorize(requester, None)?;
        let host = self.host_user_id;
        let mut muted: Vec<Participant> = self
            .participants
            .values_mut()
            .filter(|p| Some(p.user_id) != host)
            .map(|p| {
                p.mute_by_host();
                p.clone()
            })
            .collect();
        muted.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(muted)
    }

    /// キック対象の接続を特定する（削除はしない）
    pub fn kick_target(
        &self,
        requester: UserId,
        target: UserId,
    ) -> Result<Option<ConnectionId>, ModerationError> {
        self.authorize(requester, Some(target))?;
        Ok(self.connection_of(target))
    }
}
