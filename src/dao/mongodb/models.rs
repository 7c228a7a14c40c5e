use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GameRecord, GameStatus, InningScoreEntity, SessionEntity, SessionStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    game_id: bson::Uuid,
    account_id: bson::Uuid,
    status: SessionStatus,
    current_inning: u32,
    started_by: bson::Uuid,
    started_at: DateTime,
    #[serde(default)]
    ended_at: Option<DateTime>,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: to_bson_uuid(value.id),
            game_id: to_bson_uuid(value.game_id),
            account_id: to_bson_uuid(value.account_id),
            status: value.status,
            current_inning: value.current_inning,
            started_by: to_bson_uuid(value.started_by),
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            game_id: from_bson_uuid(value.game_id),
            account_id: from_bson_uuid(value.account_id),
            status: value.status,
            current_inning: value.current_inning,
            started_by: from_bson_uuid(value.started_by),
            started_at: value.started_at.to_system_time(),
            ended_at: value.ended_at.map(|at| at.to_system_time()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoInningDocument {
    session_id: bson::Uuid,
    inning_number: u32,
    is_home_team: bool,
    runs: u32,
    entered_by: bson::Uuid,
    entered_at: DateTime,
}

impl MongoInningDocument {
    /// Filter matching the unique (session, inning, side) key of this row.
    pub fn key_filter(&self) -> Document {
        doc! {
            "session_id": self.session_id,
            "inning_number": i64::from(self.inning_number),
            "is_home_team": self.is_home_team,
        }
    }
}

impl From<InningScoreEntity> for MongoInningDocument {
    fn from(value: InningScoreEntity) -> Self {
        Self {
            session_id: to_bson_uuid(value.session_id),
            inning_number: value.inning_number,
            is_home_team: value.is_home_team,
            runs: value.runs,
            entered_by: to_bson_uuid(value.entered_by),
            entered_at: DateTime::from_system_time(value.entered_at),
        }
    }
}

impl From<MongoInningDocument> for InningScoreEntity {
    fn from(value: MongoInningDocument) -> Self {
        Self {
            session_id: from_bson_uuid(value.session_id),
            inning_number: value.inning_number,
            is_home_team: value.is_home_team,
            runs: value.runs,
            entered_by: from_bson_uuid(value.entered_by),
            entered_at: value.entered_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    account_id: bson::Uuid,
    home_team_id: bson::Uuid,
    visitor_team_id: bson::Uuid,
    home_team_name: String,
    visitor_team_name: String,
    status: GameStatus,
    #[serde(default)]
    home_score: Option<u32>,
    #[serde(default)]
    visitor_score: Option<u32>,
}

impl From<MongoGameDocument> for GameRecord {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            account_id: from_bson_uuid(value.account_id),
            home_team_id: from_bson_uuid(value.home_team_id),
            visitor_team_id: from_bson_uuid(value.visitor_team_id),
            home_team_name: value.home_team_name,
            visitor_team_name: value.visitor_team_name,
            status: value.status,
            home_score: value.home_score,
            visitor_score: value.visitor_score,
        }
    }
}

pub fn to_bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": to_bson_uuid(id)}
}
