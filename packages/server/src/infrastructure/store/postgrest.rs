//! PostgREST Room Store 実装
//!
//! Supabase が公開する PostgREST API（`/rest/v1/<table>`）を `reqwest` で呼び出す。
//!
//! 前提とするスキーマ:
//!
//! ```text
//! rooms    (id text primary key, created_at timestamptz, last_activity timestamptz)
//! messages (id bigint primary key, room_id text references rooms(id),
//!           username text, content text, timestamp timestamptz)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::{
    ChatMessage, DisplayName, MessageContent, MessageId, NewMessage, RoomId, RoomRecord,
    RoomStore, StoreError, Timestamp,
};

const ROOMS_TABLE: &str = "rooms";
const MESSAGES_TABLE: &str = "messages";

#[derive(Debug, Deserialize)]
struct RoomRow {
    id: String,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RoomIdRow {
    id: String,
}

#[derive(Debug, Serialize)]
struct InsertRoomRow<'a> {
    id: &'a str,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct TouchRoomRow {
    last_activity: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MessageRow {
    id: serde_json::Value,
    username: String,
    content: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct InsertMessageRow<'a> {
    room_id: &'a str,
    username: &'a str,
    content: &'a str,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RoomRow> for RoomRecord {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: decode_room_id(row.id)?,
            created_at: Timestamp::new(row.created_at.timestamp_millis()),
            last_activity: Timestamp::new(row.last_activity.timestamp_millis()),
        })
    }
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let id = match row.id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => return Err(StoreError::Decode(format!("unexpected message id {other}"))),
        };
        Ok(Self {
            id: Some(MessageId::new(id)),
            author: DisplayName::new(row.username),
            content: MessageContent::new(&row.content)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            timestamp: Timestamp::new(row.timestamp.timestamp_millis()),
        })
    }
}

fn decode_room_id(id: String) -> Result<RoomId, StoreError> {
    RoomId::new(id).map_err(|e| StoreError::Decode(e.to_string()))
}

fn to_datetime(timestamp: Timestamp) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(timestamp.value())
        .single()
        .ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {}", timestamp.value())))
}

/// PostgREST を使った RoomStore 実装
pub struct PostgrestRoomStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestRoomStore {
    /// Build a store for `base_url` (e.g. `https://xyz.supabase.co`).
    ///
    /// `timeout` bounds every HTTP request.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, StoreError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RoomStore for PostgrestRoomStore {
    async fn room_exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        let rows: Vec<RoomIdRow> = Self::send_json(
            self.request(Method::GET, ROOMS_TABLE)
                .query(&[("select", "id".to_string()), ("id", format!("eq.{}", room_id))]),
        )
        .await?;
        Ok(!rows.is_empty())
    }

    async fn insert_room(
        &self,
        room_id: &RoomId,
        now: Timestamp,
    ) -> Result<RoomRecord, StoreError> {
        let now = to_datetime(now)?;
        let rows: Vec<RoomRow> = Self::send_json(
            self.request(Method::POST, ROOMS_TABLE)
                .header("Prefer", "return=representation")
                .json(&[InsertRoomRow {
                    id: room_id.as_str(),
                    created_at: now,
                    last_activity: now,
                }]),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))?
            .try_into()
    }

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
        let rows: Vec<RoomRow> = Self::send_json(self.request(Method::GET, ROOMS_TABLE).query(&[
            ("select", "id,created_at,last_activity".to_string()),
            ("id", format!("eq.{}", room_id)),
        ]))
        .await?;
        rows.into_iter().next().map(RoomRecord::try_from).transpose()
    }

    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, StoreError> {
        let rows: Vec<RoomRow> = Self::send_json(self.request(Method::GET, ROOMS_TABLE).query(&[
            ("select", "id,created_at,last_activity"),
            ("order", "created_at.asc"),
        ]))
        .await?;
        rows.into_iter().map(RoomRecord::try_from).collect()
    }

    async fn touch_room(&self, room_id: &RoomId, at: Timestamp) -> Result<(), StoreError> {
        Self::send(
            self.request(Method::PATCH, ROOMS_TABLE)
                .query(&[("id", format!("eq.{}", room_id))])
                .json(&TouchRoomRow {
                    last_activity: to_datetime(at)?,
                }),
        )
        .await?;
        Ok(())
    }

    async fn list_inactive_rooms(&self, before: Timestamp) -> Result<Vec<RoomId>, StoreError> {
        let before = to_datetime(before)?.to_rfc3339();
        let rows: Vec<RoomIdRow> = Self::send_json(self.request(Method::GET, ROOMS_TABLE).query(&[
            ("select", "id".to_string()),
            ("last_activity", format!("lt.{}", before)),
        ]))
        .await?;
        rows.into_iter().map(|row| decode_room_id(row.id)).collect()
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        Self::send(
            self.request(Method::DELETE, ROOMS_TABLE)
                .query(&[("id", format!("eq.{}", room_id))]),
        )
        .await?;
        Ok(())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage, StoreError> {
        let rows: Vec<MessageRow> = Self::send_json(
            self.request(Method::POST, MESSAGES_TABLE)
                .header("Prefer", "return=representation")
                .json(&[InsertMessageRow {
                    room_id: message.room_id.as_str(),
                    username: message.author.as_str(),
                    content: message.content.as_str(),
                    timestamp: to_datetime(message.timestamp)?,
                }]),
        )
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))?
            .try_into()
    }

    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows: Vec<MessageRow> =
            Self::send_json(self.request(Method::GET, MESSAGES_TABLE).query(&[
                ("select", "id,username,content,timestamp".to_string()),
                ("room_id", format!("eq.{}", room_id)),
                ("order", "timestamp.desc".to_string()),
                ("limit", limit.to_string()),
            ]))
            .await?;
        let mut messages = rows
            .into_iter()
            .map(ChatMessage::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn delete_messages(&self, room_id: &RoomId) -> Result<(), StoreError> {
        Self::send(
            self.request(Method::DELETE, MESSAGES_TABLE)
                .query(&[("room_id", format!("eq.{}", room_id))]),
        )
        .await?;
        Ok(())
    }
}
