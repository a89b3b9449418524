//! Room Provisioning
//!
//! Interviews take place in LiveKit rooms. The service creates a room when an
//! interview is scheduled and signs short-lived join tokens for participants.

use crate::config::LiveKitConfig;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lifetime of a participant join token.
pub const TOKEN_TTL_SECS: u64 = 7200;
/// How long an interview room stays open without participants.
pub const INTERVIEW_ROOM_EMPTY_TIMEOUT_SECS: u32 = 1800;
const ADMIN_TOKEN_TTL_SECS: u64 = 600;
const MAX_PARTICIPANTS: u32 = 10;

/// Issues rooms and join credentials for interviews.
#[async_trait]
pub trait RoomProvisioner: Send + Sync {
    /// Signs a join token. A random identity is generated when none is given.
    fn join_token(
        &self,
        room_name: &str,
        participant_name: &str,
        identity: Option<&str>,
    ) -> Result<String>;

    /// Creates a room that closes after `empty_timeout` idle seconds.
    async fn create_room(&self, room_name: &str, empty_timeout: u32) -> Result<()>;

    /// The URL clients connect to.
    fn server_url(&self) -> &str;
}

/// Permissions granted by a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_join: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_create: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_publish: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_subscribe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_update_own_metadata: Option<bool>,
}

impl VideoGrant {
    /// Full participant permissions for one room.
    pub fn participant(room: &str) -> Self {
        Self {
            room: Some(room.to_string()),
            room_join: Some(true),
            can_publish: Some(true),
            can_subscribe: Some(true),
            can_publish_data: Some(true),
            can_update_own_metadata: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub nbf: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub video: VideoGrant,
}

#[derive(Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
    empty_timeout: u32,
    max_participants: u32,
}

/// [`RoomProvisioner`] backed by a LiveKit server.
pub struct LiveKitRooms {
    config: LiveKitConfig,
    http: reqwest::Client,
}

impl LiveKitRooms {
    pub fn new(config: LiveKitConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn sign(&self, claims: &AccessClaims) -> Result<String> {
        let key = EncodingKey::from_secret(self.config.api_secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).context("Failed to sign room token")
    }

    fn claims(
        &self,
        identity: String,
        name: Option<String>,
        video: VideoGrant,
        ttl: u64,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessClaims> {
        let now = u64::try_from(issued_at.timestamp())
            .context("Token issue time is before the Unix epoch")?;
        Ok(AccessClaims {
            iss: self.config.api_key.clone(),
            sub: identity,
            iat: now,
            exp: now + ttl,
            nbf: now,
            name,
            video,
        })
    }

    /// HTTP base of the server API, derived from the client URL.
    fn api_base(&self) -> String {
        let url = self.config.url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            url.to_string()
        }
    }
}

fn random_identity() -> String {
    format!("participant_{:08x}", rand::random::<u32>())
}

#[async_trait]
impl RoomProvisioner for LiveKitRooms {
    fn join_token(
        &self,
        room_name: &str,
        participant_name: &str,
        identity: Option<&str>,
    ) -> Result<String> {
        let identity = identity.map(str::to_string).unwrap_or_else(random_identity);
        let claims = self.claims(
            identity,
            Some(participant_name.to_string()),
            VideoGrant::participant(room_name),
            TOKEN_TTL_SECS,
            Utc::now(),
        )?;
        self.sign(&claims)
    }

    async fn create_room(&self, room_name: &str, empty_timeout: u32) -> Result<()> {
        let admin = self.claims(
            self.config.api_key.clone(),
            None,
            VideoGrant {
                room_create: Some(true),
                ..Default::default()
            },
            ADMIN_TOKEN_TTL_SECS,
            Utc::now(),
        )?;
        let token = self.sign(&admin)?;

        let response = self
            .http
            .post(format!("{}/twirp/livekit.RoomService/CreateRoom", self.api_base()))
            .bearer_auth(token)
            .json(&CreateRoomRequest {
                name: room_name,
                empty_timeout,
                max_participants: MAX_PARTICIPANTS,
            })
            .send()
            .await
            .context("Failed to reach the room service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Room creation failed with status {status}: {body}");
        }
        info!(room_name, "Room created");
        Ok(())
    }

    fn server_url(&self) -> &str {
        &self.config.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn rooms(url: &str) -> LiveKitRooms {
        LiveKitRooms::new(LiveKitConfig {
            url: url.to_string(),
            api_key: "lk-key".to_string(),
            api_secret: "lk-secret-with-enough-length".to_string(),
        })
    }

    fn decode_claims(token: &str) -> AccessClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["lk-key"]);
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(b"lk-secret-with-enough-length"),
            &validation,
        )
        .unwrap()
        .claims
    }

    #[test]
    fn test_join_token_claims() {
        let rooms = rooms("wss://rooms.example.com");
        let token = rooms
            .join_token("interview-123", "Ada", Some("candidate-123"))
            .unwrap();
        let claims = decode_claims(&token);

        assert_eq!(claims.iss, "lk-key");
        assert_eq!(claims.sub, "candidate-123");
        assert_eq!(claims.name.as_deref(), Some("Ada"));
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.video, VideoGrant::participant("interview-123"));
    }

    #[test]
    fn test_join_token_generates_identity() {
        let rooms = rooms("wss://rooms.example.com");
        let claims = decode_claims(&rooms.join_token("room", "Guest", None).unwrap());
        let suffix = claims.sub.strip_prefix("participant_").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = rooms("wss://rooms.example.com")
            .join_token("room", "Guest", None)
            .unwrap();
        let result = decode::<AccessClaims>(
            &token,
            &DecodingKey::from_secret(b"some-other-secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_grant_serializes_camel_case_without_empty_fields() {
        let value = serde_json::to_value(VideoGrant::participant("r1")).unwrap();
        assert_eq!(value["roomJoin"], true);
        assert_eq!(value["canPublishData"], true);
        assert_eq!(value["canUpdateOwnMetadata"], true);
        assert!(value.get("roomCreate").is_none());
    }

    #[test]
    fn test_claims_are_stamped_from_issue_time() {
        let issued_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let claims = rooms("wss://rooms.example.com")
            .claims(
                "candidate-1".into(),
                None,
                VideoGrant::participant("r1"),
                TOKEN_TTL_SECS,
                issued_at,
            )
            .unwrap();
        assert_eq!(claims.iat, 1_717_243_200);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp, 1_717_243_200 + TOKEN_TTL_SECS);

        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap();
        assert!(
            rooms("wss://rooms.example.com")
                .claims("x".into(), None, VideoGrant::default(), 60, before_epoch)
                .is_err()
        );
    }

    #[test]
    fn test_api_base_from_client_url() {
        assert_eq!(rooms("wss://lk.example.com/").api_base(), "https://lk.example.com");
        assert_eq!(rooms("ws://localhost:7880").api_base(), "http://localhost:7880");
        assert_eq!(rooms("https://lk.example.com").api_base(), "https://lk.example.com");
    }
}
