//! The end user's identity, carried only in a signed+encrypted cookie and
//! never persisted server-side (spec §3/§4.2).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use waitingroom_crypto::{CookieCodec, InvalidCookie};

/// Name of the cookie the gateway reads and writes.
pub const COOKIE_NAME: &str = "waiting-room";

/// A client's queue identity and position.
///
/// `serial_number == 0` means "not yet enrolled with a number". Once
/// non-zero it is immutable for the cookie's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub serial_number: i64,
    #[serde(default)]
    pub take_serial_number_time: i64,
    pub domain: String,
}

impl Client {
    /// A fresh, unenrolled client for `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            serial_number: 0,
            take_serial_number_time: 0,
            domain: domain.into(),
        }
    }

    /// `true` iff this client has an identity, has not yet claimed a serial
    /// number, and its entry delay has elapsed.
    #[must_use]
    pub fn can_take_serial_number(&self, now: i64) -> bool {
        !self.id.is_empty()
            && self.serial_number == 0
            && self.take_serial_number_time > 0
            && self.take_serial_number_time <= now
    }

    /// Enroll this client: assign a fresh random ID and schedule the
    /// earliest time it may claim a serial number.
    pub fn enroll(&mut self, now: i64, entry_delay_secs: i64) {
        self.id = Uuid::new_v4().to_string();
        self.take_serial_number_time = now + entry_delay_secs;
    }
}

/// Errors from decoding a cookie into a [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// No cookie was presented at all. Not the same as `InvalidCookie`: the
    /// caller should enroll a fresh client rather than clear a cookie header.
    #[error("missing cookie")]
    MissingCookie,
    /// The cookie failed to decode, decrypt, or verify, or did not contain a
    /// valid `Client` record. Every such failure mode collapses to this one
    /// variant so a forged cookie gives no oracle to refine against.
    #[error("invalid cookie")]
    InvalidCookie,
}

impl From<InvalidCookie> for ClientError {
    fn from(_: InvalidCookie) -> Self {
        Self::InvalidCookie
    }
}

/// Encodes and decodes [`Client`] records as cookie values, using a
/// [`CookieCodec`] to authenticate and encrypt the serialized record.
#[derive(Clone)]
pub struct ClientCodec {
    cookie: CookieCodec,
}

impl ClientCodec {
    #[must_use]
    pub fn new(cookie: CookieCodec) -> Self {
        Self { cookie }
    }

    /// Decode a cookie header value into a `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingCookie`] if `cookie_value` is `None`, or
    /// [`ClientError::InvalidCookie`] if it fails to open or deserialize.
    pub fn decode(&self, cookie_value: Option<&str>) -> Result<Client, ClientError> {
        let raw = cookie_value.ok_or(ClientError::MissingCookie)?;
        let payload = self.cookie.open(raw)?;
        serde_json::from_slice(&payload).map_err(|_| ClientError::InvalidCookie)
    }

    /// Encode a `Client` as a cookie value.
    #[must_use]
    pub fn encode(&self, client: &Client) -> String {
        let payload = serde_json::to_vec(client).expect("Client always serializes");
        self.cookie.seal(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ClientCodec {
        ClientCodec::new(CookieCodec::new([0x11; 64], [0x22; 32]))
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let codec = codec();
        let mut client = Client::new("shop.example");
        client.enroll(1_000, 10);
        client.serial_number = 7;

        let sealed = codec.encode(&client);
        let decoded = codec.decode(Some(&sealed)).unwrap();
        assert_eq!(decoded, client);
    }

    #[test]
    fn missing_cookie_is_distinct_from_invalid() {
        let codec = codec();
        assert!(matches!(
            codec.decode(None),
            Err(ClientError::MissingCookie)
        ));
        assert!(matches!(
            codec.decode(Some("garbage")),
            Err(ClientError::InvalidCookie)
        ));
    }

    #[test]
    fn can_take_serial_number_requires_id_and_elapsed_delay() {
        let mut client = Client::new("shop.example");
        assert!(!client.can_take_serial_number(100));

        client.enroll(100, 10);
        assert!(!client.can_take_serial_number(109));
        assert!(client.can_take_serial_number(110));
        assert!(client.can_take_serial_number(200));

        client.serial_number = 1;
        assert!(!client.can_take_serial_number(200));
    }
}
