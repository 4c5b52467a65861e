//! Web Push protocol transport (RFC 8030) with message encryption (RFC 8291)
//! and VAPID authentication (RFC 8292).
//!
//! The `web-push` crate builds and encrypts the message; the HTTP request is
//! sent with the process-wide [`reqwest::Client`].

use std::time::Duration;

use async_trait::async_trait;
use web_push::{
    ContentEncoding, SubscriptionInfo, Urgency, VapidSignatureBuilder, WebPushMessageBuilder,
};

use super::push::{PushError, PushTarget, PushTransport, PUSH_TTL_SECS};
use super::vapid::VapidKeys;

/// Sends encrypted, VAPID-signed push messages over HTTP.
pub struct WebPushTransport {
    client: reqwest::Client,
    keys: VapidKeys,
}

impl WebPushTransport {
    /// Create a transport whose requests are bounded by `timeout`.
    pub fn new(keys: VapidKeys, timeout: Duration) -> Result<Self, PushError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, keys })
    }

    pub fn keys(&self) -> &VapidKeys {
        &self.keys
    }

    /// Encrypt and sign a message for one subscription.
    ///
    /// Returns the endpoint, the protocol headers and the body.
    fn build_message(
        &self,
        target: &PushTarget,
        payload: Option<&[u8]>,
    ) -> Result<(String, Vec<(String, Vec<u8>)>, Vec<u8>), PushError> {
        let info = SubscriptionInfo::new(
            target.endpoint.as_str(),
            target.p256dh.as_str(),
            target.auth.as_str(),
        );

        let mut signer =
            VapidSignatureBuilder::from_pem(self.keys.private_key_pem.as_bytes(), &info)
                .map_err(|e| PushError::NotConfigured(format!("invalid VAPID private key: {e}")))?;
        signer.add_claim("sub", self.keys.subject.as_str());
        let signature = signer
            .build()
            .map_err(|e| PushError::Message(format!("VAPID signature: {e}")))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        if let Some(content) = payload {
            builder.set_payload(ContentEncoding::Aes128Gcm, content);
        }
        builder.set_ttl(PUSH_TTL_SECS);
        builder.set_urgency(Urgency::High);
        builder.set_vapid_signature(signature);

        let message = builder
            .build()
            .map_err(|e| PushError::Message(e.to_string()))?;

        let request = web_push::request_builder::build_request::<Vec<u8>>(message);
        let (parts, body) = request.into_parts();
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        Ok((parts.uri.to_string(), headers, body))
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, target: &PushTarget, payload: Option<&[u8]>) -> Result<u16, PushError> {
        let (endpoint, headers, body) = self.build_message(target, payload)?;

        let mut request = self.client.post(endpoint);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;
        Ok(response.status().as_u16())
    }
}
