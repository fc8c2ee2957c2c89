//! Service-to-service request signing
//!
//! A token is `{data},{signature}` where the signature is the url-safe base64
//! HMAC-SHA256 of `data` under the shared RPC secret.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::prelude::*;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct RpcSigner {
	key: Box<[u8]>,
}

impl std::fmt::Debug for RpcSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RpcSigner").finish_non_exhaustive()
	}
}

impl RpcSigner {
	pub fn new(secret: &str) -> Self {
		Self { key: secret.as_bytes().into() }
	}

	fn mac(&self) -> ClResult<HmacSha256> {
		HmacSha256::new_from_slice(&self.key)
			.map_err(|e| Error::Internal(format!("invalid hmac key: {}", e)))
	}

	pub fn sign(&self, data: &str) -> ClResult<String> {
		let mut mac = self.mac()?;
		mac.update(data.as_bytes());
		let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
		Ok(format!("{},{}", data, sig))
	}

	/// Check a token and return the data it signs
	pub fn verify<'a>(&self, token: &'a str) -> ClResult<&'a str> {
		let (data, sig) = token.rsplit_once(',').ok_or(Error::Unauthorized)?;
		let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| Error::Unauthorized)?;
		let mut mac = self.mac()?;
		mac.update(data.as_bytes());
		mac.verify_slice(&sig).map_err(|_| Error::Unauthorized)?;
		Ok(data)
	}

	/// Check that `token` is a valid signature of exactly `expected`
	pub fn verify_for(&self, token: &str, expected: &str) -> ClResult<()> {
		if self.verify(token)? == expected { Ok(()) } else { Err(Error::Unauthorized) }
	}
}


// vim: ts=4
