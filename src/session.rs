//! Fabricated device identity for an API session.
//!
//! The backend correlates identity continuity within a session, so a
//! [`SessionIdentity`] is generated once per client and reused for every
//! request. Values only need to be unique, not unpredictable.

use rand::Rng;
use serde::Serialize;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const HEX: &[u8] = b"0123456789abcdef";

/// Device attributes sent with every request of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    device_id: String,
    device_info: String,
    pseudo_id: String,
}

impl SessionIdentity {
    /// Generates a new identity from the fixed templates.
    ///
    /// - device id: `AA9A.999999.999` (build-id shape)
    /// - device info: `AA-A9999` (handset model shape)
    /// - pseudo id: 16 lowercase hex characters
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let device_id = format!(
            "{}{}{}.{}.{}",
            pick(&mut rng, UPPER, 2),
            pick(&mut rng, DIGITS, 1),
            pick(&mut rng, UPPER, 1),
            pick(&mut rng, DIGITS, 6),
            pick(&mut rng, DIGITS, 3),
        );
        let device_info = format!(
            "{}-{}{}",
            pick(&mut rng, UPPER, 2),
            pick(&mut rng, UPPER, 1),
            pick(&mut rng, DIGITS, 4),
        );
        let pseudo_id = pick(&mut rng, HEX, 16);

        Self {
            device_id,
            device_info,
            pseudo_id,
        }
    }

    /// Builds an identity from known values (restored or test sessions).
    #[must_use]
    pub fn from_parts(
        device_id: impl Into<String>,
        device_info: impl Into<String>,
        pseudo_id: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_info: device_info.into(),
            pseudo_id: pseudo_id.into(),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn device_info(&self) -> &str {
        &self.device_info
    }

    #[must_use]
    pub fn pseudo_id(&self) -> &str {
        &self.pseudo_id
    }
}

fn pick(rng: &mut impl Rng, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}
