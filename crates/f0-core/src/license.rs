//! Claves de licencia firmadas con HMAC-SHA256.
//!
//! La clave se entrega una vez (alta o join) y es la credencial de login por
//! email. No se persiste: el store sólo guarda sesiones, la validez de una
//! clave se comprueba contra la firma y su fecha de vencimiento.
//!
//! Formato: `IK-` + base64url (sin padding) de `{"email","expires","sig"}`,
//! donde `sig` es el HMAC de `"<email>|<expires>"` también en base64url.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::{LICENSE_KEY_PREFIX, SESSION_TTL_DAYS};
use crate::errors::LedgerError;

type HmacSha256 = Hmac<Sha256>;

/// Secreto de desarrollo; en producción se reemplaza vía configuración.
pub const DEV_LICENSE_SECRET: &str = "fortune0-dev-secret";

#[derive(Serialize, Deserialize)]
struct SignedLicense {
    email: String,
    expires: NaiveDate,
    sig: String,
}

#[derive(Clone)]
pub struct LicenseSigner {
    secret: Vec<u8>,
}

impl Default for LicenseSigner {
    fn default() -> Self {
        Self::new(DEV_LICENSE_SECRET)
    }
}

impl LicenseSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: secret.as_ref().to_vec() }
    }

    fn mac(&self, email: &str, expires: NaiveDate) -> Result<HmacSha256, LedgerError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| {
                                                                  LedgerError::Storage(format!("license signer: {e}"))
                                                              })?;
        mac.update(format!("{email}|{expires}").as_bytes());
        Ok(mac)
    }

    /// Emite una clave para `email` (ya normalizado), vigente 28 días.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<String, LedgerError> {
        let expires = (now + Duration::days(SESSION_TTL_DAYS)).date_naive();
        let tag = self.mac(email, expires)?.finalize().into_bytes();
        let signed = SignedLicense { email: email.to_string(),
                                     expires,
                                     sig: URL_SAFE_NO_PAD.encode(tag) };
        let body = serde_json::to_vec(&signed).map_err(|e| LedgerError::Storage(format!("license encode: {e}")))?;
        Ok(format!("{LICENSE_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(body)))
    }

    /// Verifica firma, dueño y vencimiento. Vence al comenzar (UTC) el día
    /// `expires`.
    pub fn verify(&self, key: &str, email: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let invalid = |_| LedgerError::InvalidLicenseKey;
        let encoded = key.trim().strip_prefix(LICENSE_KEY_PREFIX).ok_or(LedgerError::InvalidLicenseKey)?;
        let body = URL_SAFE_NO_PAD.decode(encoded).map_err(invalid)?;
        let signed: SignedLicense =
            serde_json::from_slice(&body).map_err(|_| LedgerError::InvalidLicenseKey)?;
        let sig = URL_SAFE_NO_PAD.decode(&signed.sig).map_err(invalid)?;
        self.mac(&signed.email, signed.expires)?
            .verify_slice(&sig)
            .map_err(|_| LedgerError::InvalidLicenseKey)?;
        if signed.email != email || now.date_naive() >= signed.expires {
            return Err(LedgerError::InvalidLicenseKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_keys_verify_for_their_owner_only() {
        let signer = LicenseSigner::new("s3cret");
        let now = Utc::now();
        let key = signer.issue("ana@example.com", now).unwrap();
        assert!(key.starts_with("IK-"));
        assert_eq!(signer.verify(&key, "ana@example.com", now), Ok(()));
        assert_eq!(signer.verify(&key, "bob@example.com", now), Err(LedgerError::InvalidLicenseKey));
        assert_eq!(LicenseSigner::new("other").verify(&key, "ana@example.com", now),
                   Err(LedgerError::InvalidLicenseKey));
    }

    #[test]
    fn keys_expire_and_garbage_is_rejected() {
        let signer = LicenseSigner::default();
        let now = Utc::now();
        let key = signer.issue("ana@example.com", now).unwrap();
        assert_eq!(signer.verify(&key, "ana@example.com", now + Duration::days(29)),
                   Err(LedgerError::InvalidLicenseKey));
        for bad in ["", "IK-", "IK-!!!", "nope", "IK-eyJ9"] {
            assert_eq!(signer.verify(bad, "ana@example.com", now), Err(LedgerError::InvalidLicenseKey), "{bad}");
        }
    }
}
