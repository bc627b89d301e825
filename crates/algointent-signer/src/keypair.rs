//! Ed25519 keypair delegate.

use algointent_core::plan::TX_PREFIX;
use algointent_core::{encode_signed, Address, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use tracing::debug;

use crate::delegate::{SignRequest, SignResponse, SigningDelegate};

/// Signs the positions whose signer is its own address.
pub struct KeypairDelegate {
    signing_key: SigningKey,
    address: Address,
}

impl KeypairDelegate {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = Address::from_public_key(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Fresh random keypair.
    pub fn generate() -> Self {
        Self::from_seed(rand::random())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn sign_one(&self, unsigned: &[u8]) -> Result<Vec<u8>> {
        let mut message = Vec::with_capacity(TX_PREFIX.len() + unsigned.len());
        message.extend_from_slice(TX_PREFIX);
        message.extend_from_slice(unsigned);
        let signature = self.signing_key.sign(&message);
        encode_signed(unsigned, &signature.to_bytes())
    }
}

#[async_trait]
impl SigningDelegate for KeypairDelegate {
    async fn sign(&self, requests: &[SignRequest]) -> Result<Vec<SignResponse>> {
        requests
            .iter()
            .map(|request| {
                if !request.requires_signature || request.signer != self.address {
                    return Ok(SignResponse::NotMine);
                }
                debug!("Signing position {} ({})", request.position, request.txid);
                Ok(SignResponse::signed(self.sign_one(&request.unsigned)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::requests_for;
    use crate::delegate::tests::{payment, plan_of};
    use algointent_core::SignedTransaction;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    /// Check an ed25519 signature over `TX` ‖ `unsigned` for `address`.
    fn verify(address: &Address, unsigned: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(address.public_key()) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let mut message = TX_PREFIX.to_vec();
        message.extend_from_slice(unsigned);
        key.verify(&message, &Signature::from_bytes(&bytes)).is_ok()
    }

    #[tokio::test]
    async fn test_signs_only_own_positions() {
        let delegate = KeypairDelegate::from_seed([42; 32]);
        let own = *delegate.address().public_key();
        let plan = plan_of(vec![payment(own, 2), payment([5; 32], 3)]);

        let responses = delegate.sign(&requests_for(&plan).unwrap()).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1], SignResponse::NotMine);

        let SignResponse::Signed { blob } = &responses[0] else {
            panic!("expected a signature, got {:?}", responses[0]);
        };
        let signed = SignedTransaction::from_bytes(0, blob.clone()).unwrap();
        assert_eq!(signed.txid, plan.transaction_ids().unwrap()[0]);
        assert!(verify(
            &delegate.address(),
            &plan.descriptors()[0].encode().unwrap(),
            &signed.signature
        ));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let a = KeypairDelegate::from_seed([1; 32]);
        let b = KeypairDelegate::from_seed([2; 32]);
        let signed = a.sign_one(b"payload").unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&signed).unwrap();
        let sig = algointent_core::encoding::decode_base64(decoded["sig"].as_str().unwrap()).unwrap();
        assert!(verify(&a.address(), b"payload", &sig));
        assert!(!verify(&b.address(), b"payload", &sig));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(
            KeypairDelegate::generate().address(),
            KeypairDelegate::generate().address()
        );
    }
}
