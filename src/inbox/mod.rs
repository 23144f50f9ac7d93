//! Inbox coordination: wires the generator, the store, and the broadcast
//! engine into the two operations the outside world calls.

use std::sync::Arc;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::generator::{self, AddressKind};
use crate::storage::{AddressRow, MessageRow, NewMessage, Storage, StoreError};

pub struct InboxService {
    storage: Arc<Storage>,
    broadcaster: Arc<Broadcaster>,
}

impl InboxService {
    pub fn new(storage: Arc<Storage>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            storage,
            broadcaster,
        }
    }

    /// Generate a fresh address of the given kind and persist it.
    ///
    /// The generator performs no uniqueness check; a collision lands on the
    /// store's return-existing upsert, so the caller still gets a usable
    /// record.
    pub async fn generate_address(&self, kind: AddressKind) -> Result<AddressRow, StoreError> {
        let value = generator::generate_address(kind);
        let record = self.storage.create_address(&value).await?;
        info!(address = %record.address, ?kind, "address generated");
        Ok(record)
    }

    /// Fabricate one inbound verification message for `address`, persist it,
    /// and fan it out to subscribed connections.
    ///
    /// The address is created lazily when this is the first reference to it.
    /// The stored message carries the exact code embedded in its body.
    pub async fn simulate_reception(
        &self,
        address: &str,
        kind: AddressKind,
    ) -> Result<MessageRow, StoreError> {
        let record = match self.storage.get_address_by_value(address).await? {
            Some(existing) => existing,
            None => {
                debug!(address = %address, "first reference — creating address");
                self.storage.create_address(address).await?
            }
        };

        let synth = generator::synthesize(kind);
        let stored = self
            .storage
            .append_message(
                record.id,
                NewMessage {
                    sender: synth.sender,
                    sender_name: synth.sender_name,
                    subject: synth.subject,
                    content: synth.body,
                    otp_code: Some(synth.code),
                },
            )
            .await?;

        debug!(
            address = %address,
            message_id = stored.id,
            ?kind,
            "simulated reception stored"
        );
        self.broadcaster.message_stored(address, &stored).await;
        Ok(stored)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::extract_code;
    use crate::registry::SubscriptionRegistry;
    use tempfile::TempDir;

    async fn test_service() -> (InboxService, Arc<Storage>, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let storage = Arc::new(Storage::new(dir.path()).await.expect("storage"));
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry));
        let service = InboxService::new(storage.clone(), broadcaster);
        (service, storage, dir)
    }

    #[tokio::test]
    async fn generate_address_persists_the_record() {
        let (service, storage, _dir) = test_service().await;
        let record = service.generate_address(AddressKind::Standard).await.unwrap();
        let found = storage
            .get_address_by_value(&record.address)
            .await
            .unwrap()
            .expect("persisted");
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn simulate_creates_the_address_lazily() {
        let (service, storage, _dir) = test_service().await;
        let msg = service
            .simulate_reception("fresh@example.com", AddressKind::Standard)
            .await
            .unwrap();

        let addr = storage
            .get_address_by_value("fresh@example.com")
            .await
            .unwrap()
            .expect("created on first reference");
        assert_eq!(msg.address_id, addr.id);
    }

    #[tokio::test]
    async fn two_simulations_leave_two_unread_messages_with_codes() {
        let (service, storage, _dir) = test_service().await;
        let record = service.generate_address(AddressKind::Standard).await.unwrap();
        service
            .simulate_reception(&record.address, AddressKind::Standard)
            .await
            .unwrap();
        service
            .simulate_reception(&record.address, AddressKind::Standard)
            .await
            .unwrap();

        let messages = storage.list_messages(record.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        for msg in &messages {
            assert!(!msg.is_read);
            assert!(msg.otp_code.is_some());
        }
    }

    #[tokio::test]
    async fn stored_code_matches_the_body() {
        let (service, _storage, _dir) = test_service().await;
        let msg = service
            .simulate_reception("codes@example.com", AddressKind::Standard)
            .await
            .unwrap();
        let code = msg.otp_code.expect("standard messages always carry a code");
        assert!(msg.content.contains(&code));
        assert_eq!(extract_code(&msg.content).as_deref(), Some(code.as_str()));
    }

    #[tokio::test]
    async fn federated_simulation_uses_sso_identities() {
        let (service, _storage, _dir) = test_service().await;
        let msg = service
            .simulate_reception("sso@example.com", AddressKind::Federated)
            .await
            .unwrap();
        assert_eq!(msg.subject, "SSO Verification Code");
        assert!(msg.sender.starts_with("verification@"));
    }
}
