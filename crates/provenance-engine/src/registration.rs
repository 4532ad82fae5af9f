//! The registration path: publish a signed manifest and record it on the
//! ledger.
//!
//! Every mutation pre-checks the ledger before uploading anything, then lets
//! the ledger enforce the rule again. Two racing writers both pass the
//! pre-check; the loser gets whatever the ledger reports.

use bytes::Bytes;
use provenance_core::{
    hash_bytes, Address, ContentHash, Manifest, ManifestBuilder, PlatformId, Signer, SigningError,
};
use provenance_ledger::{Ledger, LedgerError, TxReceipt};
use provenance_storage::ManifestFetcher;

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// A manifest published and recorded on the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub content_hash: ContentHash,
    pub manifest_uri: String,
    pub manifest: Manifest,
    pub creator: Address,
    pub transaction: TxReceipt,
}

impl<L, F> Engine<L, F>
where
    L: Ledger + 'static,
    F: ManifestFetcher + 'static,
{
    /// Register `content` for the signer.
    ///
    /// Hashes the content, uploads it when `upload_content` is set, signs
    /// the hash, uploads the manifest and calls `register`.
    pub async fn register(
        &self,
        signer: &dyn Signer,
        content: Bytes,
        name: &str,
    ) -> Result<Registered> {
        let content_hash = hash_bytes(&content);
        self.ensure_unregistered(&content_hash).await?;

        let content_uri = if self.config.upload_content {
            self.upload(name, content).await?
        } else {
            String::new()
        };
        self.publish_and_register(signer, content_hash, &content_uri)
            .await
    }

    /// Register a hash computed elsewhere, with an optional content URI.
    pub async fn register_hash(
        &self,
        signer: &dyn Signer,
        content_hash: &ContentHash,
        content_uri: &str,
    ) -> Result<Registered> {
        self.ensure_unregistered(content_hash).await?;
        self.publish_and_register(signer, *content_hash, content_uri)
            .await
    }

    /// Publish a new manifest for an existing entry and point the ledger at
    /// it. The registration timestamp does not change.
    pub async fn update_manifest(
        &self,
        signer: &dyn Signer,
        content_hash: &ContentHash,
        content_uri: &str,
    ) -> Result<Registered> {
        let creator = signer.address();
        self.ensure_creator(creator, content_hash).await?;

        let (manifest, manifest_uri) = self
            .publish_manifest(signer, content_hash, content_uri)
            .await?;
        let transaction = self
            .write(
                "updateManifest",
                self.ledger
                    .update_manifest(creator, content_hash, &manifest_uri),
            )
            .await;
        self.cache.invalidate_hash(content_hash);
        let transaction = transaction?;

        tracing::info!(
            content_hash = %content_hash,
            manifest_uri = %manifest_uri,
            tx = %transaction.tx_hash,
            "manifest updated"
        );
        Ok(Registered {
            content_hash: *content_hash,
            manifest_uri,
            manifest,
            creator,
            transaction,
        })
    }

    /// Clear the manifest URI of an entry. Creator and timestamp survive.
    pub async fn revoke(&self, caller: Address, content_hash: &ContentHash) -> Result<TxReceipt> {
        let transaction = self
            .write("revoke", self.ledger.revoke(caller, content_hash))
            .await;
        self.cache.invalidate_hash(content_hash);
        let transaction = transaction?;

        tracing::info!(content_hash = %content_hash, tx = %transaction.tx_hash, "content revoked");
        Ok(transaction)
    }

    /// Irreversibly bind `(platform, platform_id)` to an entry.
    pub async fn bind_platform(
        &self,
        caller: Address,
        content_hash: &ContentHash,
        platform: &str,
        platform_id: &str,
    ) -> Result<TxReceipt> {
        let id = PlatformId::new(platform, platform_id)?;
        let transaction = self
            .write(
                "bindPlatform",
                self.ledger
                    .bind_platform(caller, content_hash, &id.platform, &id.platform_id),
            )
            .await;
        self.cache.invalidate_platform(&id.platform, &id.platform_id);
        let transaction = transaction?;

        tracing::info!(
            content_hash = %content_hash,
            platform = %id,
            tx = %transaction.tx_hash,
            "platform bound"
        );
        Ok(transaction)
    }

    /// Parse `url` and bind the identifier it names.
    pub async fn bind_platform_url(
        &self,
        caller: Address,
        content_hash: &ContentHash,
        url: &str,
    ) -> Result<(PlatformId, TxReceipt)> {
        let id = self
            .parser
            .parse(url)
            .ok_or_else(|| EngineError::UnsupportedPlatform(url.to_string()))?;
        let transaction = self
            .bind_platform(caller, content_hash, &id.platform, &id.platform_id)
            .await?;
        Ok((id, transaction))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn ensure_unregistered(&self, content_hash: &ContentHash) -> Result<()> {
        if self.read_entry(content_hash).await?.exists() {
            return Err(LedgerError::AlreadyRegistered(*content_hash).into());
        }
        Ok(())
    }

    async fn ensure_creator(&self, caller: Address, content_hash: &ContentHash) -> Result<()> {
        let entry = self.read_entry(content_hash).await?;
        if !entry.exists() {
            return Err(LedgerError::NotFound(*content_hash).into());
        }
        if entry.creator != caller {
            return Err(LedgerError::AccessDenied {
                caller,
                content_hash: *content_hash,
            }
            .into());
        }
        Ok(())
    }

    async fn publish_and_register(
        &self,
        signer: &dyn Signer,
        content_hash: ContentHash,
        content_uri: &str,
    ) -> Result<Registered> {
        let creator = signer.address();
        let (manifest, manifest_uri) = self
            .publish_manifest(signer, &content_hash, content_uri)
            .await?;
        let transaction = self
            .write(
                "register",
                self.ledger.register(creator, &content_hash, &manifest_uri),
            )
            .await;
        self.cache.invalidate_hash(&content_hash);
        let transaction = transaction?;

        tracing::info!(
            content_hash = %content_hash,
            creator = %creator,
            manifest_uri = %manifest_uri,
            tx = %transaction.tx_hash,
            "content registered"
        );
        Ok(Registered {
            content_hash,
            manifest_uri,
            manifest,
            creator,
            transaction,
        })
    }

    /// Sign the hash, build the manifest and upload it.
    async fn publish_manifest(
        &self,
        signer: &dyn Signer,
        content_hash: &ContentHash,
        content_uri: &str,
    ) -> Result<(Manifest, String)> {
        let creator = signer.address();
        let signature = signer.sign_hash(content_hash).await?;
        if signature.recover(content_hash)? != creator {
            return Err(SigningError::Failed(format!(
                "signature does not recover to signer {creator}"
            ))
            .into());
        }

        let manifest = ManifestBuilder::new(content_hash.to_hex(), creator, signature)
            .content_uri(content_uri)
            .chain_id(self.config.chain_id)
            .build()?;
        let json = manifest.to_json()?;
        let name = format!("{}.manifest.json", content_hash.to_hex());
        let manifest_uri = self.upload(&name, Bytes::from(json)).await?;

        tracing::debug!(content_hash = %content_hash, manifest_uri = %manifest_uri, "manifest published");
        Ok((manifest, manifest_uri))
    }
}
