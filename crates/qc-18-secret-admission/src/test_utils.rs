//! Test utilities: recording collaborators, enclave fixtures and log capture.
//!
//! Requires feature: `test-utils` (always on for this crate's unit tests).

use crate::adapters::{mock_report_body, LocalEnclaveSigner, SelectorRegistryCodec};
use crate::domain::{
    decompress, encode_attestation, enclave_id_from_public_key, AdmissionConfig, Address,
    AttestationReport, BlockHeader, CompressedPublicKey, EventKind, EventRecord, Hash,
    InitializeSecretEvent, ProcessedBundle, RecoverableSignature, RequestSecretEvent, TypedEvent,
    UncompressedPublicKey, VerifiedIdentity,
};
use crate::ports::outbound::{
    AttestationVerifier, IdentityStore, SealError, SecretSealer, SignError, SigningService,
    StoreError, VerifierError,
};
use crate::service::SharedSecretProcessor;
use async_trait::async_trait;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Layer-1 chain id used by the fixtures.
pub const TEST_CHAIN_ID: i64 = 443;

/// Block height of fixture bundles.
pub const TEST_BLOCK_HEIGHT: u64 = 100;

/// Registry address `0x000...000F`.
pub fn test_registry_address() -> Address {
    let mut address = [0u8; 20];
    address[19] = 0x0F;
    address
}

// =============================================================================
// Recording collaborators
// =============================================================================

/// Identity store that records every write.
#[derive(Default)]
pub struct RecordingIdentityStore {
    writes: Mutex<Vec<(Address, UncompressedPublicKey)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful writes in call order.
    pub fn writes(&self) -> Vec<(Address, UncompressedPublicKey)> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Calls made, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityStore for RecordingIdentityStore {
    async fn store_enclave(
        &self,
        cancel: &CancellationToken,
        enclave_id: Address,
        public_key: UncompressedPublicKey,
    ) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        self.writes.lock().push((enclave_id, public_key));
        Ok(())
    }
}

/// Behaviour of a [`ScriptedVerifier`].
#[derive(Clone, Debug)]
pub enum VerifierMode {
    /// Bind the key the report presents
    Accept,
    /// Reject every report
    Reject,
    /// Accept, but bind a different key than the report presents
    BindKey(CompressedPublicKey),
    /// Accept the first `n` calls, then never return
    HangAfter(usize),
}

/// Attestation verifier with scripted answers.
pub struct ScriptedVerifier {
    mode: Mutex<VerifierMode>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new(mode: VerifierMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, mode: VerifierMode) {
        *self.mode.lock() = mode;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestationVerifier for ScriptedVerifier {
    async fn verify(&self, report: &AttestationReport) -> Result<VerifiedIdentity, VerifierError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().clone();

        let bound = VerifiedIdentity {
            enclave_id: report.enclave_id,
            public_key: report.public_key,
        };
        match mode {
            VerifierMode::Accept => Ok(bound),
            VerifierMode::Reject => Err(VerifierError::Rejected("scripted rejection".to_string())),
            VerifierMode::BindKey(public_key) => Ok(VerifiedIdentity {
                public_key,
                ..bound
            }),
            VerifierMode::HangAfter(n) if call >= n => std::future::pending().await,
            VerifierMode::HangAfter(_) => Ok(bound),
        }
    }
}

/// Sealer returning a fixed ciphertext.
pub struct FixedSealer {
    ciphertext: Vec<u8>,
    recipients: Mutex<Vec<CompressedPublicKey>>,
    failing: AtomicBool,
}

impl FixedSealer {
    pub fn new(ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext,
            recipients: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Keys the secret was sealed to, in call order.
    pub fn recipients(&self) -> Vec<CompressedPublicKey> {
        self.recipients.lock().clone()
    }
}

#[async_trait]
impl SecretSealer for FixedSealer {
    async fn encrypt_under(&self, recipient: &CompressedPublicKey) -> Result<Vec<u8>, SealError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SealError::EncryptionFailed("injected failure".to_string()));
        }
        self.recipients.lock().push(*recipient);
        Ok(self.ciphertext.clone())
    }
}

/// Signing service that always fails.
#[derive(Debug, Default)]
pub struct FailingSigner;

#[async_trait]
impl SigningService for FailingSigner {
    async fn sign(&self, _hash: &Hash) -> Result<RecoverableSignature, SignError> {
        Err(SignError::Failed("injected failure".to_string()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A remote enclave with a real secp256k1 key.
pub struct EnclaveFixture {
    pub secret_key: k256::SecretKey,
    pub public_key: CompressedPublicKey,
    pub enclave_id: Address,
    pub host_address: String,
}

impl EnclaveFixture {
    /// Random key; the enclave id is derived from it.
    pub fn new(host_address: &str) -> Self {
        let secret_key = k256::SecretKey::random(&mut rand::thread_rng());
        let encoded = secret_key.public_key().to_encoded_point(true);
        let public_key =
            CompressedPublicKey::from_slice(encoded.as_bytes()).expect("33-byte compressed key");
        let enclave_id = enclave_id_from_public_key(&decompress(&public_key).expect("valid key"));

        Self {
            secret_key,
            public_key,
            enclave_id,
            host_address: host_address.to_string(),
        }
    }

    /// Override the declared enclave id.
    pub fn with_enclave_id(mut self, enclave_id: Address) -> Self {
        self.enclave_id = enclave_id;
        self
    }

    pub fn uncompressed_public_key(&self) -> UncompressedPublicKey {
        decompress(&self.public_key).expect("valid key")
    }

    /// Report whose body the mock verifier accepts.
    pub fn report(&self) -> AttestationReport {
        AttestationReport {
            enclave_id: self.enclave_id,
            host_address: self.host_address.clone(),
            public_key: self.public_key,
            report: mock_report_body(&self.enclave_id, &self.public_key),
        }
    }

    pub fn attestation(&self) -> Vec<u8> {
        encode_attestation(&self.report()).expect("encodable report")
    }

    /// Registry transaction requesting the secret.
    pub fn request_record(&self, codec: &SelectorRegistryCodec, tx_tag: u8) -> EventRecord {
        let event = TypedEvent::Request(RequestSecretEvent {
            attestation: self.attestation(),
        });
        EventRecord::new(codec.encode_event(&event).expect("encodable"), [tx_tag; 32])
    }

    /// Registry transaction publishing a genesis attestation.
    pub fn initialize_record(&self, codec: &SelectorRegistryCodec, tx_tag: u8) -> EventRecord {
        let event = TypedEvent::Initialize(InitializeSecretEvent {
            attestation: self.attestation(),
        });
        EventRecord::new(codec.encode_event(&event).expect("encodable"), [tx_tag; 32])
    }
}

/// Transaction with an unknown selector.
pub fn undecodable_record(tx_tag: u8) -> EventRecord {
    EventRecord::new(vec![0xde, 0xad, 0xbe, 0xef, 0x01], [tx_tag; 32])
}

/// Processor wired to recording collaborators and a real local signer.
pub type TestProcessor = SharedSecretProcessor<
    SelectorRegistryCodec,
    ScriptedVerifier,
    FixedSealer,
    RecordingIdentityStore,
    LocalEnclaveSigner,
>;

/// Collaborators for one processor under test.
pub struct TestHarness {
    pub codec: Arc<SelectorRegistryCodec>,
    pub verifier: Arc<ScriptedVerifier>,
    pub sealer: Arc<FixedSealer>,
    pub store: Arc<RecordingIdentityStore>,
    pub signer: Arc<LocalEnclaveSigner>,
}

impl TestHarness {
    /// Accepting verifier, 48-byte fixed ciphertext, chain 443, registry `0x..0F`.
    pub fn new() -> Self {
        Self {
            codec: Arc::new(SelectorRegistryCodec::new(test_registry_address())),
            verifier: Arc::new(ScriptedVerifier::new(VerifierMode::Accept)),
            sealer: Arc::new(FixedSealer::new(vec![0xC5; 48])),
            store: Arc::new(RecordingIdentityStore::new()),
            signer: Arc::new(LocalEnclaveSigner::generate().expect("signer")),
        }
    }

    pub fn config(&self) -> AdmissionConfig {
        AdmissionConfig::new(self.signer.enclave_id(), TEST_CHAIN_ID).expect("valid config")
    }

    pub fn processor(&self) -> TestProcessor {
        SharedSecretProcessor::builder()
            .config(self.config())
            .registry_codec(self.codec.clone())
            .attestation_verifier(self.verifier.clone())
            .secret_sealer(self.sealer.clone())
            .identity_store(self.store.clone())
            .signing_service(self.signer.clone())
            .build()
            .expect("complete builder")
    }

    /// Bundle at [`TEST_BLOCK_HEIGHT`] with the given events in order.
    pub fn bundle(&self, initialize: Vec<EventRecord>, request: Vec<EventRecord>) -> ProcessedBundle {
        let mut bundle = ProcessedBundle::new(BlockHeader {
            number: TEST_BLOCK_HEIGHT,
            hash: [0xB1; 32],
        });
        for record in initialize {
            bundle.push_event(EventKind::InitializeSecret, record);
        }
        for record in request {
            bundle.push_event(EventKind::RequestSecret, record);
        }
        bundle
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Log capture
// =============================================================================

/// Tracing layer that counts events per level and keeps their messages.
///
/// ```ignore
/// let capture = LogCapture::default();
/// let _guard = tracing::subscriber::set_default(capture.subscriber());
/// ```
#[derive(Clone, Default)]
pub struct LogCapture {
    counts: Arc<Mutex<HashMap<Level, usize>>>,
    messages: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Subscriber with only this layer attached.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync {
        tracing_subscriber::registry().with(self.clone())
    }

    pub fn count(&self, level: Level) -> usize {
        self.counts.lock().get(&level).copied().unwrap_or(0)
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);

        *self.counts.lock().entry(level).or_insert(0) += 1;
        self.messages.lock().push((level, visitor.0));
    }
}
