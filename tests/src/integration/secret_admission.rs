//! # Secret Admission Integration Flows
//!
//! Bundle passes through `SharedSecretProcessor` covering:
//!
//! 1. **Happy path**: verified request is stored, sealed, hashed and signed
//! 2. **Rejections**: verifier failure and identity mismatch leave no trace
//! 3. **Gating**: `can_share = false` withholds responses but keeps writes
//! 4. **Mixed bundles**: initialize events, undecodable requests, ordering
//! 5. **Real adapters**: ECIES sealing opened by the requester's key

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qc_18_secret_admission::test_utils::{
        test_registry_address, undecodable_record, EnclaveFixture, LogCapture, TestHarness,
        VerifierMode, TEST_CHAIN_ID,
    };
    use qc_18_secret_admission::{
        keccak256, open_sealed_secret, recover_signer, response_preimage, AdmissionConfig,
        CancellationToken, EciesSecretSealer, InMemoryIdentityStore, LocalEnclaveSigner,
        MockAttestationVerifier, NetworkSecret, SecretAdmissionApi, SelectorRegistryCodec,
        SharedSecretProcessor,
    };
    use tracing::Level;

    // =============================================================================
    // SCENARIO A: happy path admission
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_a_happy_path_admission() {
        let harness = TestHarness::new();
        let requester = EnclaveFixture::new("node-2:10000").with_enclave_id([0xAA; 20]);
        let bundle = harness.bundle(vec![], vec![requester.request_record(&harness.codec, 1)]);

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        // Identity store saw the decompressed key
        assert_eq!(
            harness.store.writes(),
            vec![([0xAA; 20], requester.uncompressed_public_key())]
        );

        assert!(!outcome.cancelled);
        assert_eq!(outcome.responses.len(), 1);
        let response = &outcome.responses[0];
        assert_eq!(response.requester_id, [0xAA; 20]);
        assert_eq!(response.attester_id, harness.signer.enclave_id());
        assert_eq!(response.host_address, "node-2:10000");
        assert_eq!(response.sealed_secret, harness.sealer.ciphertext());
        assert_eq!(response.sealed_secret.len(), 48);

        // Signed preimage: id || 0x00000030 || C || 0x00000000000001BB || 0x00..0F
        let preimage = response_preimage(
            &[0xAA; 20],
            &response.sealed_secret,
            TEST_CHAIN_ID,
            &test_registry_address(),
        )
        .unwrap();
        let mut expected = vec![0xAA; 20];
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x30]);
        expected.extend_from_slice(harness.sealer.ciphertext());
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xBB]);
        expected.extend_from_slice(&test_registry_address());
        assert_eq!(preimage, expected);

        let recovered = recover_signer(&keccak256(&preimage), &response.signature).unwrap();
        assert_eq!(recovered, harness.signer.uncompressed_public_key().unwrap());
    }

    // =============================================================================
    // SCENARIO B: verifier rejects
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_b_verifier_rejects() {
        let harness = TestHarness::new();
        harness.verifier.set_mode(VerifierMode::Reject);
        let requester = EnclaveFixture::new("node-2:10000").with_enclave_id([0xAA; 20]);
        let bundle = harness.bundle(vec![], vec![requester.request_record(&harness.codec, 1)]);

        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert_eq!(harness.store.attempts(), 0);
        assert!(outcome.responses.is_empty());
        assert!(!outcome.cancelled);
        assert_eq!(capture.count(Level::ERROR), 1);
    }

    // =============================================================================
    // SCENARIO C: gated off
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_c_gated_off() {
        let harness = TestHarness::new();
        let requester = EnclaveFixture::new("node-2:10000").with_enclave_id([0xAA; 20]);
        let bundle = harness.bundle(vec![], vec![requester.request_record(&harness.codec, 1)]);

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, false)
            .await;

        assert_eq!(
            harness.store.writes(),
            vec![([0xAA; 20], requester.uncompressed_public_key())]
        );
        assert!(outcome.responses.is_empty());
    }

    // =============================================================================
    // SCENARIO D: identity mismatch
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_d_identity_mismatch() {
        let harness = TestHarness::new();
        let impostor = EnclaveFixture::new("elsewhere:10000");
        harness
            .verifier
            .set_mode(VerifierMode::BindKey(impostor.public_key));
        let requester = EnclaveFixture::new("node-2:10000").with_enclave_id([0xAA; 20]);
        let bundle = harness.bundle(vec![], vec![requester.request_record(&harness.codec, 1)]);

        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert_eq!(harness.store.attempts(), 0);
        assert!(harness.sealer.recipients().is_empty());
        assert!(outcome.responses.is_empty());
        assert!(capture
            .messages(Level::ERROR)
            .iter()
            .any(|m| m.contains("Failed to process shared secret request")));
    }

    // =============================================================================
    // SCENARIO E: mixed bundle
    // =============================================================================

    #[tokio::test]
    async fn test_scenario_e_mixed_bundle() {
        let harness = TestHarness::new();
        let genesis_a = EnclaveFixture::new("genesis-a:10000");
        let genesis_b = EnclaveFixture::new("genesis-b:10000");
        let first = EnclaveFixture::new("node-1:10000");
        let third = EnclaveFixture::new("node-3:10000");
        let bundle = harness.bundle(
            vec![
                genesis_a.initialize_record(&harness.codec, 1),
                genesis_b.initialize_record(&harness.codec, 2),
            ],
            vec![
                first.request_record(&harness.codec, 3),
                undecodable_record(4),
                third.request_record(&harness.codec, 5),
            ],
        );

        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        // Initialize writes land first, then the two decodable requests
        let written: Vec<_> = harness.store.writes().iter().map(|(id, _)| *id).collect();
        assert_eq!(
            written,
            vec![
                genesis_a.enclave_id,
                genesis_b.enclave_id,
                first.enclave_id,
                third.enclave_id
            ]
        );

        assert!(outcome.responses.len() <= 2);
        let requesters: Vec<_> = outcome.responses.iter().map(|r| r.requester_id).collect();
        assert_eq!(requesters, vec![first.enclave_id, third.enclave_id]);

        assert_eq!(capture.count(Level::WARN), 1);
        assert_eq!(capture.count(Level::ERROR), 0);
    }

    // =============================================================================
    // BOUNDARIES
    // =============================================================================

    #[tokio::test]
    async fn test_empty_bundle() {
        let harness = TestHarness::new();
        let bundle = harness.bundle(vec![], vec![]);

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert!(outcome.responses.is_empty());
        assert!(!outcome.cancelled);
        assert_eq!(harness.store.attempts(), 0);
    }

    #[tokio::test]
    async fn test_one_valid_one_undecodable_request() {
        let harness = TestHarness::new();
        let requester = EnclaveFixture::new("node-2:10000");
        let bundle = harness.bundle(
            vec![],
            vec![
                requester.request_record(&harness.codec, 1),
                undecodable_record(2),
            ],
        );

        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert_eq!(outcome.responses.len(), 1);
        assert_eq!(capture.count(Level::WARN), 1);
    }

    #[tokio::test]
    async fn test_gated_off_with_three_requests_still_writes() {
        let harness = TestHarness::new();
        let enclaves: Vec<_> = (0..3)
            .map(|i| EnclaveFixture::new(&format!("node-{i}:10000")))
            .collect();
        let records = enclaves
            .iter()
            .enumerate()
            .map(|(i, e)| e.request_record(&harness.codec, i as u8))
            .collect();
        let bundle = harness.bundle(vec![], records);

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, false)
            .await;

        assert_eq!(harness.store.write_count(), 3);
        assert!(outcome.responses.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_events_never_respond() {
        let harness = TestHarness::new();
        let genesis = EnclaveFixture::new("genesis:10000");
        let bundle = harness.bundle(vec![genesis.initialize_record(&harness.codec, 1)], vec![]);

        let outcome = harness
            .processor()
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert!(outcome.responses.is_empty());
        assert_eq!(harness.store.write_count(), 1);
    }

    // =============================================================================
    // IDEMPOTENCE
    // =============================================================================

    #[tokio::test]
    async fn test_reprocessing_bundle_yields_same_responses() {
        let harness = TestHarness::new();
        let processor = harness.processor();
        let requester = EnclaveFixture::new("node-2:10000");
        let bundle = harness.bundle(vec![], vec![requester.request_record(&harness.codec, 1)]);
        let cancel = CancellationToken::new();

        let first = processor
            .process_network_secret_msgs(&cancel, &bundle, true)
            .await;
        let second = processor
            .process_network_secret_msgs(&cancel, &bundle, true)
            .await;

        assert_eq!(first.responses.len(), 1);
        assert_eq!(second.responses.len(), 1);
        let (a, b) = (&first.responses[0], &second.responses[0]);
        assert_eq!(a.sealed_secret, b.sealed_secret);
        assert_eq!(a.requester_id, b.requester_id);
        assert_eq!(a.host_address, b.host_address);

        let preimage =
            response_preimage(&a.requester_id, &a.sealed_secret, TEST_CHAIN_ID, &test_registry_address())
                .unwrap();
        let hash = keccak256(&preimage);
        assert_eq!(
            recover_signer(&hash, &a.signature).unwrap(),
            recover_signer(&hash, &b.signature).unwrap()
        );
    }

    // =============================================================================
    // REAL ADAPTERS
    // =============================================================================

    #[tokio::test]
    async fn test_admission_with_real_adapters() {
        let network_secret = NetworkSecret::generate();
        let signer = Arc::new(LocalEnclaveSigner::generate().unwrap());
        let store = Arc::new(InMemoryIdentityStore::new());
        let codec = Arc::new(SelectorRegistryCodec::new(test_registry_address()));

        let processor = SharedSecretProcessor::builder()
            .config(AdmissionConfig::new(signer.enclave_id(), TEST_CHAIN_ID).unwrap())
            .registry_codec(codec.clone())
            .attestation_verifier(Arc::new(MockAttestationVerifier::new()))
            .secret_sealer(Arc::new(EciesSecretSealer::new(network_secret.clone())))
            .identity_store(store.clone())
            .signing_service(signer.clone())
            .build()
            .unwrap();

        let requester = EnclaveFixture::new("node-2:10000");
        let harness = TestHarness::new();
        let bundle = harness.bundle(vec![], vec![requester.request_record(&codec, 1)]);

        let api: &dyn SecretAdmissionApi = &processor;
        let outcome = api
            .process_network_secret_msgs(&CancellationToken::new(), &bundle, true)
            .await;

        assert_eq!(outcome.responses.len(), 1);
        let response = &outcome.responses[0];

        // Only the requester can open its copy
        let opened = open_sealed_secret(&requester.secret_key, &response.sealed_secret).unwrap();
        assert_eq!(opened.as_slice(), network_secret.as_bytes());

        assert_eq!(
            store.get(&requester.enclave_id),
            Some(requester.uncompressed_public_key())
        );

        let preimage = response_preimage(
            &requester.enclave_id,
            &response.sealed_secret,
            TEST_CHAIN_ID,
            &test_registry_address(),
        )
        .unwrap();
        let recovered = recover_signer(&keccak256(&preimage), &response.signature).unwrap();
        assert_eq!(recovered, signer.uncompressed_public_key().unwrap());
        assert_eq!(api.enclave_id(), signer.enclave_id());
    }
}
