//! BankingService and coordinator unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use banking_repo::MemoryRepo;
    use banking_types::{
        AddBeneficiary, AppError, EncryptedPayload, ExternalGateway, GatewayError, GatewayReceipt,
        GatewayRequest, IdentifierGenerator, IntentRepository, IntentResponse, IntentStatus,
        IntentView, OperationPayload, OperationRequest, OtpDispatch, OtpFields, OtpGuarded, Owner,
        ProvisionOwnerRequest, TxnIdentifier,
    };
    use secure_envelope::{EnvelopeKey, KeySize};

    use crate::{BankingService, CoordinatorConfig, ServiceConfig};

    const OTP: &str = "123456";

    #[derive(Default)]
    struct Calls {
        issue: u32,
        verify: u32,
        execute: u32,
        executed: Vec<TxnIdentifier>,
    }

    /// Gateway double that records every call.
    #[derive(Default)]
    pub struct MockGateway {
        calls: Mutex<Calls>,
        /// Errors returned by the next execute calls, in order.
        execute_failures: Mutex<Vec<GatewayError>>,
        issue_failure: Mutex<Option<GatewayError>>,
        execute_delay: Mutex<Option<Duration>>,
    }

    impl MockGateway {
        fn fail_next_execute(&self, err: GatewayError) {
            self.execute_failures.lock().unwrap().push(err);
        }

        fn fail_issue(&self, err: GatewayError) {
            *self.issue_failure.lock().unwrap() = Some(err);
        }

        fn delay_execute(&self, delay: Duration) {
            *self.execute_delay.lock().unwrap() = Some(delay);
        }

        fn issued(&self) -> u32 {
            self.calls.lock().unwrap().issue
        }

        fn verified(&self) -> u32 {
            self.calls.lock().unwrap().verify
        }

        fn executed(&self) -> u32 {
            self.calls.lock().unwrap().execute
        }
    }

    #[async_trait]
    impl ExternalGateway for MockGateway {
        async fn issue_otp(&self, _req: &GatewayRequest) -> Result<OtpDispatch, GatewayError> {
            self.calls.lock().unwrap().issue += 1;
            if let Some(err) = self.issue_failure.lock().unwrap().take() {
                return Err(err);
            }
            Ok(OtpDispatch {
                masked_destination: Some("XXXXXX4321".into()),
            })
        }

        async fn verify_otp(&self, _req: &GatewayRequest, otp: &str) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().verify += 1;
            if otp == OTP {
                Ok(())
            } else {
                Err(GatewayError::OtpMismatch)
            }
        }

        async fn execute(&self, req: &GatewayRequest) -> Result<GatewayReceipt, GatewayError> {
            let delay = *self.execute_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let failure = {
                let mut failures = self.execute_failures.lock().unwrap();
                (!failures.is_empty()).then(|| failures.remove(0))
            };

            let mut calls = self.calls.lock().unwrap();
            calls.execute += 1;
            if let Some(err) = failure {
                return Err(err);
            }
            calls.executed.push(req.identifier.clone());
            Ok(GatewayReceipt {
                reference: format!("REF-{}", calls.execute),
                message: "Beneficiary added".into(),
            })
        }
    }

    /// Deterministic identifiers: TXNTEST00000001, TXNTEST00000002, ...
    #[derive(Default)]
    struct SequentialIdentifiers(AtomicU32);

    impl IdentifierGenerator for SequentialIdentifiers {
        fn new_identifier(&self) -> TxnIdentifier {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            TxnIdentifier::parse(&format!("TXNTEST{:08}", n)).unwrap()
        }
    }

    fn service_with(
        coordinator: CoordinatorConfig,
    ) -> (BankingService<MemoryRepo>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::default());
        let mut config = ServiceConfig::new(EnvelopeKey::generate(KeySize::Aes256), "admin-secret");
        config.coordinator = coordinator;
        let service = BankingService::with_identifier_generator(
            MemoryRepo::new(),
            gateway.clone(),
            Arc::new(SequentialIdentifiers::default()),
            config,
        );
        (service, gateway)
    }

    fn service() -> (BankingService<MemoryRepo>, Arc<MockGateway>) {
        service_with(CoordinatorConfig::default())
    }

    async fn owner(service: &BankingService<MemoryRepo>) -> (Owner, EnvelopeKey) {
        let provisioned = service
            .provision_owner(ProvisionOwnerRequest {
                label: "pixel-7".into(),
            })
            .await
            .unwrap();
        let owner = service
            .authenticate(&provisioned.session_token)
            .await
            .unwrap();
        let key = EnvelopeKey::from_hex(&provisioned.signing_key).unwrap();
        (owner, key)
    }

    fn beneficiary() -> AddBeneficiary {
        AddBeneficiary {
            name: "Asha Rao".into(),
            ifsc: "HDFC0001234".into(),
            account_number: "50100012345678".into(),
            confirm_account_number: None,
            nickname: None,
        }
    }

    fn payload() -> OperationPayload {
        beneficiary().into_payload()
    }

    async fn issue(service: &BankingService<MemoryRepo>, owner: &Owner) -> IntentResponse {
        service
            .coordinator()
            .submit(owner.id, payload(), &OtpFields::issue(true))
            .await
            .unwrap()
    }

    async fn confirm(
        service: &BankingService<MemoryRepo>,
        owner: &Owner,
        identifier: &str,
        otp: &str,
        retry: bool,
    ) -> Result<IntentResponse, AppError> {
        service
            .coordinator()
            .submit(owner.id, payload(), &OtpFields::confirm(identifier, otp, retry))
            .await
    }

    fn seal<T: serde::Serialize>(key: &EnvelopeKey, value: &T) -> Vec<u8> {
        let data = key.seal(&serde_json::to_vec(value).unwrap()).unwrap();
        serde_json::to_vec(&EncryptedPayload { data }).unwrap()
    }

    fn open<T: serde::de::DeserializeOwned>(key: &EnvelopeKey, sealed: &EncryptedPayload) -> T {
        serde_json::from_slice(&key.open(&sealed.data).unwrap()).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // OTP gating
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_issuance_never_executes() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;

        let response = issue(&service, &owner).await;

        assert_eq!(response.status, IntentStatus::OtpSent);
        assert_eq!(response.txn_identifier, "TXNTEST00000001");
        assert!(response.reference.is_none());
        assert_eq!(response.otp_destination.as_deref(), Some("XXXXXX4321"));
        assert_eq!(gateway.issued(), 1);
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_add_beneficiary_round_trip() {
        let (service, gateway) = service();
        let (owner, key) = owner(&service).await;

        let first = OtpGuarded {
            payload: beneficiary(),
            otp: OtpFields::issue(true),
        };
        let sealed = service
            .submit_sealed::<AddBeneficiary>(&owner, &seal(&key, &first))
            .await
            .unwrap();
        let issued: IntentResponse = open(&key, &sealed);
        assert_eq!(issued.status, IntentStatus::OtpSent);
        assert_eq!(gateway.executed(), 0);

        let second = OtpGuarded {
            payload: beneficiary(),
            otp: OtpFields::confirm(&issued.txn_identifier, OTP, true),
        };
        let sealed = service
            .submit_sealed::<AddBeneficiary>(&owner, &seal(&key, &second))
            .await
            .unwrap();
        let done: IntentResponse = open(&key, &sealed);

        assert_eq!(done.status, IntentStatus::Completed);
        assert_eq!(done.txn_identifier, issued.txn_identifier);
        assert_eq!(done.reference.as_deref(), Some("REF-1"));
        assert_eq!(gateway.executed(), 1);
    }

    #[tokio::test]
    async fn test_missing_flags_rejected_before_gateway() {
        let (service, gateway) = service();
        let (owner, key) = owner(&service).await;

        let body = serde_json::json!({
            "name": "Asha Rao",
            "ifsc": "HDFC0001234",
            "account": "50100012345678",
            "retry_flag": "N"
        });
        let err = service
            .submit_sealed::<AddBeneficiary>(&owner, &seal(&key, &body))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ValidationFailed(_)));
        assert_eq!(gateway.issued(), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_is_decryption_failure() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let other = EnvelopeKey::generate(KeySize::Aes256);

        let body = OtpGuarded {
            payload: beneficiary(),
            otp: OtpFields::issue(true),
        };
        let err = service
            .submit_sealed::<AddBeneficiary>(&owner, &seal(&other, &body))
            .await
            .unwrap_err();

        assert_eq!(err, AppError::DecryptionFailed);
        assert_eq!(gateway.issued(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identifier stability
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_unknown_identifier_is_conflict() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        issue(&service, &owner).await;

        let err = confirm(&service, &owner, "TXNOTHER0001", OTP, true)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierConflict(_)));
        assert_eq!(gateway.verified(), 0);
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_identifier_bound_to_payload() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let mut changed = beneficiary();
        changed.account_number = "50100099999999".into();
        let err = service
            .coordinator()
            .submit(
                owner.id,
                changed.into_payload(),
                &OtpFields::confirm(&issued.txn_identifier, OTP, true),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierConflict(_)));
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_identifier_bound_to_owner() {
        let (service, gateway) = service();
        let (alice, _) = owner(&service).await;
        let (mallory, _) = owner(&service).await;
        let issued = issue(&service, &alice).await;

        let err = confirm(&service, &mallory, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierConflict(_)));
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_repeated_retry_commits_once() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let first = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();
        let second = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();

        assert_eq!(first.reference, second.reference);
        assert_eq!(second.status, IntentStatus::Completed);
        assert_eq!(gateway.verified(), 1);
        assert_eq!(gateway.executed(), 1);
    }

    #[tokio::test]
    async fn test_repeat_without_retry_flag_is_conflict() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        confirm(&service, &owner, &issued.txn_identifier, OTP, false)
            .await
            .unwrap();

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, false)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierConflict(_)));
        assert_eq!(gateway.executed(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_confirms_execute_once() {
        let (service, gateway) = service();
        let service = Arc::new(service);
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        gateway.delay_execute(Duration::from_millis(50));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                let owner = owner.clone();
                let identifier = issued.txn_identifier.clone();
                tokio::spawn(async move {
                    confirm(&service, &owner, &identifier, OTP, true).await
                })
            })
            .collect();

        let mut references = Vec::new();
        for handle in handles {
            references.push(handle.await.unwrap().unwrap().reference);
        }

        assert!(references.iter().all(|r| r.as_deref() == Some("REF-1")));
        assert_eq!(gateway.verified(), 1);
        assert_eq!(gateway.executed(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resend, attempts and expiry
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_resend_reuses_identifier() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let mut resend = OtpFields::issue(true);
        resend.txn_identifier = Some(issued.txn_identifier.clone());
        let again = service
            .coordinator()
            .submit(owner.id, payload(), &resend)
            .await
            .unwrap();

        assert_eq!(again.txn_identifier, issued.txn_identifier);
        assert_eq!(gateway.issued(), 2);
    }

    #[tokio::test]
    async fn test_known_identifier_without_resend_is_conflict() {
        let (service, _) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let mut fields = OtpFields::issue(false);
        fields.txn_identifier = Some(issued.txn_identifier);
        let err = service
            .coordinator()
            .submit(owner.id, payload(), &fields)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::IdentifierConflict(_)));
    }

    #[tokio::test]
    async fn test_mismatch_then_retry_succeeds() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let err = confirm(&service, &owner, &issued.txn_identifier, "000000", false)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::OtpMismatch);

        // A second submission must be flagged as a retry.
        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IdentifierConflict(_)));

        let done = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();
        assert_eq!(done.status, IntentStatus::Completed);
        assert_eq!(gateway.executed(), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_capped() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        for _ in 0..3 {
            let err = confirm(&service, &owner, &issued.txn_identifier, "000000", true)
                .await
                .unwrap_err();
            assert_eq!(err, AppError::OtpMismatch);
        }

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(gateway.verified(), 3);
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_attempts_are_counted_across_resends() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        for _ in 0..2 {
            let err = confirm(&service, &owner, &issued.txn_identifier, "000000", true)
                .await
                .unwrap_err();
            assert_eq!(err, AppError::OtpMismatch);
        }

        let mut resend = OtpFields::issue(true);
        resend.txn_identifier = Some(issued.txn_identifier.clone());
        service
            .coordinator()
            .submit(owner.id, payload(), &resend)
            .await
            .unwrap();

        // A fresh OTP does not reset the budget: one attempt is left.
        let err = confirm(&service, &owner, &issued.txn_identifier, "000000", true)
            .await
            .unwrap_err();
        assert_eq!(err, AppError::OtpMismatch);

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .coordinator()
            .submit(owner.id, payload(), &resend)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let id = TxnIdentifier::parse(&issued.txn_identifier).unwrap();
        let view = service.coordinator().status(owner.id, &id).await.unwrap();
        assert_eq!(view.otp_attempts, 3);
        assert_eq!(gateway.issued(), 2);
        assert_eq!(gateway.verified(), 3);
        assert_eq!(gateway.executed(), 0);
    }

    #[tokio::test]
    async fn test_expired_otp_is_not_verified() {
        let (service, gateway) = service_with(CoordinatorConfig {
            intent_ttl: chrono::Duration::zero(),
            ..CoordinatorConfig::default()
        });
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();

        assert_eq!(err, AppError::OtpExpired);
        assert_eq!(gateway.verified(), 0);
    }

    #[tokio::test]
    async fn test_otp_without_identifier_is_invalid() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;

        let mut fields = OtpFields::issue(false);
        fields.otp = Some(OTP.into());
        let err = service
            .coordinator()
            .submit(owner.id, payload(), &fields)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ValidationFailed(_)));
        assert_eq!(gateway.issued(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gateway failures
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_execution_retry_skips_verification() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        gateway.fail_next_execute(GatewayError::Unavailable("switch down".into()));

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));

        let done = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();
        assert_eq!(done.status, IntentStatus::Completed);
        assert_eq!(gateway.verified(), 1);
        assert_eq!(gateway.executed(), 2);
    }

    #[tokio::test]
    async fn test_verified_intent_retries_execution_after_ttl() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        gateway.fail_next_execute(GatewayError::Unavailable("switch down".into()));

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));

        let id = TxnIdentifier::parse(&issued.txn_identifier).unwrap();
        let mut intent = service.repo().get_intent(&id).await.unwrap().unwrap();
        intent.expires_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        service.repo().update_intent(&mut intent).await.unwrap();

        let done = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();
        assert_eq!(done.status, IntentStatus::Completed);
        assert_eq!(gateway.verified(), 1);
        assert_eq!(gateway.executed(), 2);
    }

    #[tokio::test]
    async fn test_rejection_is_final() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        gateway.fail_next_execute(GatewayError::Rejected("daily limit reached".into()));

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(gateway.executed(), 1);
    }

    #[tokio::test]
    async fn test_slow_gateway_times_out() {
        let (service, gateway) = service_with(CoordinatorConfig {
            gateway_timeout: Duration::from_millis(20),
            ..CoordinatorConfig::default()
        });
        let (owner, _) = owner(&service).await;
        let issued = issue(&service, &owner).await;
        gateway.delay_execute(Duration::from_millis(200));

        let err = confirm(&service, &owner, &issued.txn_identifier, OTP, true)
            .await
            .unwrap_err();

        assert_eq!(err, AppError::GatewayTimeout);
    }

    #[tokio::test]
    async fn test_failed_issuance_can_be_resent() {
        let (service, gateway) = service();
        let (owner, _) = owner(&service).await;
        gateway.fail_issue(GatewayError::Unavailable("sms down".into()));

        let err = service
            .coordinator()
            .submit(owner.id, payload(), &OtpFields::issue(true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));

        let mut resend = OtpFields::issue(true);
        resend.txn_identifier = Some("TXNTEST00000001".into());
        let again = service
            .coordinator()
            .submit(owner.id, payload(), &resend)
            .await
            .unwrap();
        assert_eq!(again.status, IntentStatus::OtpSent);
        assert_eq!(gateway.issued(), 2);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status and plaintext reads
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_status_is_scoped_to_owner() {
        let (service, _) = service();
        let (alice, key) = owner(&service).await;
        let (mallory, _) = owner(&service).await;
        let issued = issue(&service, &alice).await;
        confirm(&service, &alice, &issued.txn_identifier, OTP, true)
            .await
            .unwrap();

        let sealed = service
            .intent_status(&alice, &issued.txn_identifier)
            .await
            .unwrap();
        let view: IntentView = open(&key, &sealed);
        assert_eq!(view.state, "COMMITTED");
        assert_eq!(view.reference.as_deref(), Some("REF-1"));
        assert_eq!(view.otp_attempts, 1);

        let err = service
            .intent_status(&mallory, &issued.txn_identifier)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rotated_key_replaces_old_key() {
        let (service, _) = service();
        let (owner, old_key) = owner(&service).await;

        let rotated = service.rotate_owner_key(owner.id).await.unwrap();
        assert_eq!(rotated.key_version, 2);

        let body = OtpGuarded {
            payload: beneficiary(),
            otp: OtpFields::issue(true),
        };
        let err = service
            .submit_sealed::<AddBeneficiary>(&owner, &seal(&old_key, &body))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::DecryptionFailed);

        let new_key = EnvelopeKey::from_hex(&rotated.signing_key).unwrap();
        assert!(
            service
                .submit_sealed::<AddBeneficiary>(&owner, &seal(&new_key, &body))
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_ifsc_lookup() {
        let (service, _) = service();

        let lookup = service.validate_ifsc(br#"{"ifsc":"SBIN0005943"}"#).unwrap();
        assert_eq!(lookup.bank_code, "SBIN");
        assert_eq!(lookup.branch_code, "005943");

        let err = service.validate_ifsc(br#"{"ifsc":"SBIN1005943"}"#).unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn test_admin_token() {
        let (service, _) = service();
        assert!(service.is_admin("admin-secret"));
        assert!(!service.is_admin("admin-secreT"));
        assert!(!service.is_admin(""));
    }
}
