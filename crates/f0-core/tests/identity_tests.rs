use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use f0_core::model::{Account, AccountDraft, AccountId, Activity, ClickEvent, ClickSource, CommissionEvent, Contact,
                     ContactPatch, CreateOutcome, NewContact, Session};
use f0_core::{InMemoryLedgerStore, LedgerError, LedgerStore, Money, ReferralEngine};

#[test]
fn create_account_normalizes_email_and_rejects_duplicates() {
    let engine = ReferralEngine::in_memory();
    let account = engine.create_account("  Alice@Example.com ", None).expect("create");
    assert_eq!(account.email, "alice@example.com");
    assert!(account.referral_code.starts_with("IK-"));
    assert_eq!(account.referred_by, None);

    let err = engine.create_account("ALICE@example.com", None).unwrap_err();
    assert_eq!(err, LedgerError::DuplicateEmail);
}

#[test]
fn invalid_email_is_rejected_before_storage() {
    let engine = ReferralEngine::in_memory();
    assert_eq!(engine.create_account("nope", None).unwrap_err(), LedgerError::InvalidEmail);
    assert!(engine.store().account(1).unwrap().is_none());
}

#[test]
fn code_generation_gives_up_after_bounded_retries() {
    fn fixed() -> String {
        "IK-FIXED000".to_string()
    }
    let engine = ReferralEngine::in_memory().with_code_generator(fixed);
    engine.create_account("first@example.com", None).expect("first account takes the code");
    let err = engine.create_account("second@example.com", None).unwrap_err();
    assert_eq!(err, LedgerError::CodeGenerationExhausted);
    assert!(engine.store().account_by_email("second@example.com").unwrap().is_none());
}

#[test]
fn tokens_resolve_until_expiry() {
    let engine = ReferralEngine::in_memory();
    let account = engine.create_account("bob@example.com", None).unwrap();
    let now = Utc::now();
    let session = engine.authenticate_at("bob@example.com", now).unwrap();
    assert_eq!(session.expires_at - session.issued_at, Duration::days(28));

    let resolved = engine.resolve_token_at(&session.token, now + Duration::days(27)).unwrap();
    assert_eq!(resolved.id, account.id);

    let expired = engine.resolve_token_at(&session.token, now + Duration::days(28));
    assert_eq!(expired.unwrap_err(), LedgerError::InvalidOrExpiredToken);
}

#[test]
fn reauthentication_keeps_prior_tokens_valid() {
    let engine = ReferralEngine::in_memory();
    engine.create_account("carol@example.com", None).unwrap();
    let first = engine.authenticate("carol@example.com").unwrap();
    let second = engine.authenticate("carol@example.com").unwrap();
    assert_ne!(first.token, second.token);
    assert!(second.expires_at >= first.expires_at);
    assert!(engine.resolve_token(&first.token).is_ok());
    assert!(engine.resolve_token(&second.token).is_ok());
}

#[test]
fn unknown_tokens_and_emails_are_rejected() {
    let engine = ReferralEngine::in_memory();
    assert_eq!(engine.resolve_token("deadbeef").unwrap_err(), LedgerError::InvalidOrExpiredToken);
    assert_eq!(engine.authenticate("ghost@example.com").unwrap_err(), LedgerError::UnknownAccount);
}

#[test]
fn join_is_idempotent_per_email() {
    let engine = ReferralEngine::in_memory();
    let first = engine.join("creator@example.com", None).unwrap();
    assert!(!first.returning);
    assert_eq!(first.clicks, 0);

    engine.record_click(&first.account.referral_code, &Default::default());
    let again = engine.join("Creator@Example.com", None).unwrap();
    assert!(again.returning);
    assert_eq!(again.account.referral_code, first.account.referral_code);
    assert_eq!(again.clicks, 1);
    // Conocer el email no alcanza para obtener credenciales de otra cuenta.
    assert!(again.enrollment.is_none());

    let enrollment = first.enrollment.expect("new accounts are enrolled");
    assert_eq!(engine.resolve_token(&enrollment.session.token).unwrap().id, first.account.id);
    assert!(engine.login("creator@example.com", &enrollment.license_key).is_ok());
}

#[test]
fn login_requires_the_owners_license_key() {
    let engine = ReferralEngine::in_memory().with_license_secret("test-secret");
    let alice = engine.signup("alice@example.com", None).unwrap();
    let bob = engine.signup("bob@example.com", None).unwrap();

    let (account, session) = engine.login("ALICE@example.com", &alice.license_key).unwrap();
    assert_eq!(account.id, alice.account.id);
    assert_eq!(engine.resolve_token(&session.token).unwrap().id, alice.account.id);

    for key in ["", "IK-garbage", bob.license_key.as_str()] {
        assert_eq!(engine.login("alice@example.com", key).unwrap_err(), LedgerError::InvalidLicenseKey);
    }
    let foreign = ReferralEngine::in_memory().with_license_secret("other-secret");
    let forged = foreign.signup("alice@example.com", None).unwrap().license_key;
    assert_eq!(engine.login("alice@example.com", &forged).unwrap_err(), LedgerError::InvalidLicenseKey);
}

#[test]
fn license_keys_expire_with_the_session_window() {
    let engine = ReferralEngine::in_memory();
    let enrollment = engine.signup("dana@example.com", None).unwrap();
    let later = Utc::now() + Duration::days(29);
    assert_eq!(engine.login_at("dana@example.com", &enrollment.license_key, later).unwrap_err(),
               LedgerError::InvalidLicenseKey);
    let fresh = engine.license_key_for(&enrollment.account).unwrap();
    assert!(engine.login("dana@example.com", &fresh).is_ok());
}

/// Store en memoria con fallos inyectables en sesiones y altas.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryLedgerStore,
    sessions_down: AtomicBool,
    fail_next_create: AtomicBool,
}

fn locked() -> LedgerError {
    LedgerError::Storage("database is locked".into())
}

impl LedgerStore for FlakyStore {
    fn create_account(&self, draft: AccountDraft) -> Result<CreateOutcome, LedgerError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(locked());
        }
        self.inner.create_account(draft)
    }
    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.inner.account(id)
    }
    fn account_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        self.inner.account_by_email(email)
    }
    fn account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        self.inner.account_by_code(code)
    }
    fn accounts_referred_by(&self, code: &str) -> Result<Vec<Account>, LedgerError> {
        self.inner.accounts_referred_by(code)
    }
    fn insert_session(&self, session: &Session) -> Result<(), LedgerError> {
        if self.sessions_down.load(Ordering::SeqCst) {
            return Err(locked());
        }
        self.inner.insert_session(session)
    }
    fn session(&self, token: &str) -> Result<Option<Session>, LedgerError> {
        self.inner.session(token)
    }
    fn append_click(&self, code: &str, source: &ClickSource, at: DateTime<Utc>) -> Result<ClickEvent, LedgerError> {
        self.inner.append_click(code, source, at)
    }
    fn click_count(&self, code: &str) -> Result<u64, LedgerError> {
        self.inner.click_count(code)
    }
    fn append_commission(&self,
                         account_id: AccountId,
                         amount: Money,
                         order_id: Option<&str>,
                         at: DateTime<Utc>)
                         -> Result<CommissionEvent, LedgerError> {
        self.inner.append_commission(account_id, amount, order_id, at)
    }
    fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError> {
        self.inner.commissions_for(account_id)
    }
    fn insert_contact(&self, owner: AccountId, contact: &NewContact, at: DateTime<Utc>) -> Result<Contact, LedgerError> {
        self.inner.insert_contact(owner, contact, at)
    }
    fn contacts_for(&self, owner: AccountId) -> Result<Vec<Contact>, LedgerError> {
        self.inner.contacts_for(owner)
    }
    fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Option<Contact>, LedgerError> {
        self.inner.update_contact(owner, id, patch)
    }
    fn delete_contact(&self, owner: AccountId, id: i64) -> Result<bool, LedgerError> {
        self.inner.delete_contact(owner, id)
    }
    fn append_activity(&self,
                       account_id: Option<AccountId>,
                       action: &str,
                       detail: &str,
                       at: DateTime<Utc>)
                       -> Result<(), LedgerError> {
        self.inner.append_activity(account_id, action, detail, at)
    }
    fn recent_activity(&self, account_id: AccountId, limit: usize) -> Result<Vec<Activity>, LedgerError> {
        self.inner.recent_activity(account_id, limit)
    }
}

#[test]
fn signup_writes_account_and_session_together() {
    let engine = ReferralEngine::new(FlakyStore::default());
    engine.store().sessions_down.store(true, Ordering::SeqCst);

    let enrollment = engine.signup("erin@example.com", None).expect("session travels with the account");
    assert_eq!(engine.resolve_token(&enrollment.session.token).unwrap().id, enrollment.account.id);
    // Las sesiones sueltas siguen fallando: el alta no pasó por `insert_session`.
    assert_eq!(engine.authenticate("erin@example.com").unwrap_err(), locked());
}

#[test]
fn failed_signup_leaves_nothing_behind_and_can_be_retried() {
    let engine = ReferralEngine::new(FlakyStore::default());
    engine.store().fail_next_create.store(true, Ordering::SeqCst);

    assert_eq!(engine.signup("finn@example.com", None).unwrap_err(), locked());
    assert!(engine.store().account_by_email("finn@example.com").unwrap().is_none());

    let retry = engine.signup("finn@example.com", None).expect("retry after a storage failure");
    assert_eq!(engine.resolve_token(&retry.session.token).unwrap().email, "finn@example.com");
    assert_eq!(engine.signup("finn@example.com", None).unwrap_err(), LedgerError::DuplicateEmail);
}
