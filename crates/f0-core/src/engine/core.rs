//! Implementación de `ReferralEngine`.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::codes::{generate_referral_code, normalize_email};
use crate::constants::{ACTIVITY_FEED_LIMIT, MAX_CODE_ATTEMPTS};
use crate::errors::LedgerError;
use crate::license::LicenseSigner;
use crate::model::{Account, AccountDraft, AccountId, AccountStats, Activity, ActivityAction, ClickSource,
                   CommissionEvent, Contact, ContactPatch, CreateOutcome, NewContact, Session, SessionGrant};
use crate::money::Money;
use crate::store::{InMemoryLedgerStore, LedgerStore};
use crate::tier::{next_breakpoint, rate_for};

/// Alta completa: cuenta, sesión inicial y clave de licencia para logins
/// posteriores.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub account: Account,
    pub session: Session,
    pub license_key: String,
}

/// Resultado del alta self-service de afiliados (idempotente por email).
///
/// Una cuenta existente no recibe credenciales: `enrollment` sólo viene en
/// altas nuevas.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub account: Account,
    pub enrollment: Option<Enrollment>,
    pub clicks: u64,
    pub returning: bool,
}

/// Operaciones del ledger de referidos sobre un store concreto.
///
/// El engine no guarda estado propio: toda lectura se deriva del store al
/// momento de la llamada, y toda escritura atómica la delega al store.
pub struct ReferralEngine<S: LedgerStore> {
    store: S,
    code_generator: fn() -> String,
    licenses: LicenseSigner,
}

impl ReferralEngine<InMemoryLedgerStore> {
    /// Engine con store en memoria.
    pub fn in_memory() -> Self {
        Self::new(InMemoryLedgerStore::new())
    }
}

impl<S: LedgerStore> ReferralEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store,
               code_generator: generate_referral_code,
               licenses: LicenseSigner::default() }
    }

    /// Firma las claves de licencia con `secret`.
    pub fn with_license_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.licenses = LicenseSigner::new(secret);
        self
    }

    /// Reemplaza el generador de códigos de referido (tests de colisión).
    pub fn with_code_generator(mut self, generator: fn() -> String) -> Self {
        self.code_generator = generator;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Identidad
    // ---------------------------------------------------------------------

    /// Crea una cuenta con código de referido nuevo, atribuyendo `referral`
    /// si resuelve a otra cuenta existente.
    pub fn create_account(&self, email: &str, referral: Option<&str>) -> Result<Account, LedgerError> {
        self.create_account_at(email, referral, Utc::now())
    }

    pub fn create_account_at(&self,
                             email: &str,
                             referral: Option<&str>,
                             now: DateTime<Utc>)
                             -> Result<Account, LedgerError> {
        self.insert_account(email, referral, None, now)
    }

    /// Alta con reintento ante colisión de código. La sesión opcional se
    /// escribe en la misma unidad atómica que la cuenta.
    fn insert_account(&self,
                      email: &str,
                      referral: Option<&str>,
                      session: Option<&SessionGrant>,
                      now: DateTime<Utc>)
                      -> Result<Account, LedgerError> {
        let email = normalize_email(email)?;
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let draft = AccountDraft { email: email.clone(),
                                       referral_code: (self.code_generator)(),
                                       referral: referral.map(str::to_string),
                                       session: session.cloned(),
                                       created_at: now };
            match self.store.create_account(draft)? {
                CreateOutcome::Created(account) => return Ok(account),
                CreateOutcome::EmailTaken => return Err(LedgerError::DuplicateEmail),
                CreateOutcome::CodeTaken => debug!("create_account: code collision attempt={attempt}"),
            }
        }
        warn!("create_account: exhausted {MAX_CODE_ATTEMPTS} referral code attempts");
        Err(LedgerError::CodeGenerationExhausted)
    }

    /// Emite un token nuevo (28 días). Tokens previos siguen vigentes.
    pub fn authenticate(&self, email: &str) -> Result<Session, LedgerError> {
        self.authenticate_at(email, Utc::now())
    }

    pub fn authenticate_at(&self, email: &str, now: DateTime<Utc>) -> Result<Session, LedgerError> {
        let email = normalize_email(email)?;
        let account = self.store.account_by_email(&email)?.ok_or(LedgerError::UnknownAccount)?;
        let session = Session::issue(account.id, now);
        self.store.insert_session(&session)?;
        Ok(session)
    }

    pub fn resolve_token(&self, token: &str) -> Result<Account, LedgerError> {
        self.resolve_token_at(token, Utc::now())
    }

    /// Comparación sin estado contra `now`; no hay barrido de sesiones.
    pub fn resolve_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Account, LedgerError> {
        let session = self.store
                          .session(token)?
                          .filter(|s| s.is_valid_at(now))
                          .ok_or(LedgerError::InvalidOrExpiredToken)?;
        self.store.account(session.account_id)?.ok_or(LedgerError::InvalidOrExpiredToken)
    }

    /// Alta + sesión inicial + clave de licencia (`POST /api/signup`).
    ///
    /// Cuenta y sesión se escriben juntas: si el store falla no queda una
    /// cuenta sin credenciales y el caller puede reintentar.
    pub fn signup(&self, email: &str, referral: Option<&str>) -> Result<Enrollment, LedgerError> {
        let enrollment = self.enroll(email, referral, Utc::now())?;
        self.note(Some(enrollment.account.id),
                  ActivityAction::Signup,
                  &format!("New account: {}", enrollment.account.referral_code));
        Ok(enrollment)
    }

    fn enroll(&self, email: &str, referral: Option<&str>, now: DateTime<Utc>) -> Result<Enrollment, LedgerError> {
        // La clave se firma antes de escribir: un fallo aquí no deja nada persistido.
        let license_key = self.licenses.issue(&normalize_email(email)?, now)?;
        let grant = SessionGrant::new(now);
        let account = self.insert_account(email, referral, Some(&grant), now)?;
        Ok(Enrollment { session: grant.bind(account.id),
                        account,
                        license_key })
    }

    /// Clave de licencia nueva para una cuenta existente (uso operativo).
    pub fn license_key_for(&self, account: &Account) -> Result<String, LedgerError> {
        self.licenses.issue(&account.email, Utc::now())
    }

    /// Login con la clave de licencia entregada en el alta.
    pub fn login(&self, email: &str, license_key: &str) -> Result<(Account, Session), LedgerError> {
        self.login_at(email, license_key, Utc::now())
    }

    pub fn login_at(&self,
                    email: &str,
                    license_key: &str,
                    now: DateTime<Utc>)
                    -> Result<(Account, Session), LedgerError> {
        let email = normalize_email(email)?;
        self.licenses.verify(license_key, &email, now)?;
        let session = self.authenticate_at(&email, now)?;
        let account = self.store.account(session.account_id)?.ok_or(LedgerError::UnknownAccount)?;
        self.note(Some(account.id), ActivityAction::Login, "License key auth");
        Ok((account, session))
    }

    /// Alta self-service de afiliado. Si la cuenta existe se devuelve su
    /// código y clicks (`returning = true`) sin emitir token ni clave.
    pub fn join(&self, email: &str, referral: Option<&str>) -> Result<JoinOutcome, LedgerError> {
        let normalized = normalize_email(email)?;
        if let Some(existing) = self.store.account_by_email(&normalized)? {
            return self.returning_join(existing);
        }
        match self.enroll(&normalized, referral, Utc::now()) {
            Ok(enrollment) => {
                self.note(Some(enrollment.account.id),
                          ActivityAction::AffiliateJoined,
                          &format!("Self-service: {}", enrollment.account.referral_code));
                Ok(JoinOutcome { account: enrollment.account.clone(),
                                 enrollment: Some(enrollment),
                                 clicks: 0,
                                 returning: false })
            }
            // Carrera con otro join del mismo email: tratamos como existente.
            Err(LedgerError::DuplicateEmail) => {
                let existing = self.store
                                   .account_by_email(&normalized)?
                                   .ok_or(LedgerError::UnknownAccount)?;
                self.returning_join(existing)
            }
            Err(e) => Err(e),
        }
    }

    fn returning_join(&self, account: Account) -> Result<JoinOutcome, LedgerError> {
        let clicks = self.store.click_count(&account.referral_code)?;
        Ok(JoinOutcome { account,
                         enrollment: None,
                         clicks,
                         returning: true })
    }

    pub fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.store.account(account_id)?.ok_or(LedgerError::UnknownAccount)
    }

    pub fn account_by_code(&self, code: &str) -> Result<Account, LedgerError> {
        self.store.account_by_code(code)?.ok_or(LedgerError::UnknownAccount)
    }

    pub fn account_by_email(&self, email: &str) -> Result<Account, LedgerError> {
        let email = normalize_email(email)?;
        self.store.account_by_email(&email)?.ok_or(LedgerError::UnknownAccount)
    }

    // ---------------------------------------------------------------------
    // Grafo de referidos
    // ---------------------------------------------------------------------

    pub fn referrer_of(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError> {
        let account = self.account(account_id)?;
        match account.referred_by {
            Some(code) => self.store.account_by_code(&code),
            None => Ok(None),
        }
    }

    /// Cuentas referidas por `account_id`. Se re-deriva en cada llamada.
    pub fn referred_accounts_of(&self, account_id: AccountId) -> Result<Vec<Account>, LedgerError> {
        let account = self.account(account_id)?;
        self.store.accounts_referred_by(&account.referral_code)
    }

    // ---------------------------------------------------------------------
    // Log de clicks
    // ---------------------------------------------------------------------

    /// Registra un click. Nunca falla hacia afuera: códigos desconocidos se
    /// guardan tal cual y los errores de storage sólo se loguean.
    pub fn record_click(&self, code: &str, source: &ClickSource) {
        if let Err(e) = self.store.append_click(code, source, Utc::now()) {
            warn!("record_click: dropped click code={code} err={e}");
        }
    }

    pub fn click_count(&self, code: &str) -> Result<u64, LedgerError> {
        self.store.click_count(code)
    }

    // ---------------------------------------------------------------------
    // Ledger de comisiones
    // ---------------------------------------------------------------------

    /// Registra revenue atribuida. `amount` en dólares decimales.
    pub fn record_commission(&self,
                             account_id: AccountId,
                             amount: f64,
                             order_id: Option<&str>)
                             -> Result<CommissionEvent, LedgerError> {
        let amount = Money::parse_amount(amount)?;
        self.record_commission_cents(account_id, amount, order_id, Utc::now())
    }

    /// Variante que identifica al referente por su código.
    pub fn record_commission_for_code(&self,
                                      code: &str,
                                      amount: f64,
                                      order_id: Option<&str>)
                                      -> Result<CommissionEvent, LedgerError> {
        let amount = Money::parse_amount(amount)?;
        let account = self.account_by_code(code.trim())?;
        self.record_commission_cents(account.id, amount, order_id, Utc::now())
    }

    pub fn record_commission_cents(&self,
                                   account_id: AccountId,
                                   amount: Money,
                                   order_id: Option<&str>,
                                   now: DateTime<Utc>)
                                   -> Result<CommissionEvent, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount);
        }
        let order_id = order_id.map(str::trim).filter(|o| !o.is_empty());
        let event = self.store.append_commission(account_id, amount, order_id, now)?;
        debug!("record_commission:done account={account_id} amount={} rate={} commission={}",
               event.amount, event.rate_applied, event.commission_amount);
        let detail = match &event.order_id {
            Some(order) => format!("{} from order {order}", event.commission_amount),
            None => format!("{} on {}", event.commission_amount, event.amount),
        };
        self.note(Some(account_id), ActivityAction::Commission, &detail);
        Ok(event)
    }

    /// Estado de cuenta: eventos en orden cronológico, tal como se registraron.
    pub fn commissions_for(&self, account_id: AccountId) -> Result<Vec<CommissionEvent>, LedgerError> {
        self.account(account_id)?;
        self.store.commissions_for(account_id)
    }

    // ---------------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------------

    pub fn stats_for(&self, account_id: AccountId) -> Result<AccountStats, LedgerError> {
        let account = self.account(account_id)?;
        self.compose_stats(&account)
    }

    pub fn stats_for_code(&self, code: &str) -> Result<AccountStats, LedgerError> {
        let account = self.account_by_code(code)?;
        self.compose_stats(&account)
    }

    fn compose_stats(&self, account: &Account) -> Result<AccountStats, LedgerError> {
        let click_count = self.store.click_count(&account.referral_code)?;
        let referred_signup_count = self.store.accounts_referred_by(&account.referral_code)?.len() as u64;
        let events = self.store.commissions_for(account.id)?;
        let total_attributed_revenue: Money = events.iter().map(|e| e.amount).sum();
        let total_commission_earned: Money = events.iter().map(|e| e.commission_amount).sum();
        Ok(AccountStats { referral_code: account.referral_code.clone(),
                          click_count,
                          referred_signup_count,
                          conversions: referred_signup_count,
                          total_attributed_revenue,
                          total_commission_earned,
                          current_rate: rate_for(total_attributed_revenue),
                          next_breakpoint: next_breakpoint(total_attributed_revenue) })
    }

    // ---------------------------------------------------------------------
    // CRM
    // ---------------------------------------------------------------------

    pub fn add_contact(&self, owner: AccountId, contact: &NewContact) -> Result<Contact, LedgerError> {
        contact.validate()?;
        let row = self.store.insert_contact(owner, contact, Utc::now())?;
        self.note(Some(owner), ActivityAction::ContactAdded, &format!("Added: {}", row.name));
        Ok(row)
    }

    pub fn list_contacts(&self, owner: AccountId, query: Option<&str>) -> Result<Vec<Contact>, LedgerError> {
        let contacts = self.store.contacts_for(owner)?;
        Ok(match query {
            Some(q) => contacts.into_iter().filter(|c| c.matches(q)).collect(),
            None => contacts,
        })
    }

    pub fn update_contact(&self, owner: AccountId, id: i64, patch: &ContactPatch) -> Result<Contact, LedgerError> {
        patch.validate()?;
        let row = self.store.update_contact(owner, id, patch)?.ok_or(LedgerError::ContactNotFound)?;
        self.note(Some(owner), ActivityAction::ContactUpdated, &format!("Updated contact #{id}"));
        Ok(row)
    }

    pub fn delete_contact(&self, owner: AccountId, id: i64) -> Result<(), LedgerError> {
        if !self.store.delete_contact(owner, id)? {
            return Err(LedgerError::ContactNotFound);
        }
        self.note(Some(owner), ActivityAction::ContactDeleted, &format!("Deleted contact #{id}"));
        Ok(())
    }

    pub fn recent_activity(&self, account_id: AccountId) -> Result<Vec<Activity>, LedgerError> {
        self.store.recent_activity(account_id, ACTIVITY_FEED_LIMIT)
    }

    /// Actividad best-effort: un fallo sólo se loguea.
    fn note(&self, account_id: Option<AccountId>, action: ActivityAction, detail: &str) {
        if let Err(e) = self.store.append_activity(account_id, action.as_str(), detail, Utc::now()) {
            warn!("activity:dropped action={} err={e}", action.as_str());
        }
    }
}
