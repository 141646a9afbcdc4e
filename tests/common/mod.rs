#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use readmore::{
    crypto::protector::{self, TokenProtector},
    error::{AppError, Result},
    models::{account::Account, feature_toggle::FeatureToggle},
    pocket::{
        client::PocketClient,
        models::{AccessGrant, Article, RequestCode},
        PocketError,
    },
    repositories::account::AccountStore,
    services::pocket::PocketService,
};

pub const REQUEST_CODE: &str = "dcba4321-dcba-4321-dcba-4321dc";
pub const POCKET_ACCESS_TOKEN: &str = "5678defg-5678-defg-5678-defg56";
pub const POCKET_USERNAME: &str = "pocketuser";
pub const ARTICLE_COUNT: u32 = 200;

/// Everything the fakes saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Insert(Account),
    Update(Account),
    Delete(Uuid),
    FindById(Uuid),
    FindByUsername(String),
    FindToggles(Uuid),
    CreateRequestCode(Url),
    CreateAccessToken(String),
    GetRandomArticle { access_token: String, count: u32 },
    DeleteArticle { access_token: String, article_id: String },
    ArchiveArticle { access_token: String, article_id: String },
}

pub type Journal = Arc<Mutex<Vec<Event>>>;

fn record(journal: &Journal, event: Event) {
    journal.lock().unwrap().push(event);
}

/// In-memory account store enforcing unique usernames.
pub struct MemoryAccountStore {
    journal: Journal,
    accounts: Mutex<HashMap<Uuid, Account>>,
    toggles: Mutex<HashMap<Uuid, Vec<FeatureToggle>>>,
    /// Number of upcoming linking updates that lose a race to a competitor.
    races_to_lose: AtomicUsize,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            accounts: Mutex::new(HashMap::new()),
            toggles: Mutex::new(HashMap::new()),
            races_to_lose: AtomicUsize::new(0),
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }

    pub fn seed_toggles(&self, account_id: Uuid, toggles: Vec<FeatureToggle>) {
        self.toggles.lock().unwrap().insert(account_id, toggles);
    }

    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Account> {
        self.accounts.lock().unwrap().values().cloned().collect()
    }

    /// Before each of the next `n` linking updates, another request links the
    /// same username first.
    pub fn lose_races(&self, n: usize) {
        self.races_to_lose.store(n, Ordering::SeqCst);
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: &Account) -> Result<()> {
        record(&self.journal, Event::Insert(account.clone()));
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&account.id) {
            return Err(AppError::Conflict("duplicate id".to_string()));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        record(&self.journal, Event::Update(account.clone()));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("storage unavailable".to_string()));
        }

        let mut accounts = self.accounts.lock().unwrap();

        if let Some(username) = &account.username {
            let losing = self
                .races_to_lose
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if losing {
                let mut competitor = Account::pending("http://competitor/");
                competitor.link("competitor-token".to_string(), username.clone());
                accounts.insert(competitor.id, competitor);
            }

            let taken = accounts
                .values()
                .any(|other| other.id != account.id && other.username.as_ref() == Some(username));
            if taken {
                return Err(AppError::Conflict(format!("username {} taken", username)));
            }
        }

        match accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        record(&self.journal, Event::Delete(id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("storage unavailable".to_string()));
        }
        self.accounts.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        record(&self.journal, Event::FindById(id));
        Ok(self.get(id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        record(&self.journal, Event::FindByUsername(username.to_string()));
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_feature_toggles(&self, account_id: Uuid) -> Result<Vec<FeatureToggle>> {
        record(&self.journal, Event::FindToggles(account_id));
        Ok(self
            .toggles
            .lock()
            .unwrap()
            .get(&account_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted Pocket client.
pub struct FakePocketClient {
    journal: Journal,
    fail_request_code: AtomicBool,
    fail_access_token: AtomicBool,
    fail_articles: AtomicBool,
    username: Mutex<String>,
    pub article: Article,
}

impl FakePocketClient {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_request_code: AtomicBool::new(false),
            fail_access_token: AtomicBool::new(false),
            fail_articles: AtomicBool::new(false),
            username: Mutex::new(POCKET_USERNAME.to_string()),
            article: Article {
                item_id: "229279689".to_string(),
                url: "http://www.grantland.com/blog/the-triangle/post/_/id/38347/ryder-cup-preview".to_string(),
                title: "The Massive Ryder Cup Preview".to_string(),
            },
        }
    }

    pub fn fail_request_code(&self) {
        self.fail_request_code.store(true, Ordering::SeqCst);
    }

    pub fn fail_access_token(&self) {
        self.fail_access_token.store(true, Ordering::SeqCst);
    }

    pub fn fail_articles(&self) {
        self.fail_articles.store(true, Ordering::SeqCst);
    }

    pub fn grant_username(&self, username: &str) {
        *self.username.lock().unwrap() = username.to_string();
    }

    pub fn auth_url_for(code: &str, callback_url: &Url) -> Url {
        let mut url = Url::parse("https://getpocket.com/auth/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("request_token", code)
            .append_pair("redirect_uri", callback_url.as_str());
        url
    }
}

#[async_trait]
impl PocketClient for FakePocketClient {
    async fn create_request_code(&self, callback_url: &Url) -> std::result::Result<RequestCode, PocketError> {
        record(&self.journal, Event::CreateRequestCode(callback_url.clone()));
        if self.fail_request_code.load(Ordering::SeqCst) {
            return Err(PocketError::new("request", "403 Forbidden"));
        }
        Ok(RequestCode {
            code: REQUEST_CODE.to_string(),
            auth_url: Self::auth_url_for(REQUEST_CODE, callback_url),
        })
    }

    async fn create_access_token(&self, request_code: &str) -> std::result::Result<AccessGrant, PocketError> {
        record(&self.journal, Event::CreateAccessToken(request_code.to_string()));
        if self.fail_access_token.load(Ordering::SeqCst) {
            return Err(PocketError::new("authorize", "403 Forbidden"));
        }
        Ok(AccessGrant {
            access_token: POCKET_ACCESS_TOKEN.to_string(),
            username: self.username.lock().unwrap().clone(),
        })
    }

    async fn get_random_article(&self, access_token: &str, count: u32) -> std::result::Result<Article, PocketError> {
        record(
            &self.journal,
            Event::GetRandomArticle {
                access_token: access_token.to_string(),
                count,
            },
        );
        if self.fail_articles.load(Ordering::SeqCst) {
            return Err(PocketError::new("get", "401 Unauthorized"));
        }
        Ok(self.article.clone())
    }

    async fn delete_article(&self, access_token: &str, article_id: &str) -> std::result::Result<(), PocketError> {
        record(
            &self.journal,
            Event::DeleteArticle {
                access_token: access_token.to_string(),
                article_id: article_id.to_string(),
            },
        );
        if self.fail_articles.load(Ordering::SeqCst) {
            return Err(PocketError::new("delete", "401 Unauthorized"));
        }
        Ok(())
    }

    async fn archive_article(&self, access_token: &str, article_id: &str) -> std::result::Result<(), PocketError> {
        record(
            &self.journal,
            Event::ArchiveArticle {
                access_token: access_token.to_string(),
                article_id: article_id.to_string(),
            },
        );
        if self.fail_articles.load(Ordering::SeqCst) {
            return Err(PocketError::new("archive", "401 Unauthorized"));
        }
        Ok(())
    }
}

/// Reversible stand-in for the AES protector.
pub struct FakeProtector;

const SEAL: &[u8] = b"sealed:";

impl TokenProtector for FakeProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut sealed = SEAL.to_vec();
        sealed.extend(plaintext.iter().rev());
        Ok(sealed)
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        let body = protected
            .strip_prefix(SEAL)
            .ok_or(AppError::InvalidSessionToken)?;
        Ok(body.iter().rev().copied().collect())
    }
}

pub fn session_token(id: Uuid) -> String {
    protector::protect_id(&FakeProtector, id).unwrap()
}

pub fn resolve(token: &str) -> Uuid {
    protector::unprotect_id(&FakeProtector, token).unwrap()
}

pub struct Harness {
    pub journal: Journal,
    pub store: Arc<MemoryAccountStore>,
    pub client: Arc<FakePocketClient>,
    pub service: PocketService,
}

impl Harness {
    pub fn new() -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(MemoryAccountStore::new(journal.clone()));
        let client = Arc::new(FakePocketClient::new(journal.clone()));
        let service = PocketService::new(store.clone(), client.clone(), Arc::new(FakeProtector), ARTICLE_COUNT);

        Self {
            journal,
            store,
            client,
            service,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// A pending account as left behind by a successful authorize step.
    pub fn seed_pending(&self, redirect_url: &str) -> Account {
        let mut account = Account::pending(redirect_url);
        account.request_token = Some(REQUEST_CODE.to_string());
        self.store.seed(account.clone());
        account
    }

    pub fn seed_linked(&self, username: &str, access_token: &str) -> Account {
        let mut account = Account::pending("http://caller.example/linked");
        account.link(access_token.to_string(), username.to_string());
        self.store.seed(account.clone());
        account
    }

    pub fn deletes_of(&self, id: Uuid) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == Event::Delete(id))
            .count()
    }
}
