use std::sync::Arc;

use obmin_core::store::{ConfirmationCodeStore, RevocationStore, UserStore};
use obmin_mail::MailSender;

use crate::auth::authenticator::RequestAuthenticator;
use crate::auth::confirmation::ConfirmationService;
use crate::auth::jwt::TokenCodec;
use crate::auth::service::AuthService;
use crate::background::confirmation_purge::ConfirmationScheduler;
use crate::config::ServerConfig;

/// The three stores the auth subsystem runs against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub codes: Arc<dyn ConfirmationCodeStore>,
}

impl Stores {
    /// Use one backend for all three stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserStore + RevocationStore + ConfirmationCodeStore + 'static,
    {
        Self {
            users: store.clone(),
            revocations: store.clone(),
            codes: store,
        }
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<AuthService>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub confirmations: Arc<ConfirmationService>,
    pub purge_scheduler: Arc<ConfirmationScheduler>,
    pub mailer: Arc<dyn MailSender>,
}

impl AppState {
    /// Wire the auth services over `stores`.
    pub fn new(config: ServerConfig, stores: Stores, mailer: Arc<dyn MailSender>) -> Self {
        let store_timeout = config.store_timeout();
        let codec = Arc::new(TokenCodec::new(&config.jwt));

        let auth = Arc::new(AuthService::new(
            Arc::clone(&codec),
            Arc::clone(&stores.users),
            Arc::clone(&stores.revocations),
            store_timeout,
        ));
        let authenticator = Arc::new(RequestAuthenticator::new(
            codec,
            Arc::clone(&stores.revocations),
            store_timeout,
        ));
        let confirmations = Arc::new(ConfirmationService::new(
            Arc::clone(&stores.codes),
            config.confirmation.code_ttl_hours,
            store_timeout,
        ));
        let purge_scheduler = Arc::new(ConfirmationScheduler::new(
            Arc::clone(&confirmations),
            config.confirmation.purge_at,
            config.confirmation.grace_hours,
        ));

        Self {
            config: Arc::new(config),
            users: stores.users,
            auth,
            authenticator,
            confirmations,
            purge_scheduler,
            mailer,
        }
    }
}
