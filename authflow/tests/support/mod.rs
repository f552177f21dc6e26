#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use authflow::{
    AuthEvent, AuthResponse, Authflow, EventError, EventHandler, IdentityService, LoginRequest,
    MemoryStorage, MemoryStorageProvider, RegisterRequest, ServiceError,
};
use serde_json::json;

/// Identity service backed by an in-memory account table
#[derive(Default)]
pub struct InMemoryIdentityService {
    accounts: Mutex<Vec<(String, String)>>,
    unreachable: Mutex<HashSet<&'static str>>,
    next_token: Mutex<u32>,
    pub register_calls: Mutex<Vec<RegisterRequest>>,
}

impl InMemoryIdentityService {
    pub fn with_account(email: &str, password: &str) -> Self {
        let service = Self::default();
        service
            .accounts
            .lock()
            .unwrap()
            .push((email.to_string(), password.to_string()));
        service
    }

    /// Make `operation` fail as if the network were down
    pub fn go_offline(&self, operation: &'static str) {
        self.unreachable.lock().unwrap().insert(operation);
    }

    fn check_reachable(&self, operation: &str) -> Result<(), ServiceError> {
        if self.unreachable.lock().unwrap().contains(operation) {
            return Err(ServiceError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn issue(&self, email: &str) -> AuthResponse {
        let mut next = self.next_token.lock().unwrap();
        *next += 1;
        AuthResponse {
            token: format!("tok-{next}"),
            user: json!({"email": email}),
        }
    }

    fn is_registered(&self, email: &str) -> bool {
        self.accounts.lock().unwrap().iter().any(|(e, _)| e == email)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn check_email_unique(&self, email: &str) -> Result<bool, ServiceError> {
        self.check_reachable("check_email_unique")?;
        Ok(!self.is_registered(email))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ServiceError> {
        self.check_reachable("register")?;
        self.register_calls.lock().unwrap().push(request.clone());
        if self.is_registered(&request.email) {
            return Err(ServiceError::Rejected(
                [("email".to_string(), "Email already registered".to_string())]
                    .into_iter()
                    .collect(),
            ));
        }
        self.accounts
            .lock()
            .unwrap()
            .push((request.email.clone(), request.password.clone()));
        Ok(self.issue(&request.email))
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ServiceError> {
        self.check_reachable("login")?;
        let known = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .any(|(e, p)| *e == request.email && *p == request.password);
        if !known {
            return Err(ServiceError::Rejected(
                [
                    ("password".to_string(), "Incorrect password".to_string()),
                    ("error".to_string(), "Sign in failed".to_string()),
                ]
                .into_iter()
                .collect(),
            ));
        }
        Ok(self.issue(&request.email))
    }
}

/// Collects every event it sees
#[derive(Default)]
pub struct RecordingHandler {
    pub events: Mutex<Vec<AuthEvent>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle_event(&self, event: &AuthEvent) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub type TestAuthflow = Authflow<InMemoryIdentityService, MemoryStorageProvider>;

/// Route flow logs to the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub async fn authflow_with(
    service: InMemoryIdentityService,
    storage: MemoryStorage,
) -> (TestAuthflow, Arc<RecordingHandler>) {
    init_tracing();
    let authflow = Authflow::new(service, MemoryStorageProvider::new(storage));
    let recorder = Arc::new(RecordingHandler::default());
    authflow.on_event(recorder.clone()).await;
    (authflow, recorder)
}
