use std::sync::Arc;

use tracing::{debug, warn};

use super::{AuthModule, AuthModuleError, AuthOutcome, Credentials};

/// Ordered chain of authentication modules.
///
/// Insertion order is precedence order. The first module that accepts the
/// credentials wins and later modules are never consulted. When every module
/// declines, the caller gets the same generic rejection no matter which
/// module said what.
#[derive(Clone, Default)]
pub struct AuthManager {
    modules: Vec<Arc<dyn AuthModule>>,
}

impl AuthManager {
    pub fn new(modules: Vec<Arc<dyn AuthModule>>) -> Self {
        Self { modules }
    }

    /// Append a module at the lowest precedence.
    pub fn push(&mut self, module: Arc<dyn AuthModule>) {
        self.modules.push(module);
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Walk the chain until a module accepts.
    ///
    /// A module error does not stop the walk. It is only returned when no
    /// later module accepted, so a backend outage is not reported as bad
    /// credentials.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, AuthModuleError> {
        let mut failure = None;
        for module in &self.modules {
            match module.authenticate(credentials).await {
                Ok(outcome) if outcome.authenticated => {
                    debug!(module = module.name(), username = %credentials.username, "Authenticated");
                    return Ok(outcome);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(module = module.name(), error = %e, "Authentication module failed");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(AuthOutcome::invalid_credentials()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DirectoryConfig, DirectoryModule, LocalCredential, LocalFileModule};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        name: String,
        accept: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &str, accept: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accept,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accept: false,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthModule for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthOutcome, AuthModuleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthModuleError::Unavailable {
                    module: self.name.clone(),
                    reason: "connection refused".to_string(),
                });
            }
            if self.accept {
                Ok(AuthOutcome::success(format!("{} ok", self.name)))
            } else {
                Ok(AuthOutcome::rejected(format!("{} says no such user", self.name)))
            }
        }
    }

    fn creds() -> Credentials {
        Credentials::new("user", "pass", "org")
    }

    #[tokio::test]
    async fn test_empty_chain_rejects() {
        let manager = AuthManager::default();
        assert_eq!(manager.authenticate(&creds()).await.unwrap(), AuthOutcome::invalid_credentials());
    }

    #[tokio::test]
    async fn test_short_circuits_after_first_success() {
        for winner in 0..4 {
            let modules: Vec<Arc<Scripted>> = (0..4)
                .map(|i| Scripted::new(&format!("m{}", i), i >= winner))
                .collect();
            let manager = AuthManager::new(
                modules.iter().map(|m| m.clone() as Arc<dyn AuthModule>).collect(),
            );

            let outcome = manager.authenticate(&creds()).await.unwrap();
            assert!(outcome.authenticated);
            assert_eq!(outcome.message, format!("m{} ok", winner));

            for (i, module) in modules.iter().enumerate() {
                let expected = if i <= winner { 1 } else { 0 };
                assert_eq!(module.calls(), expected, "module {} with winner {}", i, winner);
            }
        }
    }

    #[tokio::test]
    async fn test_exhausted_chain_hides_module_messages() {
        let first = Scripted::new("first", false);
        let second = Scripted::new("second", false);
        let manager = AuthManager::new(vec![
            first.clone() as Arc<dyn AuthModule>,
            second.clone() as Arc<dyn AuthModule>,
        ]);

        let outcome = manager.authenticate(&creds()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::invalid_credentials());
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn test_module_error_does_not_stop_chain() {
        let broken = Scripted::failing("broken");
        let fallback = Scripted::new("fallback", true);
        let manager = AuthManager::new(vec![
            broken.clone() as Arc<dyn AuthModule>,
            fallback.clone() as Arc<dyn AuthModule>,
        ]);

        assert!(manager.authenticate(&creds()).await.unwrap().authenticated);
        assert_eq!(broken.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_module_error_surfaces_when_nobody_accepts() {
        let broken = Scripted::failing("broken");
        let rejecting = Scripted::new("rejecting", false);
        let manager = AuthManager::new(vec![
            broken.clone() as Arc<dyn AuthModule>,
            rejecting.clone() as Arc<dyn AuthModule>,
        ]);

        let err = manager.authenticate(&creds()).await.unwrap_err();
        assert!(matches!(err, AuthModuleError::Unavailable { ref module, .. } if module == "broken"));
        assert_eq!(rejecting.calls(), 1);
    }

    #[tokio::test]
    async fn test_directory_wins_before_local() {
        let local = Arc::new(LocalFileModule::new(vec![LocalCredential {
            username: "contiv".to_string(),
            password: "123".to_string(),
            active: true,
        }]));
        let counting_local = Scripted::new("local-spy", true);
        let manager = AuthManager::new(vec![
            Arc::new(DirectoryModule::new(&DirectoryConfig::default())) as Arc<dyn AuthModule>,
            counting_local.clone() as Arc<dyn AuthModule>,
            local as Arc<dyn AuthModule>,
        ]);

        let outcome = manager
            .authenticate(&Credentials::new("contiv", "123", ""))
            .await
            .unwrap();
        assert!(outcome.authenticated);
        assert_eq!(counting_local.calls(), 0);
        assert_eq!(manager.module_names(), vec!["directory", "local-spy", "local"]);
    }
}
