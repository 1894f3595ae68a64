use std::sync::Arc;

use db::DBService;
use services::services::{
    affirmations::AffirmationGenerator, auth_provider::AuthProviderClient,
    auth_provider::TokenVerifier, problems::ProblemService,
};

/// Shared handles passed to every route.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    generator: AffirmationGenerator,
    auth: Arc<AuthProviderClient>,
    verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(
        db: DBService,
        generator: AffirmationGenerator,
        auth: AuthProviderClient,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            db,
            generator,
            auth: Arc::new(auth),
            verifier: Arc::new(verifier),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn auth(&self) -> &AuthProviderClient {
        &self.auth
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn problem_service(&self) -> ProblemService {
        ProblemService::new(self.db.pool.clone(), self.generator.clone())
    }
}
